//! Input manager: device table, slot reconciliation and event dispatch
//!
//! Everything here runs on the input pump. Hot-plug notifications from other
//! threads only raise a shared flag; the next [`InputManager::update`] tick
//! consumes it and rebuilds the device table.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::autoconfig::ControllerDb;
use super::compact::CompactEvent;
use super::device::Device;
use super::entry::LogicalEntry;
use super::mapper::{DeviceMapper, Pad, ReconcileReport};
use super::mapping_file::{MappingDocument, MappingLibrary};
use super::raw::{DeviceId, RawEvent, RawPattern};
use super::source::{DeviceInfo, DeviceSource, SourceEvent};
use crate::storage::ConfigStore;

/// Consumer of translated input
pub trait InputListener {
    fn on_compact_event(&mut self, event: &CompactEvent);

    /// The device table changed; `removed` is set when a device went away
    fn on_device_set_changed(&mut self, _removed: bool) {}
}

/// Runtime options of the input core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSettings {
    /// Number of player slots
    pub max_players: usize,
    /// Attach the built-in keyboard device
    pub keyboard: bool,
    /// Attach the built-in mouse device
    pub mouse: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            max_players: 4,
            keyboard: true,
            mouse: false,
        }
    }
}

/// Where a device's mapping came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Document,
    Description,
    ControllerDb,
    Builtin,
    None,
}

pub struct InputManager {
    settings: InputSettings,
    devices: BTreeMap<DeviceId, Device>,
    origins: BTreeMap<DeviceId, MappingOrigin>,
    mapper: DeviceMapper,
    source: Box<dyn DeviceSource>,
    store: Box<dyn ConfigStore>,
    library: MappingLibrary,
    controller_db: ControllerDb,
    listeners: Vec<Box<dyn InputListener>>,
    hotplug: Arc<AtomicBool>,
}

impl InputManager {
    /// Create a manager with an empty device table
    ///
    /// Call [`InputManager::rebuild`] once to enumerate devices.
    pub fn new(settings: InputSettings, source: Box<dyn DeviceSource>, store: Box<dyn ConfigStore>) -> Self {
        Self {
            mapper: DeviceMapper::new(settings.max_players),
            settings,
            devices: BTreeMap::new(),
            origins: BTreeMap::new(),
            source,
            store,
            library: MappingLibrary::default(),
            controller_db: ControllerDb::default(),
            listeners: Vec::new(),
            hotplug: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_library(mut self, library: MappingLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn with_controller_db(mut self, db: ControllerDb) -> Self {
        self.controller_db = db;
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn InputListener>) {
        self.listeners.push(listener);
    }

    // Accessors

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> + '_ {
        self.devices.values()
    }

    pub fn mapping_origin(&self, id: DeviceId) -> MappingOrigin {
        self.origins.get(&id).copied().unwrap_or(MappingOrigin::None)
    }

    pub fn mapper(&self) -> &DeviceMapper {
        &self.mapper
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn library(&self) -> &MappingLibrary {
        &self.library
    }

    /// Slot record at `slot` (clamped)
    pub fn pad(&self, slot: usize) -> Option<&Pad> {
        self.mapper.pad(slot)
    }

    /// Connected device of player `slot` (clamped)
    pub fn device_for_slot(&self, slot: usize) -> Option<&Device> {
        let index = self.mapper.pad(slot)?.index()?;
        self.devices.get(&DeviceId::Joystick(index))
    }

    /// Player slot of a device, `None` for built-ins and unassigned pads
    pub fn slot_of_device(&self, id: DeviceId) -> Option<usize> {
        match id {
            DeviceId::Joystick(index) => self.mapper.slot_of_index(index),
            DeviceId::Keyboard | DeviceId::Mouse => None,
        }
    }

    // Hot-plug

    /// Shared flag for watchers on other threads
    pub fn hotplug_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.hotplug)
    }

    /// Request a rebuild on the next tick
    pub fn notify_hotplug(&self) {
        self.hotplug.store(true, Ordering::SeqCst);
    }

    /// One pump tick: drain the source, then rebuild if a change was signalled
    ///
    /// # Returns
    /// Number of compact events delivered
    pub fn update(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.source.poll() {
            match event {
                SourceEvent::Raw(raw) => {
                    if self.dispatch(&raw).is_some() {
                        delivered += 1;
                    }
                }
                SourceEvent::DevicesChanged => self.notify_hotplug(),
                SourceEvent::Battery { index, battery } => {
                    if let Some(device) = self.devices.get_mut(&DeviceId::Joystick(index)) {
                        device.set_battery(battery);
                    }
                }
            }
        }

        if self.hotplug.swap(false, Ordering::SeqCst) {
            debug!("Device change signalled, rebuilding");
            self.rebuild();
        }
        delivered
    }

    /// Re-enumerate devices, reconcile slots and refresh the device table
    pub fn rebuild(&mut self) -> ReconcileReport {
        let infos: Vec<DeviceInfo> = self.source.enumerate();
        let report = self.mapper.reconcile(&infos, self.store.as_mut());

        let mut next: BTreeMap<DeviceId, Device> = BTreeMap::new();
        let mut added = false;

        for info in infos.iter().filter(|i| i.is_pad) {
            let id = DeviceId::Joystick(info.index);
            match self.devices.remove(&id) {
                Some(mut existing) if existing.identity().matches(&info.identity) => {
                    // Same pad at the same index may have been replugged between ticks
                    existing.reset_state();
                    existing.set_battery(info.battery);
                    next.insert(id, existing);
                }
                _ => {
                    let device = self.attach(info);
                    next.insert(id, device);
                    added = true;
                }
            }
        }
        for info in infos.iter().filter(|i| !i.is_pad) {
            debug!("Ignoring non-pad device {}", info.identity.name);
        }

        if self.settings.keyboard {
            let keyboard = self.devices.remove(&DeviceId::Keyboard).unwrap_or_else(|| {
                added = true;
                self.origins.insert(DeviceId::Keyboard, MappingOrigin::Builtin);
                Device::keyboard()
            });
            next.insert(DeviceId::Keyboard, keyboard);
        }
        if self.settings.mouse {
            let mouse = self.devices.remove(&DeviceId::Mouse).unwrap_or_else(|| {
                added = true;
                self.origins.insert(DeviceId::Mouse, MappingOrigin::Builtin);
                Device::mouse()
            });
            next.insert(DeviceId::Mouse, mouse);
        }

        // Whatever is left was not enumerated again
        let removed = !self.devices.is_empty();
        for (id, device) in std::mem::take(&mut self.devices) {
            info!("🔌 Device removed: {} ({})", device.name(), id);
            self.origins.remove(&id);
        }
        self.devices = next;

        info!(
            "🎮 {} device(s), {}/{} player slot(s) connected",
            self.devices.len(),
            self.mapper.connected_count(),
            self.mapper.capacity()
        );

        if added || removed {
            for listener in &mut self.listeners {
                listener.on_device_set_changed(removed);
            }
        }
        report
    }

    /// Build and configure the device for a newly enumerated pad
    fn attach(&mut self, info: &DeviceInfo) -> Device {
        let mut device = Device::from_info(info);
        let id = device.id();

        let origin = if let Some(document) = self.library.find(&info.identity) {
            document.apply(&mut device);
            MappingOrigin::Document
        } else if info
            .description
            .as_deref()
            .is_some_and(|d| device.load_auto_configuration(d))
        {
            MappingOrigin::Description
        } else if self
            .controller_db
            .lookup(&info.identity.guid)
            .is_some_and(|d| device.load_auto_configuration(d))
        {
            MappingOrigin::ControllerDb
        } else {
            MappingOrigin::None
        };

        if device.needs_configuration() {
            warn!("⚠️  Device {} has no mapping and needs configuration", info.identity.name);
        } else {
            info!(
                "✅ Device connected: {} ({}, {} entries from {:?})",
                info.identity.name,
                id,
                device.configured_count(),
                origin
            );
        }
        self.origins.insert(id, origin);
        device
    }

    // Dispatch

    /// Translate a raw event and deliver it to every listener
    ///
    /// Empty events are dropped, except press-like events of unconfigured
    /// devices which carry the needs-configuration flag.
    pub fn dispatch(&mut self, raw: &RawEvent) -> Option<CompactEvent> {
        let Some(device) = self.devices.get_mut(&raw.device) else {
            trace!("No device for {}", raw);
            return None;
        };

        let event = device.translate(raw);
        if event.is_empty() && !(event.needs_configuration() && device.capture(raw).is_some()) {
            return None;
        }

        for listener in &mut self.listeners {
            listener.on_compact_event(&event);
        }
        Some(event)
    }

    // Configuration

    /// Pattern a raw event would arm, for the configuration wizard
    pub fn capture(&self, raw: &RawEvent) -> Option<RawPattern> {
        self.devices.get(&raw.device)?.capture(raw)
    }

    /// Bind `entry` of a device to `pattern`
    ///
    /// # Returns
    /// `false` if the device is unknown
    pub fn configure_entry(&mut self, id: DeviceId, entry: LogicalEntry, pattern: RawPattern) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) => {
                device.set_pattern(entry, pattern);
                device.reset_state();
                true
            }
            None => false,
        }
    }

    /// Write a device's mapping table to the mapping library
    ///
    /// # Returns
    /// Path of the written document
    pub fn save_device_configuration(&mut self, id: DeviceId) -> Result<PathBuf> {
        let device = self
            .devices
            .get(&id)
            .with_context(|| format!("Unknown device: {}", id))?;
        let document = MappingDocument::from_device(device);
        let path = self.library.save(document)?;
        self.origins.insert(id, MappingOrigin::Document);
        Ok(path)
    }

    /// Exchange two player slots (clamped) and persist the new order
    pub fn swap_slots(&mut self, a: usize, b: usize) {
        self.mapper.swap(a, b, self.store.as_mut());
        for listener in &mut self.listeners {
            listener.on_device_set_changed(false);
        }
    }
}
