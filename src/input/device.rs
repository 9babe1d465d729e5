//! Physical input device: identity, mapping table and transient state
//!
//! A [`Device`] lives while the platform reports it. Its mapping table (one
//! optional [`RawPattern`] per [`LogicalEntry`]) can be saved to a mapping
//! document and restored on reconnect; its transient state (axis/hat caches,
//! hold timers, hotkey flags) is owned here and mutated only by the
//! translator on the input pump thread.

use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use super::entry::{Entries, LogicalEntry, ENTRY_COUNT};
use super::raw::{DeviceId, RawEvent, RawKind, RawPattern};
use super::source::DeviceInfo;

/// Axis magnitude below which a reading is centred
pub const AXIS_DEAD_ZONE: i32 = 16_384;

/// Quantize a raw axis reading to -1, 0 or +1
pub fn quantize_axis(value: i32) -> i32 {
    if value > AXIS_DEAD_ZONE {
        1
    } else if value < -AXIS_DEAD_ZONE {
        -1
    } else {
        0
    }
}

/// Stable identity of a physical device
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Display name reported by the platform
    pub name: String,
    /// Hardware GUID; empty when the identity lookup failed
    pub guid: String,
    /// Enumeration path (e.g. `/dev/input/event3`)
    pub path: String,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: guid.into(),
            path: String::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Same physical model and unit: name and GUID both equal
    pub fn matches(&self, other: &DeviceIdentity) -> bool {
        self.name == other.name && self.guid == other.guid
    }
}

/// Battery state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Battery {
    #[default]
    Unknown,
    Wired,
    Discharging(u8),
    Charging(u8),
    Charged,
}

/// SDL keycodes used by the built-in keyboard mapping
pub mod keycode {
    pub const RETURN: i32 = 13;
    pub const ESCAPE: i32 = 27;
    pub const BACKSPACE: i32 = 8;
    pub const SPACE: i32 = 32;
    pub const DELETE: i32 = 127;
    pub const F1: i32 = 0x4000_003A;
    pub const INSERT: i32 = 0x4000_0049;
    pub const PAGE_UP: i32 = 0x4000_004B;
    pub const PAGE_DOWN: i32 = 0x4000_004E;
    pub const RIGHT: i32 = 0x4000_004F;
    pub const LEFT: i32 = 0x4000_0050;
    pub const DOWN: i32 = 0x4000_0051;
    pub const UP: i32 = 0x4000_0052;
}

/// Mouse button identifiers
pub mod mouse_button {
    pub const LEFT: i32 = 1;
    pub const MIDDLE: i32 = 2;
    pub const RIGHT: i32 = 3;
}

/// One physical (or built-in) input device
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    identity: DeviceIdentity,
    index: Option<u32>,
    true_pad: bool,
    axis_count: usize,
    hat_count: usize,
    button_count: usize,
    battery: Battery,

    configured: Entries,
    patterns: [Option<RawPattern>; ENTRY_COUNT],

    /// Quantized neutral reading per axis, sampled at attach
    neutral_axis: Vec<i32>,
    /// Last quantized reading per physical axis
    pub(super) previous_axis: Vec<i32>,
    /// Last direction mask per physical hat
    pub(super) previous_hat: Vec<i32>,
    /// Press timestamps of currently active entries
    pub(super) hold_started: HashMap<LogicalEntry, Instant>,
    /// Hotkey is currently held
    pub(super) hotkey_held: bool,
    /// Select must not be reported when the current hotkey hold ends
    pub(super) kill_select: bool,
}

impl Device {
    pub fn new(id: DeviceId, identity: DeviceIdentity) -> Self {
        Self {
            id,
            identity,
            index: None,
            true_pad: true,
            axis_count: 0,
            hat_count: 0,
            button_count: 0,
            battery: Battery::Unknown,
            configured: Entries::empty(),
            patterns: [None; ENTRY_COUNT],
            neutral_axis: Vec::new(),
            previous_axis: Vec::new(),
            previous_hat: Vec::new(),
            hold_started: HashMap::new(),
            hotkey_held: false,
            kill_select: false,
        }
    }

    /// Build a device from an enumeration record and calibrate its axes
    pub fn from_info(info: &DeviceInfo) -> Self {
        let mut device = Self::new(DeviceId::Joystick(info.index), info.identity.clone());
        device.index = Some(info.index);
        device.true_pad = info.is_pad;
        device.axis_count = info.axis_count;
        device.hat_count = info.hat_count;
        device.button_count = info.button_count;
        device.battery = info.battery;
        device.previous_hat = vec![0; info.hat_count];
        device.calibrate(&info.axis_rest);
        device
    }

    /// The system keyboard with its default mapping
    pub fn keyboard() -> Self {
        use keycode::*;
        let mut device = Self::new(DeviceId::Keyboard, DeviceIdentity::new("Keyboard", ""));
        device.true_pad = false;
        for (entry, key) in [
            (LogicalEntry::Up, UP),
            (LogicalEntry::Down, DOWN),
            (LogicalEntry::Left, LEFT),
            (LogicalEntry::Right, RIGHT),
            (LogicalEntry::A, RETURN),
            (LogicalEntry::B, BACKSPACE),
            (LogicalEntry::X, INSERT),
            (LogicalEntry::Y, DELETE),
            (LogicalEntry::L1, PAGE_UP),
            (LogicalEntry::R1, PAGE_DOWN),
            (LogicalEntry::Start, SPACE),
            (LogicalEntry::Select, ESCAPE),
            (LogicalEntry::Hotkey, F1),
        ] {
            device.set_pattern(entry, RawPattern::key(key));
        }
        device
    }

    /// The system mouse with its default mapping
    pub fn mouse() -> Self {
        let mut device = Self::new(DeviceId::Mouse, DeviceIdentity::new("Mouse", ""));
        device.true_pad = false;
        device.set_pattern(
            LogicalEntry::A,
            RawPattern::new(RawKind::MouseButton, mouse_button::LEFT, 1),
        );
        device.set_pattern(
            LogicalEntry::B,
            RawPattern::new(RawKind::MouseButton, mouse_button::RIGHT, 1),
        );
        device.set_pattern(LogicalEntry::Up, RawPattern::new(RawKind::MouseWheel, 0, 1));
        device.set_pattern(LogicalEntry::Down, RawPattern::new(RawKind::MouseWheel, 0, -1));
        device
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn guid(&self) -> &str {
        &self.identity.guid
    }

    /// Platform index, `None` for the built-in keyboard and mouse
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// False for non-game devices sharing the enumeration (accelerometers, ...)
    pub fn is_true_pad(&self) -> bool {
        self.true_pad
    }

    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    pub fn hat_count(&self) -> usize {
        self.hat_count
    }

    pub fn button_count(&self) -> usize {
        self.button_count
    }

    pub fn battery(&self) -> Battery {
        self.battery
    }

    pub fn set_battery(&mut self, battery: Battery) {
        self.battery = battery;
    }

    // Mapping table

    pub fn set_pattern(&mut self, entry: LogicalEntry, pattern: RawPattern) {
        self.patterns[entry.index()] = Some(pattern);
        self.configured |= entry.flag();
    }

    pub fn clear_pattern(&mut self, entry: LogicalEntry) {
        self.patterns[entry.index()] = None;
        self.configured.remove(entry.flag());
    }

    /// Drop every configured pattern
    pub fn clear_mapping(&mut self) {
        self.patterns = [None; ENTRY_COUNT];
        self.configured = Entries::empty();
    }

    pub fn pattern(&self, entry: LogicalEntry) -> Option<&RawPattern> {
        self.patterns[entry.index()].as_ref()
    }

    /// Bit-set of configured entries
    pub fn configured(&self) -> Entries {
        self.configured
    }

    pub fn is_configured(&self, entry: LogicalEntry) -> bool {
        self.configured.contains(entry.flag())
    }

    pub fn configured_count(&self) -> usize {
        self.configured.entries().count()
    }

    /// No entry is mapped: the UI should route the user to guided setup
    pub fn needs_configuration(&self) -> bool {
        self.configured.is_empty()
    }

    /// Configured entries with their patterns, in bit order
    pub fn patterns(&self) -> impl Iterator<Item = (LogicalEntry, &RawPattern)> + '_ {
        LogicalEntry::ALL
            .into_iter()
            .filter_map(move |e| self.patterns[e.index()].as_ref().map(|p| (e, p)))
    }

    /// Hotkey and Select share the very same trigger
    pub fn hotkey_aliases_select(&self) -> bool {
        match (self.pattern(LogicalEntry::Hotkey), self.pattern(LogicalEntry::Select)) {
            (Some(hotkey), Some(select)) => {
                hotkey.kind == select.kind && hotkey.id == select.id && hotkey.value == select.value
            }
            _ => false,
        }
    }

    // Calibration

    /// Sample every axis' resting value once
    pub fn calibrate(&mut self, rest: &[i32]) {
        self.neutral_axis = rest.iter().map(|v| quantize_axis(*v)).collect();
        if self.axis_count < rest.len() {
            self.axis_count = rest.len();
        }
        self.previous_axis = self.resting_axes();
        debug!("Calibrated {} axis rest positions for {}: {:?}", rest.len(), self.id, self.neutral_axis);
    }

    /// Quantized neutral reading of `axis`, 0 if never sampled
    pub fn axis_neutral(&self, axis: i32) -> i32 {
        usize::try_from(axis)
            .ok()
            .and_then(|i| self.neutral_axis.get(i).copied())
            .unwrap_or(0)
    }

    // Live state

    /// Entry is currently held according to the translator
    pub fn is_active(&self, entry: LogicalEntry) -> bool {
        self.hold_started.contains_key(&entry)
    }

    /// Active plain entries
    pub fn active(&self) -> Entries {
        self.hold_started
            .keys()
            .fold(Entries::empty(), |acc, e| acc | e.flag())
    }

    pub fn is_hotkey_held(&self) -> bool {
        self.hotkey_held
    }

    /// Forget every transient reading (used when a device is reattached)
    pub fn reset_state(&mut self) {
        self.previous_axis = self.resting_axes();
        self.previous_hat = vec![0; self.hat_count];
        self.hold_started.clear();
        self.hotkey_held = false;
        self.kill_select = false;
    }

    /// Raw-event capture for the configuration wizard
    ///
    /// Returns the pattern `raw` would arm, or `None` if the event describes
    /// a control at rest (released button, centred hat, axis at its neutral).
    pub fn capture(&self, raw: &RawEvent) -> Option<RawPattern> {
        let pattern = match raw.kind {
            RawKind::Button | RawKind::Key | RawKind::MouseButton if raw.value != 0 => {
                RawPattern::new(raw.kind, raw.id, 1)
            }
            RawKind::Hat if raw.value != 0 => RawPattern::hat(raw.id, raw.value),
            RawKind::Axis => {
                let q = quantize_axis(raw.value);
                if q == 0 || q == self.axis_neutral(raw.id) {
                    return None;
                }
                RawPattern::axis(raw.id, q)
            }
            RawKind::MouseWheel if raw.value != 0 => {
                RawPattern::new(RawKind::MouseWheel, raw.id, raw.value.signum())
            }
            _ => return None,
        };
        Some(RawPattern {
            code: raw.code,
            ..pattern
        })
    }

    /// Neutral readings padded to the physical axis count
    fn resting_axes(&self) -> Vec<i32> {
        let mut axes = self.neutral_axis.clone();
        axes.resize(self.axis_count.max(axes.len()), 0);
        axes
    }

    /// Cache slot of a physical axis, `None` past the reported axis count
    pub(super) fn axis_cache(&mut self, axis: i32) -> Option<&mut i32> {
        usize::try_from(axis)
            .ok()
            .and_then(move |i| self.previous_axis.get_mut(i))
    }

    /// Cache slot of a physical hat, `None` past the reported hat count
    pub(super) fn hat_cache(&mut self, hat: i32) -> Option<&mut i32> {
        usize::try_from(hat)
            .ok()
            .and_then(move |i| self.previous_hat.get_mut(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> Device {
        Device::new(DeviceId::Joystick(0), DeviceIdentity::new("Pad", "0001"))
    }

    #[test]
    fn test_quantize_axis() {
        assert_eq!(quantize_axis(0), 0);
        assert_eq!(quantize_axis(AXIS_DEAD_ZONE), 0);
        assert_eq!(quantize_axis(AXIS_DEAD_ZONE + 1), 1);
        assert_eq!(quantize_axis(-32768), -1);
    }

    #[test]
    fn test_set_and_clear_pattern_tracks_configured_bits() {
        let mut device = pad();
        assert!(device.needs_configuration());

        device.set_pattern(LogicalEntry::A, RawPattern::button(1));
        assert!(device.is_configured(LogicalEntry::A));
        assert_eq!(device.configured(), Entries::A);
        assert_eq!(device.configured_count(), 1);

        device.clear_pattern(LogicalEntry::A);
        assert!(device.needs_configuration());
        assert!(device.pattern(LogicalEntry::A).is_none());
    }

    #[test]
    fn test_hotkey_alias_detection() {
        let mut device = pad();
        device.set_pattern(LogicalEntry::Select, RawPattern::button(6));
        assert!(!device.hotkey_aliases_select());
        device.set_pattern(LogicalEntry::Hotkey, RawPattern::button(6));
        assert!(device.hotkey_aliases_select());
        device.set_pattern(LogicalEntry::Hotkey, RawPattern::button(8));
        assert!(!device.hotkey_aliases_select());
    }

    #[test]
    fn test_enumerated_pad_sizes_caches_and_keeps_index() {
        let mut info = DeviceInfo::new(3, DeviceIdentity::new("Pad", "0001"));
        info.axis_count = 4;
        info.hat_count = 1;
        info.axis_rest = vec![0, 32767];

        let mut device = Device::from_info(&info);
        assert_eq!(device.index(), Some(3));
        assert_eq!(device.previous_axis, vec![0, 1, 0, 0]);
        assert_eq!(device.previous_hat, vec![0]);

        device.reset_state();
        assert_eq!(device.previous_axis.len(), 4);
        assert_eq!(device.previous_hat.len(), 1);

        assert_eq!(Device::keyboard().index(), None);
        assert_eq!(Device::mouse().index(), None);
    }

    #[test]
    fn test_calibration_quantizes_rest_values() {
        let mut device = pad();
        device.calibrate(&[0, -32768, 120, 32767]);
        assert_eq!(device.axis_neutral(0), 0);
        assert_eq!(device.axis_neutral(1), -1);
        assert_eq!(device.axis_neutral(3), 1);
        assert_eq!(device.axis_neutral(9), 0);
        assert_eq!(device.axis_count(), 4);
    }

    #[test]
    fn test_capture_ignores_controls_at_rest() {
        let mut device = pad();
        device.calibrate(&[0, -32768]);
        let id = device.id();

        assert_eq!(device.capture(&RawEvent::button(id, 4, true)), Some(RawPattern::button(4)));
        assert_eq!(device.capture(&RawEvent::button(id, 4, false)), None);
        assert_eq!(device.capture(&RawEvent::hat(id, 0, 0)), None);
        assert_eq!(device.capture(&RawEvent::hat(id, 0, 8)), Some(RawPattern::hat(0, 8)));
        // Trigger resting at -1 is not a press
        assert_eq!(device.capture(&RawEvent::axis(id, 1, -32768)), None);
        assert_eq!(device.capture(&RawEvent::axis(id, 1, 32767)), Some(RawPattern::axis(1, 1)));
        assert_eq!(device.capture(&RawEvent::axis(id, 0, -30000)), Some(RawPattern::axis(0, -1)));
    }

    #[test]
    fn test_builtin_devices_are_configured() {
        let keyboard = Device::keyboard();
        assert!(!keyboard.is_true_pad());
        assert!(keyboard.is_configured(LogicalEntry::Hotkey));
        assert_eq!(keyboard.pattern(LogicalEntry::Up), Some(&RawPattern::key(keycode::UP)));

        let mouse = Device::mouse();
        assert_eq!(mouse.pattern(LogicalEntry::Down).unwrap().value, -1);
    }
}
