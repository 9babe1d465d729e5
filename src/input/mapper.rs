//! Player slot management
//!
//! The mapper owns a fixed number of ordered player slots. Each slot is
//! either empty or bound to a device identity (name + GUID); a bound slot is
//! connected while a matching device is enumerated. Bindings are persisted
//! as `pad.<slot>` → `"<guid>:<name>"` so that player order survives
//! reconnects and restarts.

use tracing::{debug, info, warn};

use super::device::DeviceIdentity;
use super::error::InputError;
use super::source::DeviceInfo;
use crate::storage::ConfigStore;

/// Store key for a slot binding
pub fn slot_key(slot: usize) -> String {
    format!("pad.{}", slot)
}

/// Parse a persisted `"<guid>:<name>"` binding
pub fn parse_binding(value: &str) -> Result<DeviceIdentity, InputError> {
    let (guid, name) = value
        .split_once(':')
        .ok_or_else(|| InputError::InvalidBinding(value.to_string()))?;
    if name.is_empty() {
        return Err(InputError::InvalidBinding(value.to_string()));
    }
    Ok(DeviceIdentity::new(name, guid))
}

/// Slot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Disconnected,
    Connected,
}

/// One player slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    position: usize,
    identity: Option<DeviceIdentity>,
    index: Option<u32>,
}

impl Pad {
    fn empty(position: usize) -> Self {
        Self {
            position,
            identity: None,
            index: None,
        }
    }

    /// Slot position, 0-based
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    pub fn guid(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.guid.as_str())
    }

    /// Enumeration path of the last device seen in this slot
    pub fn path(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .map(|i| i.path.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Live platform index, `None` when not connected
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn is_bound(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.index.is_some()
    }

    pub fn state(&self) -> SlotState {
        match (&self.identity, self.index) {
            (None, _) => SlotState::Empty,
            (Some(_), None) => SlotState::Disconnected,
            (Some(_), Some(_)) => SlotState::Connected,
        }
    }

    /// Value persisted for this slot
    pub fn binding(&self) -> Option<String> {
        self.identity
            .as_ref()
            .map(|i| format!("{}:{}", i.guid, i.name))
    }

    fn connect(&mut self, info: &DeviceInfo) {
        let path = info.identity.path.clone();
        match self.identity.as_mut() {
            Some(identity) if identity.matches(&info.identity) => identity.path = path,
            _ => self.identity = Some(info.identity.clone()),
        }
        self.index = Some(info.index);
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Slots whose binding found its device again
    pub reconnected: Vec<usize>,
    /// Empty slots given to a new device
    pub assigned: Vec<usize>,
    /// Disconnected slots taken over by a new device, with the evicted identity
    pub evicted: Vec<(usize, DeviceIdentity)>,
    /// Devices left without a slot
    pub unassigned: Vec<DeviceIdentity>,
    /// Bindings were written to the store
    pub persisted: bool,
}

impl ReconcileReport {
    pub fn has_new_assignment(&self) -> bool {
        !self.assigned.is_empty() || !self.evicted.is_empty()
    }
}

/// Fixed-capacity ordered player slots
#[derive(Debug, Clone)]
pub struct DeviceMapper {
    pads: Vec<Pad>,
}

impl DeviceMapper {
    /// Create `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Self {
            pads: (0..capacity).map(Pad::empty).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.pads.len()
    }

    pub fn pads(&self) -> &[Pad] {
        &self.pads
    }

    /// Slot at `slot`, clamped to the last slot
    pub fn pad(&self, slot: usize) -> Option<&Pad> {
        self.clamp(slot).and_then(|s| self.pads.get(s))
    }

    /// Slot currently holding the device at platform `index`
    pub fn slot_of_index(&self, index: u32) -> Option<usize> {
        self.pads.iter().position(|p| p.index == Some(index))
    }

    pub fn connected_count(&self) -> usize {
        self.pads.iter().filter(|p| p.is_connected()).count()
    }

    fn clamp(&self, slot: usize) -> Option<usize> {
        self.pads.len().checked_sub(1).map(|last| slot.min(last))
    }

    /// Reload persisted bindings into every slot
    ///
    /// A slot keeps its record when the stored binding names the same
    /// identity; the live index is always dropped.
    pub fn load(&mut self, store: &dyn ConfigStore) {
        for pad in &mut self.pads {
            pad.index = None;
            let stored = store.get(&slot_key(pad.position)).and_then(|value| {
                parse_binding(&value)
                    .map_err(|e| warn!("Ignoring binding of slot {}: {}", pad.position, e))
                    .ok()
            });
            match stored {
                Some(identity) => {
                    let same = pad.identity.as_ref().is_some_and(|i| i.matches(&identity));
                    if !same {
                        pad.identity = Some(identity);
                    }
                }
                None => pad.identity = None,
            }
        }
    }

    /// Match the enumerated devices against the slot bindings
    ///
    /// # Arguments
    /// * `available` - Enumerated devices, in enumeration order
    /// * `store` - Binding store, written only when a new assignment happened
    pub fn reconcile(&mut self, available: &[DeviceInfo], store: &mut dyn ConfigStore) -> ReconcileReport {
        self.load(store);
        let mut report = ReconcileReport::default();

        let mut pool: Vec<&DeviceInfo> = available.iter().filter(|d| d.is_pad).collect();

        // Bound slots reclaim their devices
        for pad in &mut self.pads {
            let Some(identity) = pad.identity.as_ref() else {
                continue;
            };
            if let Some(found) = pool.iter().position(|d| d.identity.matches(identity)) {
                let info = pool.remove(found);
                pad.connect(info);
                report.reconnected.push(pad.position);
                debug!("Slot {} reclaimed {} at index {}", pad.position, info.identity.name, info.index);
            }
        }

        // New devices: empty slots first, then disconnected bindings
        let mut remaining = pool.into_iter();
        for info in remaining.by_ref() {
            if let Some(pad) = self.pads.iter_mut().find(|p| p.state() == SlotState::Empty) {
                pad.connect(info);
                report.assigned.push(pad.position);
                info!("🎮 Player {} assigned: {}", pad.position + 1, info.identity.name);
                continue;
            }
            if let Some(pad) = self.pads.iter_mut().find(|p| p.state() == SlotState::Disconnected) {
                if let Some(old) = pad.identity.take() {
                    info!(
                        "🎮 Player {} taken over by {} (was {})",
                        pad.position + 1,
                        info.identity.name,
                        old.name
                    );
                    report.evicted.push((pad.position, old));
                }
                pad.connect(info);
                continue;
            }
            report.unassigned.push(info.identity.clone());
            break;
        }
        report
            .unassigned
            .extend(remaining.map(|info| info.identity.clone()));
        if !report.unassigned.is_empty() {
            warn!("⚠️  {} device(s) left without a player slot", report.unassigned.len());
        }

        if report.has_new_assignment() {
            self.persist(store);
            report.persisted = true;
        }
        report
    }

    /// Exchange two slots; indices are clamped
    pub fn swap(&mut self, a: usize, b: usize, store: &mut dyn ConfigStore) {
        let (Some(a), Some(b)) = (self.clamp(a), self.clamp(b)) else {
            return;
        };
        if a == b {
            return;
        }
        self.pads.swap(a, b);
        self.pads[a].position = a;
        self.pads[b].position = b;
        info!("🔀 Swapped players {} and {}", a + 1, b + 1);
        self.persist(store);
    }

    /// Write every slot binding and flush
    fn persist(&self, store: &mut dyn ConfigStore) {
        for pad in &self.pads {
            let key = slot_key(pad.position);
            let result = match pad.binding() {
                Some(value) => store.set(&key, &value),
                None => store.remove(&key),
            };
            if let Err(e) = result {
                warn!("Failed to persist {}: {:#}", key, e);
            }
        }
        if let Err(e) = store.flush() {
            warn!("Failed to flush slot bindings: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn pad_info(index: u32, name: &str, guid: &str) -> DeviceInfo {
        DeviceInfo::new(index, DeviceIdentity::new(name, guid).with_path(format!("/dev/input/event{}", index)))
    }

    fn store_with(bindings: &[(usize, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (slot, value) in bindings {
            store.set(&slot_key(*slot), value).unwrap();
        }
        store
    }

    #[test]
    fn test_parse_binding() {
        let identity = parse_binding("ABCD-1234:Generic Pad").unwrap();
        assert_eq!(identity.guid, "ABCD-1234");
        assert_eq!(identity.name, "Generic Pad");
        assert_eq!(parse_binding(":Name Only").unwrap().guid, "");
        assert_eq!(parse_binding("0300:Pad: Deluxe").unwrap().name, "Pad: Deluxe");
        assert!(parse_binding("no separator").is_err());
        assert!(parse_binding("abcd:").is_err());
    }

    #[test]
    fn test_persisted_slot_reconnects_without_write() {
        let mut store = store_with(&[(0, "ABCD-1234:Generic Pad")]);
        let writes = store.write_count();
        let mut mapper = DeviceMapper::new(4);

        let report = mapper.reconcile(&[pad_info(3, "Generic Pad", "ABCD-1234")], &mut store);

        let slot0 = mapper.pad(0).unwrap();
        assert_eq!(slot0.state(), SlotState::Connected);
        assert_eq!(slot0.index(), Some(3));
        assert_eq!(slot0.path(), Some("/dev/input/event3"));
        for slot in 1..4 {
            assert_eq!(mapper.pad(slot).unwrap().state(), SlotState::Empty);
        }
        assert_eq!(report.reconnected, vec![0]);
        assert!(!report.persisted);
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_new_devices_fill_empty_slots_in_order() {
        let mut store = store_with(&[(1, "bbbb:Bound Pad")]);
        let mut mapper = DeviceMapper::new(3);

        let report = mapper.reconcile(
            &[pad_info(0, "First", "1111"), pad_info(1, "Second", "2222")],
            &mut store,
        );

        assert_eq!(report.assigned, vec![0, 2]);
        assert_eq!(mapper.pad(0).unwrap().name(), Some("First"));
        assert_eq!(mapper.pad(1).unwrap().state(), SlotState::Disconnected);
        assert_eq!(mapper.pad(2).unwrap().name(), Some("Second"));
        assert!(report.persisted);
        assert_eq!(store.get("pad.2").as_deref(), Some("2222:Second"));
        assert_eq!(store.get("pad.1").as_deref(), Some("bbbb:Bound Pad"));
    }

    #[test]
    fn test_disconnected_binding_is_evicted_when_full() {
        let mut store = store_with(&[(0, "aaaa:Away"), (1, "bbbb:Here")]);
        let mut mapper = DeviceMapper::new(2);

        let report = mapper.reconcile(
            &[pad_info(0, "Newcomer", "cccc"), pad_info(1, "Here", "bbbb"), pad_info(2, "Late", "dddd")],
            &mut store,
        );

        assert_eq!(report.reconnected, vec![1]);
        assert_eq!(report.evicted, vec![(0, DeviceIdentity::new("Away", "aaaa"))]);
        assert_eq!(report.unassigned, vec![DeviceIdentity::new("Late", "dddd").with_path("/dev/input/event2")]);
        assert_eq!(mapper.pad(0).unwrap().name(), Some("Newcomer"));
        assert_eq!(store.get("pad.0").as_deref(), Some("cccc:Newcomer"));
    }

    #[test]
    fn test_non_pad_devices_are_excluded() {
        let mut store = MemoryStore::new();
        let mut mapper = DeviceMapper::new(2);
        let mut accel = pad_info(0, "Motion Sensors", "eeee");
        accel.is_pad = false;

        let report = mapper.reconcile(&[accel, pad_info(1, "Pad", "1111")], &mut store);
        assert_eq!(report.assigned, vec![0]);
        assert_eq!(mapper.pad(0).unwrap().index(), Some(1));
        assert_eq!(mapper.connected_count(), 1);
    }

    #[test]
    fn test_slot_stability_across_reconnect() {
        let mut store = MemoryStore::new();
        let mut mapper = DeviceMapper::new(4);
        mapper.reconcile(&[pad_info(0, "Alpha", "a1"), pad_info(1, "Beta", "b2")], &mut store);
        assert_eq!(mapper.pad(1).unwrap().name(), Some("Beta"));

        // Beta unplugged
        mapper.reconcile(&[pad_info(0, "Alpha", "a1")], &mut store);
        assert_eq!(mapper.pad(1).unwrap().state(), SlotState::Disconnected);

        // Beta returns behind a newcomer enumerated first, at a new index
        let report = mapper.reconcile(
            &[pad_info(2, "Gamma", "c3"), pad_info(0, "Alpha", "a1"), pad_info(5, "Beta", "b2")],
            &mut store,
        );
        assert_eq!(mapper.pad(1).unwrap().name(), Some("Beta"));
        assert_eq!(mapper.pad(1).unwrap().index(), Some(5));
        assert_eq!(mapper.pad(2).unwrap().name(), Some("Gamma"));
        assert_eq!(report.assigned, vec![2]);
        assert_eq!(mapper.slot_of_index(5), Some(1));
    }

    #[test]
    fn test_identical_controllers_take_distinct_slots() {
        let mut store = store_with(&[(0, "1111:Twin"), (1, "1111:Twin")]);
        let mut mapper = DeviceMapper::new(2);
        let report = mapper.reconcile(&[pad_info(4, "Twin", "1111"), pad_info(7, "Twin", "1111")], &mut store);
        assert_eq!(report.reconnected, vec![0, 1]);
        assert_eq!(mapper.pad(0).unwrap().index(), Some(4));
        assert_eq!(mapper.pad(1).unwrap().index(), Some(7));
    }

    #[test]
    fn test_swap_exchanges_records_and_persists() {
        let mut store = MemoryStore::new();
        let mut mapper = DeviceMapper::new(3);
        mapper.reconcile(&[pad_info(0, "Alpha", "a1"), pad_info(1, "Beta", "b2")], &mut store);

        mapper.swap(0, 99, &mut store);
        assert_eq!(mapper.pad(2).unwrap().name(), Some("Alpha"));
        assert_eq!(mapper.pad(2).unwrap().index(), Some(0));
        assert_eq!(mapper.pad(2).unwrap().position(), 2);
        assert_eq!(mapper.pad(0).unwrap().state(), SlotState::Empty);
        assert_eq!(store.get("pad.2").as_deref(), Some("a1:Alpha"));
        assert_eq!(store.get("pad.0"), None);

        // Survives a rebuild
        mapper.reconcile(&[pad_info(0, "Alpha", "a1"), pad_info(1, "Beta", "b2")], &mut store);
        assert_eq!(mapper.pad(2).unwrap().name(), Some("Alpha"));
    }

    #[test]
    fn test_queries_are_clamped() {
        let mapper = DeviceMapper::new(2);
        assert_eq!(mapper.pad(10).unwrap().position(), 1);
        assert!(DeviceMapper::new(0).pad(0).is_none());
        let mut empty = DeviceMapper::new(0);
        empty.swap(0, 1, &mut MemoryStore::new());
    }

    #[test]
    fn test_malformed_binding_leaves_slot_empty() {
        let mut store = store_with(&[(0, "garbage")]);
        let mut mapper = DeviceMapper::new(1);
        mapper.load(&store);
        assert_eq!(mapper.pad(0).unwrap().state(), SlotState::Empty);
        let report = mapper.reconcile(&[pad_info(2, "Pad", "9999")], &mut store);
        assert_eq!(report.assigned, vec![0]);
        assert_eq!(store.get("pad.0").as_deref(), Some("9999:Pad"));
    }
}
