//! Canonical, edge-triggered output of the translator

use std::fmt;

use super::entry::{Entries, LogicalEntry};
use super::raw::{DeviceId, RawEvent};

/// Translation of one raw event into on/off logical entry bit-sets
///
/// Built once per translated input and never mutated afterwards. An entry
/// may sit in `off` for one bit while an aliased entry appears in `on` (see
/// the Hotkey/Select aliasing rule in the translator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactEvent {
    on: Entries,
    off: Entries,
    elapsed_ms: u32,
    device: DeviceId,
    raw: RawEvent,
    needs_configuration: bool,
}

impl CompactEvent {
    pub(crate) fn new(
        on: Entries,
        off: Entries,
        elapsed_ms: u32,
        raw: RawEvent,
        needs_configuration: bool,
    ) -> Self {
        Self {
            on,
            off,
            elapsed_ms,
            device: raw.device,
            raw,
            needs_configuration,
        }
    }

    /// Entries that just became active
    pub fn on(&self) -> Entries {
        self.on
    }

    /// Entries that just became inactive
    pub fn off(&self) -> Entries {
        self.off
    }

    /// Hold duration of the releasing entry, 0 when nothing was released
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn raw(&self) -> &RawEvent {
        &self.raw
    }

    /// Source device has no mapped entry and should go through guided setup
    pub fn needs_configuration(&self) -> bool {
        self.needs_configuration
    }

    pub fn is_empty(&self) -> bool {
        self.on.is_empty() && self.off.is_empty()
    }

    /// `entry` was pressed without the Hotkey
    pub fn pressed(&self, entry: LogicalEntry) -> bool {
        self.on.contains(entry.flag())
    }

    /// `entry` was released (plain bit)
    pub fn released(&self, entry: LogicalEntry) -> bool {
        self.off.contains(entry.flag())
    }

    /// `entry` was pressed while the Hotkey was held
    pub fn hotkey_pressed(&self, entry: LogicalEntry) -> bool {
        self.on.contains_chord(entry)
    }

    /// `entry` was released while the Hotkey was held
    pub fn hotkey_released(&self, entry: LogicalEntry) -> bool {
        self.off.contains_chord(entry)
    }
}

impl fmt::Display for CompactEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] on={} off={} elapsed={}ms",
            self.device, self.on, self.off, self.elapsed_ms
        )?;
        if self.needs_configuration {
            f.write_str(" (needs configuration)")?;
        }
        Ok(())
    }
}
