//! Event translator: raw event → compact event
//!
//! Two stages run for every raw event:
//!
//! 1. **Edges** - every configured entry whose pattern addresses the event is
//!    evaluated to a level (`is`) and compared with its previous level to
//!    emit on/off transitions. Hold timers are started and stopped here.
//! 2. **Hotkey** - while the Hotkey is held, non-special bits are moved to
//!    the chord range, and the Hotkey/Select aliasing rule is applied.

use std::time::Instant;
use tracing::{debug, trace, warn};

use super::compact::CompactEvent;
use super::device::{quantize_axis, Device};
use super::entry::{Entries, LogicalEntry};
use super::raw::{RawEvent, RawKind, RawPattern};

/// Transitions gathered by the edge stage
#[derive(Debug, Default)]
struct Edges {
    on: Entries,
    off: Entries,
    elapsed_ms: u32,
}

impl Device {
    /// Translate `raw` at the current time
    pub fn translate(&mut self, raw: &RawEvent) -> CompactEvent {
        self.translate_at(raw, Instant::now())
    }

    /// Translate `raw` as if it arrived at `now`
    pub fn translate_at(&mut self, raw: &RawEvent, now: Instant) -> CompactEvent {
        let aliased = self.hotkey_aliases_select();

        let edges = match raw.kind {
            RawKind::Unknown => {
                warn!("Ignoring unsupported raw event from {}: {}", self.id(), raw);
                Edges::default()
            }
            _ => self.collect_edges(raw, aliased, now),
        };

        let (on, off) = self.apply_hotkey(raw, edges.on, edges.off, aliased);

        let event = CompactEvent::new(on, off, edges.elapsed_ms, *raw, self.needs_configuration());
        if !event.is_empty() {
            debug!("{} <- {}", event, raw);
        }
        event
    }

    fn collect_edges(&mut self, raw: &RawEvent, aliased: bool, now: Instant) -> Edges {
        let mut edges = Edges::default();

        let matching: Vec<(LogicalEntry, RawPattern)> = self
            .patterns()
            .filter(|(entry, pattern)| {
                pattern.addresses(raw) && !(aliased && *entry == LogicalEntry::Select)
            })
            .map(|(entry, pattern)| (entry, *pattern))
            .collect();

        for (entry, pattern) in matching {
            let is = self.level(entry, &pattern, raw);
            let was = self.previous_level(entry, &pattern);
            let active = self.is_active(entry);

            if is && !active {
                self.hold_started.insert(entry, now);
                edges.on |= entry.flag();
            } else if !is && (was || active) {
                let held_ms = self
                    .hold_started
                    .remove(&entry)
                    .map(|start| now.saturating_duration_since(start).as_millis())
                    .map(|ms| u32::try_from(ms).unwrap_or(u32::MAX))
                    .unwrap_or(0);
                edges.off |= entry.flag();
                edges.elapsed_ms = edges.elapsed_ms.max(held_ms);
            }
        }

        // Caches follow the physical controls even when nothing is mapped on them
        match raw.kind {
            RawKind::Axis => {
                if let Some(previous) = self.axis_cache(raw.id) {
                    *previous = quantize_axis(raw.value);
                }
            }
            RawKind::Hat => {
                if let Some(previous) = self.hat_cache(raw.id) {
                    *previous = raw.value;
                }
            }
            _ => {}
        }

        edges
    }

    /// Level of `entry` once `raw` is applied
    fn level(&self, entry: LogicalEntry, pattern: &RawPattern, raw: &RawEvent) -> bool {
        match raw.kind {
            RawKind::Button | RawKind::Key | RawKind::MouseButton => raw.value != 0,
            RawKind::Hat => hat_covers(raw.value, pattern.value),
            RawKind::Axis => self.axis_level(entry, pattern, quantize_axis(raw.value)),
            RawKind::MouseWheel => raw.value != 0 && raw.value.signum() == pattern.value.signum(),
            RawKind::Unknown => false,
        }
    }

    /// Level of `entry` before the current event, from the hardware caches.
    /// Controls past the physical counts have no cache and use the hold state.
    fn previous_level(&self, entry: LogicalEntry, pattern: &RawPattern) -> bool {
        let cached = |cache: &[i32]| {
            usize::try_from(pattern.id)
                .ok()
                .and_then(|i| cache.get(i).copied())
        };
        let level = match pattern.kind {
            RawKind::Hat => cached(&self.previous_hat).map(|mask| hat_covers(mask, pattern.value)),
            RawKind::Axis => cached(&self.previous_axis).map(|q| self.axis_level(entry, pattern, q)),
            _ => None,
        };
        level.unwrap_or_else(|| self.is_active(entry))
    }

    /// Stick directions read relative to the axis rest position; binary
    /// axes compare the raw quantized value with the armed value.
    fn axis_level(&self, entry: LogicalEntry, pattern: &RawPattern, quantized: i32) -> bool {
        let armed = pattern.value.signum();
        if armed == 0 {
            return false;
        }
        if entry.opposite().is_some() {
            let relative = if quantized == self.axis_neutral(pattern.id) {
                0
            } else {
                quantized
            };
            relative == armed
        } else {
            quantized == armed
        }
    }

    fn apply_hotkey(
        &mut self,
        raw: &RawEvent,
        mut on: Entries,
        mut off: Entries,
        aliased: bool,
    ) -> (Entries, Entries) {
        let pressed_now = on.contains(Entries::HOTKEY);
        let released_now = off.contains(Entries::HOTKEY);
        let was_held = self.hotkey_held;

        if pressed_now {
            self.hotkey_held = true;
            trace!("Hotkey held on {}", self.id());
        }

        if aliased && was_held && !released_now {
            let select_pressed = self
                .pattern(LogicalEntry::Select)
                .copied()
                .filter(|p| p.addresses(raw))
                .map(|p| self.level(LogicalEntry::Select, &p, raw))
                .unwrap_or(false);
            if select_pressed {
                debug!("Select suppressed during hotkey hold on {}", self.id());
                self.kill_select = true;
            }
        }

        if self.hotkey_held && !released_now {
            if aliased && !(on - Entries::ALWAYS_SPECIAL).is_empty() {
                self.kill_select = true;
            }
            on = on.chorded();
            off = off.chorded();
        }

        if released_now {
            self.hotkey_held = false;
            if aliased && !self.kill_select {
                on |= Entries::SELECT;
            }
            self.kill_select = false;
            trace!("Hotkey released on {}", self.id());
        }

        (on, off)
    }
}

/// Every direction bit of `pattern` is present in `mask`
fn hat_covers(mask: i32, pattern: i32) -> bool {
    pattern != 0 && mask & pattern == pattern
}
