//! Raw hardware events and the patterns stored against logical entries

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::InputError;

/// Identifier of an input device as known to the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceId {
    /// Game controller, by platform instance id
    Joystick(u32),
    /// The system keyboard
    Keyboard,
    /// The system mouse
    Mouse,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Joystick(id) => write!(f, "joystick:{}", id),
            DeviceId::Keyboard => f.write_str("keyboard"),
            DeviceId::Mouse => f.write_str("mouse"),
        }
    }
}

/// Kind of hardware signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    Axis,
    Button,
    Hat,
    Key,
    MouseButton,
    MouseWheel,
    /// Anything the platform reported that this core does not understand
    Unknown,
}

impl RawKind {
    /// Name used in mapping documents
    pub fn as_str(self) -> &'static str {
        match self {
            RawKind::Axis => "axis",
            RawKind::Button => "button",
            RawKind::Hat => "hat",
            RawKind::Key => "key",
            RawKind::MouseButton => "mousebutton",
            RawKind::MouseWheel => "mousewheel",
            RawKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Result<Self, InputError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "axis" => Ok(RawKind::Axis),
            "button" => Ok(RawKind::Button),
            "hat" => Ok(RawKind::Hat),
            "key" => Ok(RawKind::Key),
            "mousebutton" => Ok(RawKind::MouseButton),
            "mousewheel" => Ok(RawKind::MouseWheel),
            other => Err(InputError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for RawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hat direction bits
pub mod hat {
    pub const CENTERED: i32 = 0;
    pub const UP: i32 = 1;
    pub const RIGHT: i32 = 2;
    pub const DOWN: i32 = 4;
    pub const LEFT: i32 = 8;
}

/// One hardware signal as reported by the platform input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawEvent {
    pub device: DeviceId,
    pub kind: RawKind,
    pub id: i32,
    pub value: i32,
    /// Low-level platform code, diagnostics/export only
    pub code: i32,
}

impl RawEvent {
    pub fn new(device: DeviceId, kind: RawKind, id: i32, value: i32) -> Self {
        Self {
            device,
            kind,
            id,
            value,
            code: 0,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn button(device: DeviceId, id: i32, pressed: bool) -> Self {
        Self::new(device, RawKind::Button, id, pressed as i32)
    }

    pub fn axis(device: DeviceId, id: i32, value: i32) -> Self {
        Self::new(device, RawKind::Axis, id, value)
    }

    pub fn hat(device: DeviceId, id: i32, mask: i32) -> Self {
        Self::new(device, RawKind::Hat, id, mask)
    }

    pub fn key(id: i32, pressed: bool) -> Self {
        Self::new(DeviceId::Keyboard, RawKind::Key, id, pressed as i32)
    }

    pub fn mouse_button(id: i32, pressed: bool) -> Self {
        Self::new(DeviceId::Mouse, RawKind::MouseButton, id, pressed as i32)
    }

    pub fn mouse_wheel(ticks: i32) -> Self {
        Self::new(DeviceId::Mouse, RawKind::MouseWheel, 0, ticks)
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}#{}={} (code {})",
            self.device, self.kind, self.id, self.value, self.code
        )
    }
}

/// Configured trigger for one logical entry
///
/// `value` is the armed direction: the sign for axes and wheels, the
/// direction mask for hats, and 1 for buttons and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawPattern {
    pub kind: RawKind,
    pub id: i32,
    pub value: i32,
    #[serde(default)]
    pub code: i32,
}

impl RawPattern {
    pub fn new(kind: RawKind, id: i32, value: i32) -> Self {
        Self {
            kind,
            id,
            value,
            code: 0,
        }
    }

    pub fn button(id: i32) -> Self {
        Self::new(RawKind::Button, id, 1)
    }

    pub fn axis(id: i32, direction: i32) -> Self {
        Self::new(RawKind::Axis, id, direction.signum())
    }

    pub fn hat(id: i32, mask: i32) -> Self {
        Self::new(RawKind::Hat, id, mask)
    }

    pub fn key(id: i32) -> Self {
        Self::new(RawKind::Key, id, 1)
    }

    /// Same kind and identifier as `event`; the value is judged by the translator
    pub fn addresses(&self, event: &RawEvent) -> bool {
        self.kind == event.kind && self.id == event.id
    }

    /// Unit pattern for the same control moved the other way (axes and wheels only)
    pub fn reversed(&self) -> Option<Self> {
        match self.kind {
            RawKind::Axis | RawKind::MouseWheel => Some(Self {
                value: -self.value.signum(),
                ..*self
            }),
            _ => None,
        }
    }
}

impl fmt::Display for RawPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.kind, self.id, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_parse_back() {
        for kind in [
            RawKind::Axis,
            RawKind::Button,
            RawKind::Hat,
            RawKind::Key,
            RawKind::MouseButton,
            RawKind::MouseWheel,
        ] {
            assert_eq!(RawKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(RawKind::parse("touch").is_err());
    }

    #[test]
    fn test_pattern_addresses_kind_and_id() {
        let pattern = RawPattern::button(3);
        let dev = DeviceId::Joystick(0);
        assert!(pattern.addresses(&RawEvent::button(dev, 3, true)));
        assert!(!pattern.addresses(&RawEvent::button(dev, 4, true)));
        assert!(!pattern.addresses(&RawEvent::axis(dev, 3, 32000)));
    }

    #[test]
    fn test_axis_pattern_keeps_only_sign() {
        assert_eq!(RawPattern::axis(1, -32768).value, -1);
        assert_eq!(RawPattern::axis(1, 200).reversed().unwrap().value, -1);
        assert!(RawPattern::button(1).reversed().is_none());
    }

    #[test]
    fn test_reversing_extreme_values_keeps_unit_direction() {
        let low = RawPattern::new(RawKind::Axis, 1, i32::MIN);
        assert_eq!(low.reversed().unwrap().value, 1);
        let high = RawPattern::new(RawKind::MouseWheel, 0, i32::MAX);
        assert_eq!(high.reversed().unwrap().value, -1);
    }
}
