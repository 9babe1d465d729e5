//! Default mappings from generic controller descriptions
//!
//! A description is an SDL GameController mapping string:
//!
//! ```text
//! 030000005e0400008e02000010010000,X360 Controller,a:b0,b:b1,dpup:h0.1,leftx:a0,lefttrigger:a2,platform:Linux,
//! ```
//!
//! The frontend's A/B and X/Y follow the Nintendo layout, so the face buttons
//! of the description are swapped on purpose.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::device::Device;
use super::entry::LogicalEntry;
use super::error::InputError;
use super::raw::RawPattern;

/// What a description key drives
#[derive(Debug, Clone, Copy)]
enum Target {
    Single(LogicalEntry),
    /// Full axis: negative half, positive half
    Stick(LogicalEntry, LogicalEntry),
}

fn target_for(key: &str) -> Option<Target> {
    use LogicalEntry::*;
    let target = match key {
        "dpup" => Target::Single(Up),
        "dpdown" => Target::Single(Down),
        "dpleft" => Target::Single(Left),
        "dpright" => Target::Single(Right),
        "a" => Target::Single(B),
        "b" => Target::Single(A),
        "x" => Target::Single(Y),
        "y" => Target::Single(X),
        "back" => Target::Single(Select),
        "guide" => Target::Single(Hotkey),
        "start" => Target::Single(Start),
        "leftshoulder" => Target::Single(L1),
        "rightshoulder" => Target::Single(R1),
        "lefttrigger" => Target::Single(L2),
        "righttrigger" => Target::Single(R2),
        "leftstick" => Target::Single(L3),
        "rightstick" => Target::Single(R3),
        "leftx" => Target::Stick(Joy1Left, Joy1Right),
        "lefty" => Target::Stick(Joy1Up, Joy1Down),
        "rightx" => Target::Stick(Joy2Left, Joy2Right),
        "righty" => Target::Stick(Joy2Up, Joy2Down),
        _ => return None,
    };
    Some(target)
}

/// Parsed right-hand side of a `key:value` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Button(i32),
    Hat { id: i32, mask: i32 },
    Axis { id: i32, half: Option<i32>, inverted: bool },
}

fn parse_number(token: &str, digits: &str) -> Result<i32, InputError> {
    digits
        .parse::<i32>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| InputError::InvalidToken(token.to_string()))
}

fn parse_source(value: &str) -> Result<Source, InputError> {
    let invalid = || InputError::InvalidToken(value.to_string());

    let (half, rest) = match value.as_bytes().first() {
        Some(b'+') => (Some(1), &value[1..]),
        Some(b'-') => (Some(-1), &value[1..]),
        _ => (None, value),
    };
    let (rest, inverted) = match rest.strip_suffix('~') {
        Some(stripped) => (stripped, true),
        None => (rest, false),
    };

    if let Some(digits) = rest.strip_prefix('a') {
        return Ok(Source::Axis {
            id: parse_number(value, digits)?,
            half,
            inverted,
        });
    }
    if half.is_some() || inverted {
        return Err(invalid());
    }
    if let Some(digits) = rest.strip_prefix('b') {
        return Ok(Source::Button(parse_number(value, digits)?));
    }
    if let Some(hat) = rest.strip_prefix('h') {
        let (id, mask) = hat.split_once('.').ok_or_else(invalid)?;
        return Ok(Source::Hat {
            id: parse_number(value, id)?,
            mask: parse_number(value, mask)?,
        });
    }
    Err(invalid())
}

/// Patterns produced by one `key:value` token
fn bindings_for(key: &str, value: &str) -> Result<Vec<(LogicalEntry, RawPattern)>, InputError> {
    let target = target_for(key).ok_or_else(|| InputError::UnknownKey(key.to_string()))?;
    let source = parse_source(value)?;

    let bindings = match (target, source) {
        (Target::Single(entry), Source::Button(id)) => vec![(entry, RawPattern::button(id))],
        (Target::Single(entry), Source::Hat { id, mask }) => vec![(entry, RawPattern::hat(id, mask))],
        (Target::Single(entry), Source::Axis { id, half, inverted }) => {
            let direction = half.unwrap_or(1) * if inverted { -1 } else { 1 };
            vec![(entry, RawPattern::axis(id, direction))]
        }
        (Target::Stick(negative, positive), Source::Axis { id, half, inverted }) => {
            let (negative, positive) = if inverted {
                (positive, negative)
            } else {
                (negative, positive)
            };
            match half {
                Some(1) => vec![(positive, RawPattern::axis(id, 1))],
                Some(_) => vec![(negative, RawPattern::axis(id, -1))],
                None => vec![
                    (negative, RawPattern::axis(id, -1)),
                    (positive, RawPattern::axis(id, 1)),
                ],
            }
        }
        (Target::Stick(..), _) => return Err(InputError::InvalidToken(format!("{}:{}", key, value))),
    };
    Ok(bindings)
}

impl Device {
    /// Replace the mapping table with one derived from a controller description
    ///
    /// Malformed or unknown tokens are logged and skipped. Returns true if at
    /// least one entry was mapped.
    pub fn load_auto_configuration(&mut self, description: &str) -> bool {
        self.clear_mapping();
        let mut mapped = 0usize;

        for token in description.split(',').map(str::trim) {
            let Some((key, value)) = token.split_once(':') else {
                continue;
            };
            if key == "platform" {
                continue;
            }
            match bindings_for(key, value) {
                Ok(bindings) => {
                    for (entry, pattern) in bindings {
                        self.set_pattern(entry, pattern);
                        mapped += 1;
                    }
                }
                Err(e) => warn!("Skipping controller token '{}' for {}: {}", token, self.name(), e),
            }
        }

        self.promote_stick_to_dpad();
        self.alias_hotkey_to_select();

        debug!("Auto-configured {} ({} bindings): {}", self.name(), mapped, self.configured());
        mapped > 0
    }

    /// Devices without a D-pad navigate with the left stick
    fn promote_stick_to_dpad(&mut self) {
        let has_dpad = LogicalEntry::DPAD.iter().any(|e| self.is_configured(*e));
        let has_stick = LogicalEntry::JOY1.iter().any(|e| self.is_configured(*e));
        if has_dpad || !has_stick {
            return;
        }
        for (dpad, stick) in LogicalEntry::DPAD.into_iter().zip(LogicalEntry::JOY1) {
            if let Some(pattern) = self.pattern(stick).copied() {
                self.set_pattern(dpad, pattern);
            }
            self.clear_pattern(stick);
        }
        debug!("Promoted left stick to D-pad on {}", self.name());
    }

    /// Devices without a guide button use Select as Hotkey
    fn alias_hotkey_to_select(&mut self) {
        if self.is_configured(LogicalEntry::Hotkey) {
            return;
        }
        if let Some(select) = self.pattern(LogicalEntry::Select).copied() {
            self.set_pattern(LogicalEntry::Hotkey, select);
        }
    }
}

/// Controller descriptions keyed by hardware GUID
///
/// Reads `gamecontrollerdb.txt` style files: one `guid,name,bindings...`
/// line per controller, `#` comments.
#[derive(Debug, Clone, Default)]
pub struct ControllerDb {
    entries: HashMap<String, String>,
}

impl ControllerDb {
    /// Load a database file
    ///
    /// # Arguments
    /// * `path` - Path to a `gamecontrollerdb.txt` style file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read controller database: {}", path.display()))?;
        let db = Self::parse(&text);
        info!("🎮 Loaded {} controller descriptions from {}", db.len(), path.display());
        Ok(db)
    }

    /// Parse database text, keeping entries for this platform or no platform
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((guid, _)) = line.split_once(',') else {
                continue;
            };
            let platform = line
                .split(',')
                .filter_map(|t| t.trim().strip_prefix("platform:"))
                .next();
            if platform.is_some_and(|p| p != current_platform()) {
                continue;
            }
            entries.insert(guid.trim().to_ascii_lowercase(), line.to_string());
        }
        Self { entries }
    }

    /// Description for a GUID (case-insensitive)
    pub fn lookup(&self, guid: &str) -> Option<&str> {
        self.entries.get(&guid.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Platform name as written in controller databases
fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Mac OS X",
        "android" => "Android",
        "ios" => "iOS",
        _ => "Linux",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::device::DeviceIdentity;
    use crate::input::raw::{hat, DeviceId, RawKind};

    const X360: &str = "030000005e0400008e02000010010000,X360 Controller,a:b0,b:b1,back:b6,\
        dpdown:h0.4,dpleft:h0.8,dpright:h0.2,dpup:h0.1,guide:b8,leftshoulder:b4,leftstick:b9,\
        lefttrigger:a2,leftx:a0,lefty:a1,rightshoulder:b5,rightstick:b10,righttrigger:a5,\
        rightx:a3,righty:a4,start:b7,x:b2,y:b3,platform:Linux,";

    fn blank() -> Device {
        Device::new(DeviceId::Joystick(0), DeviceIdentity::new("Pad", ""))
    }

    #[test]
    fn test_full_description_maps_every_control() {
        let mut device = blank();
        assert!(device.load_auto_configuration(X360));

        assert_eq!(device.pattern(LogicalEntry::B), Some(&RawPattern::button(0)));
        assert_eq!(device.pattern(LogicalEntry::A), Some(&RawPattern::button(1)));
        assert_eq!(device.pattern(LogicalEntry::Y), Some(&RawPattern::button(2)));
        assert_eq!(device.pattern(LogicalEntry::X), Some(&RawPattern::button(3)));
        assert_eq!(device.pattern(LogicalEntry::Up), Some(&RawPattern::hat(0, hat::UP)));
        assert_eq!(device.pattern(LogicalEntry::Hotkey), Some(&RawPattern::button(8)));
        assert_eq!(device.pattern(LogicalEntry::L2), Some(&RawPattern::axis(2, 1)));
        assert_eq!(device.pattern(LogicalEntry::Joy1Left), Some(&RawPattern::axis(0, -1)));
        assert_eq!(device.pattern(LogicalEntry::Joy2Down), Some(&RawPattern::axis(4, 1)));
        assert!(!device.hotkey_aliases_select());
        assert!(!device.is_configured(LogicalEntry::VolumeUp));
    }

    #[test]
    fn test_stick_only_device_gets_dpad_from_left_stick() {
        let mut device = blank();
        assert!(device.load_auto_configuration("leftx:a0,lefty:a1,a:b0"));

        assert_eq!(device.pattern(LogicalEntry::Left), Some(&RawPattern::axis(0, -1)));
        assert_eq!(device.pattern(LogicalEntry::Right), Some(&RawPattern::axis(0, 1)));
        assert_eq!(device.pattern(LogicalEntry::Up), Some(&RawPattern::axis(1, -1)));
        assert_eq!(device.pattern(LogicalEntry::Down), Some(&RawPattern::axis(1, 1)));
        for stick in LogicalEntry::JOY1 {
            assert!(!device.is_configured(stick));
        }
    }

    #[test]
    fn test_dpad_present_keeps_stick() {
        let mut device = blank();
        device.load_auto_configuration("dpup:b11,leftx:a0");
        assert!(device.is_configured(LogicalEntry::Joy1Left));
        assert!(device.is_configured(LogicalEntry::Up));
    }

    #[test]
    fn test_missing_guide_aliases_hotkey_to_select() {
        let mut device = blank();
        device.load_auto_configuration("back:b2,a:b5");
        assert_eq!(device.pattern(LogicalEntry::Hotkey), Some(&RawPattern::button(2)));
        assert!(device.hotkey_aliases_select());
    }

    #[test]
    fn test_half_axis_and_inversion() {
        let mut device = blank();
        device.load_auto_configuration("dpup:-a1,dpdown:+a1,lefttrigger:a2~,leftx:a0~,righty:+a4");
        assert_eq!(device.pattern(LogicalEntry::Up), Some(&RawPattern::axis(1, -1)));
        assert_eq!(device.pattern(LogicalEntry::Down), Some(&RawPattern::axis(1, 1)));
        assert_eq!(device.pattern(LogicalEntry::L2), Some(&RawPattern::axis(2, -1)));
        assert_eq!(device.pattern(LogicalEntry::Joy1Right), Some(&RawPattern::axis(0, -1)));
        assert_eq!(device.pattern(LogicalEntry::Joy1Left), Some(&RawPattern::axis(0, 1)));
        assert_eq!(device.pattern(LogicalEntry::Joy2Down), Some(&RawPattern::axis(4, 1)));
        assert!(!device.is_configured(LogicalEntry::Joy2Up));
    }

    #[test]
    fn test_bad_tokens_are_skipped() {
        let mut device = blank();
        assert!(device.load_auto_configuration("paddle1:b9,a:bx,start:h0,leftx:b3,back:b6,misc1"));
        assert_eq!(device.configured_count(), 2); // back + hotkey alias
        assert_eq!(device.pattern(LogicalEntry::Select).map(|p| p.kind), Some(RawKind::Button));
    }

    #[test]
    fn test_empty_description_maps_nothing() {
        let mut device = blank();
        device.set_pattern(LogicalEntry::A, RawPattern::button(1));
        assert!(!device.load_auto_configuration("030000,Nameless,platform:Linux"));
        assert!(device.needs_configuration());
    }

    #[test]
    fn test_token_parsing_errors() {
        assert_eq!(
            bindings_for("turbo", "b1"),
            Err(InputError::UnknownKey("turbo".to_string()))
        );
        assert!(matches!(bindings_for("a", "+b1"), Err(InputError::InvalidToken(_))));
        assert!(matches!(bindings_for("a", "h0"), Err(InputError::InvalidToken(_))));
        assert!(matches!(bindings_for("a", "b-2"), Err(InputError::InvalidToken(_))));
    }

    #[test]
    fn test_controller_db_lookup() {
        let text = format!(
            "# comment\n\n{}\n03000000aaaa,Other Pad,a:b1,platform:Windows,\n03000000bbbb,Any Pad,a:b3,\n",
            X360
        );
        let db = ControllerDb::parse(&text);
        assert!(db.lookup("030000005E0400008E02000010010000").is_some());
        assert!(db.lookup("03000000bbbb").is_some());
        if current_platform() != "Windows" {
            assert!(db.lookup("03000000aaaa").is_none());
        }
        assert!(db.lookup("ffff").is_none());
    }

    #[test]
    fn test_controller_db_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamecontrollerdb.txt");
        std::fs::write(&path, "03000000cccc,File Pad,a:b0,\n").unwrap();

        let db = ControllerDb::load(&path).unwrap();
        assert_eq!(db.len(), 1);
        assert!(ControllerDb::load(&dir.path().join("missing.txt")).is_err());
    }
}
