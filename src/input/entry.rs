//! Logical entries and the bit-set protocol built on them
//!
//! A [`LogicalEntry`] is a named control (`A`, `Up`, `L2`, ...) that is
//! independent of physical button/axis numbering. Every entry owns one bit in
//! [`Entries`]; that bit position is fixed for the process lifetime because
//! both persisted mapping documents and hold-time tracking index by it.
//!
//! # Bit layout
//!
//! ```text
//!  63            32 31             0
//! [ hotkey chords  ][ plain entries ]
//! ```
//!
//! While the Hotkey is held, every bit except the D-pad and Hotkey itself is
//! moved into the upper half (see [`Entries::chorded`]).

use bitflags::bitflags;
use std::fmt;

/// Number of logical entries
pub const ENTRY_COUNT: usize = 29;

/// Distance between a plain entry bit and its hotkey-chorded twin
pub const CHORD_SHIFT: u32 = 32;

/// Logical control, in bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogicalEntry {
    Up = 0,
    Down,
    Left,
    Right,
    A,
    B,
    X,
    Y,
    L1,
    R1,
    L2,
    R2,
    L3,
    R3,
    Start,
    Select,
    Hotkey,
    Joy1Up,
    Joy1Down,
    Joy1Left,
    Joy1Right,
    Joy2Up,
    Joy2Down,
    Joy2Left,
    Joy2Right,
    VolumeUp,
    VolumeDown,
    BrightnessUp,
    BrightnessDown,
}

/// Static metadata for one entry
struct EntryInfo {
    name: &'static str,
    opposite: Option<LogicalEntry>,
}

const fn info(name: &'static str, opposite: Option<LogicalEntry>) -> EntryInfo {
    EntryInfo { name, opposite }
}

/// Metadata table, indexed by `LogicalEntry as usize`
const ENTRY_TABLE: [EntryInfo; ENTRY_COUNT] = {
    use LogicalEntry::*;
    [
        info("up", Some(Down)),
        info("down", Some(Up)),
        info("left", Some(Right)),
        info("right", Some(Left)),
        info("a", None),
        info("b", None),
        info("x", None),
        info("y", None),
        info("l1", None),
        info("r1", None),
        info("l2", None),
        info("r2", None),
        info("l3", None),
        info("r3", None),
        info("start", None),
        info("select", None),
        info("hotkey", None),
        info("joystick1up", Some(Joy1Down)),
        info("joystick1down", Some(Joy1Up)),
        info("joystick1left", Some(Joy1Right)),
        info("joystick1right", Some(Joy1Left)),
        info("joystick2up", Some(Joy2Down)),
        info("joystick2down", Some(Joy2Up)),
        info("joystick2left", Some(Joy2Right)),
        info("joystick2right", Some(Joy2Left)),
        info("vol+", None),
        info("vol-", None),
        info("bright+", None),
        info("bright-", None),
    ]
};

/// Names accepted on read for documents written by older releases
const LEGACY_ALIASES: &[(&str, LogicalEntry)] = &[
    ("pageup", LogicalEntry::L1),
    ("pagedown", LogicalEntry::R1),
];

impl LogicalEntry {
    /// All entries in bit order
    pub const ALL: [LogicalEntry; ENTRY_COUNT] = {
        use LogicalEntry::*;
        [
            Up, Down, Left, Right, A, B, X, Y, L1, R1, L2, R2, L3, R3, Start, Select, Hotkey,
            Joy1Up, Joy1Down, Joy1Left, Joy1Right, Joy2Up, Joy2Down, Joy2Left, Joy2Right,
            VolumeUp, VolumeDown, BrightnessUp, BrightnessDown,
        ]
    };

    /// The four D-pad directions
    pub const DPAD: [LogicalEntry; 4] = [
        LogicalEntry::Up,
        LogicalEntry::Down,
        LogicalEntry::Left,
        LogicalEntry::Right,
    ];

    /// Left analog stick directions, in the same order as [`Self::DPAD`]
    pub const JOY1: [LogicalEntry; 4] = [
        LogicalEntry::Joy1Up,
        LogicalEntry::Joy1Down,
        LogicalEntry::Joy1Left,
        LogicalEntry::Joy1Right,
    ];

    /// Bit index of this entry
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-bit set for this entry
    pub fn flag(self) -> Entries {
        Entries::from_bits_retain(1u64 << self.index())
    }

    /// Canonical lowercase name used in mapping documents
    pub fn name(self) -> &'static str {
        ENTRY_TABLE[self.index()].name
    }

    /// Entry driven by the same axis in the other direction, if any
    ///
    /// Entries with an opposite are translated as stick directions; entries
    /// without one are translated as binary (digital) axes.
    pub fn opposite(self) -> Option<LogicalEntry> {
        ENTRY_TABLE[self.index()].opposite
    }

    /// Resolve a canonical or legacy name (case-insensitive)
    pub fn from_name(name: &str) -> Option<LogicalEntry> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name() == name)
            .or_else(|| {
                LEGACY_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, e)| *e)
            })
    }

    pub fn is_dpad(self) -> bool {
        Self::DPAD.contains(&self)
    }
}

impl fmt::Display for LogicalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of logical entries (lower half) and hotkey chords (upper half)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Entries: u64 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const A = 1 << 4;
        const B = 1 << 5;
        const X = 1 << 6;
        const Y = 1 << 7;
        const L1 = 1 << 8;
        const R1 = 1 << 9;
        const L2 = 1 << 10;
        const R2 = 1 << 11;
        const L3 = 1 << 12;
        const R3 = 1 << 13;
        const START = 1 << 14;
        const SELECT = 1 << 15;
        const HOTKEY = 1 << 16;
        const JOY1_UP = 1 << 17;
        const JOY1_DOWN = 1 << 18;
        const JOY1_LEFT = 1 << 19;
        const JOY1_RIGHT = 1 << 20;
        const JOY2_UP = 1 << 21;
        const JOY2_DOWN = 1 << 22;
        const JOY2_LEFT = 1 << 23;
        const JOY2_RIGHT = 1 << 24;
        const VOLUME_UP = 1 << 25;
        const VOLUME_DOWN = 1 << 26;
        const BRIGHTNESS_UP = 1 << 27;
        const BRIGHTNESS_DOWN = 1 << 28;

        /// Bits never moved by a hotkey chord
        const ALWAYS_SPECIAL = Self::UP.bits()
            | Self::DOWN.bits()
            | Self::LEFT.bits()
            | Self::RIGHT.bits()
            | Self::HOTKEY.bits();

        /// Every plain entry bit
        const PLAIN = (1 << ENTRY_COUNT) - 1;
    }
}

impl Entries {
    /// Move every non-special plain bit into the chord range
    pub fn chorded(self) -> Entries {
        let plain = self.bits() & Entries::PLAIN.bits();
        let special = plain & Entries::ALWAYS_SPECIAL.bits();
        let movable = plain & !Entries::ALWAYS_SPECIAL.bits();
        Entries::from_bits_retain(special | (movable << CHORD_SHIFT) | self.chord_bits())
    }

    /// Bit reported for `entry` pressed while the Hotkey is held
    pub fn chord(entry: LogicalEntry) -> Entries {
        entry.flag().chorded()
    }

    /// True if `entry` appears in this set as a hotkey chord
    pub fn contains_chord(self, entry: LogicalEntry) -> bool {
        let chord = Entries::chord(entry);
        chord != entry.flag() && self.contains(chord)
    }

    /// Plain entries in this set, in bit order
    pub fn entries(self) -> impl Iterator<Item = LogicalEntry> {
        LogicalEntry::ALL
            .into_iter()
            .filter(move |e| self.contains(e.flag()))
    }

    /// Entries present in the chord range, in bit order
    pub fn chords(self) -> impl Iterator<Item = LogicalEntry> {
        LogicalEntry::ALL
            .into_iter()
            .filter(move |e| self.contains_chord(*e))
    }

    fn chord_bits(self) -> u64 {
        self.bits() & !Entries::PLAIN.bits()
    }
}

impl fmt::Display for Entries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in self.entries() {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{}", entry)?;
            first = false;
        }
        for entry in self.chords() {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "hotkey+{}", entry)?;
            first = false;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_flags_follow_enum_order() {
        assert_eq!(LogicalEntry::Up.flag(), Entries::UP);
        assert_eq!(LogicalEntry::Hotkey.flag(), Entries::HOTKEY);
        assert_eq!(LogicalEntry::Joy2Right.flag(), Entries::JOY2_RIGHT);
        assert_eq!(LogicalEntry::BrightnessDown.flag(), Entries::BRIGHTNESS_DOWN);
        for (i, entry) in LogicalEntry::ALL.iter().enumerate() {
            assert_eq!(entry.index(), i);
        }
    }

    #[test]
    fn test_names_round_trip_and_legacy_aliases() {
        for entry in LogicalEntry::ALL {
            assert_eq!(LogicalEntry::from_name(entry.name()), Some(entry));
        }
        assert_eq!(LogicalEntry::from_name("PageUp"), Some(LogicalEntry::L1));
        assert_eq!(LogicalEntry::from_name("pagedown"), Some(LogicalEntry::R1));
        assert_eq!(LogicalEntry::from_name("turbo"), None);
    }

    #[test]
    fn test_opposites_are_symmetric() {
        for entry in LogicalEntry::ALL {
            if let Some(opposite) = entry.opposite() {
                assert_eq!(opposite.opposite(), Some(entry));
            }
        }
        assert_eq!(LogicalEntry::L2.opposite(), None);
    }

    #[test]
    fn test_chorded_keeps_special_bits() {
        let set = Entries::UP | Entries::HOTKEY | Entries::B;
        let chorded = set.chorded();
        assert!(chorded.contains(Entries::UP));
        assert!(chorded.contains(Entries::HOTKEY));
        assert!(!chorded.contains(Entries::B));
        assert!(chorded.contains_chord(LogicalEntry::B));
        assert_eq!(chorded.chords().collect::<Vec<_>>(), vec![LogicalEntry::B]);
    }

    #[test]
    fn test_chorded_is_idempotent() {
        let set = Entries::A | Entries::START | Entries::LEFT;
        assert_eq!(set.chorded(), set.chorded().chorded());
    }

    #[test]
    fn test_display() {
        let set = Entries::A | Entries::chord(LogicalEntry::B);
        assert_eq!(set.to_string(), "a|hotkey+b");
        assert_eq!(Entries::empty().to_string(), "-");
    }
}
