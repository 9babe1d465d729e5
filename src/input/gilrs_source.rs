//! gilrs-backed platform source
//!
//! gilrs already normalizes every controller to a standard layout, so each
//! gamepad gets the same synthesized controller description. Stable button
//! and axis numbers are assigned here:
//!
//! ```text
//! buttons  1 South   2 East    3 C       4 North   5 West    6 Z
//!          7 LB      8 LT      9 RB     10 RT     11 Select 12 Start
//!         13 Mode   14 LThumb 15 RThumb 16 Up     17 Down   18 Left  19 Right
//! axes     1 LX      2 LY      3 LZ      4 RX      5 RY      6 RZ
//!          7 DPadX   8 DPadY
//! ```
//!
//! Y axes are flipped so that up is negative, as in SDL descriptions.

use anyhow::{anyhow, Result};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, PowerInfo};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::device::{Battery, DeviceIdentity};
use super::raw::{DeviceId, RawEvent, RawKind};
use super::source::{DeviceInfo, DeviceSource, SourceEvent};

/// Bindings of the standard layout, SDL syntax
const STANDARD_BINDINGS: &str = "a:b1,b:b2,x:b5,y:b4,back:b11,start:b12,guide:b13,\
    leftshoulder:b7,rightshoulder:b9,lefttrigger:b8,righttrigger:b10,\
    leftstick:b14,rightstick:b15,dpup:b16,dpdown:b17,dpleft:b18,dpright:b19,\
    leftx:a1,lefty:a2,rightx:a4,righty:a5";

const BUTTON_COUNT: usize = 20;
const AXIS_COUNT: usize = 9;

/// How often battery levels are re-read
const BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(30);

const AXES: [Axis; 8] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
    Axis::DPadX,
    Axis::DPadY,
];

/// Standard-layout button number, `None` for unknown buttons
pub fn button_id(button: Button) -> Option<i32> {
    let id = match button {
        Button::South => 1,
        Button::East => 2,
        Button::C => 3,
        Button::North => 4,
        Button::West => 5,
        Button::Z => 6,
        Button::LeftTrigger => 7,
        Button::LeftTrigger2 => 8,
        Button::RightTrigger => 9,
        Button::RightTrigger2 => 10,
        Button::Select => 11,
        Button::Start => 12,
        Button::Mode => 13,
        Button::LeftThumb => 14,
        Button::RightThumb => 15,
        Button::DPadUp => 16,
        Button::DPadDown => 17,
        Button::DPadLeft => 18,
        Button::DPadRight => 19,
        _ => return None,
    };
    Some(id)
}

/// Standard-layout axis number, `None` for unknown axes
pub fn axis_id(axis: Axis) -> Option<i32> {
    let id = match axis {
        Axis::LeftStickX => 1,
        Axis::LeftStickY => 2,
        Axis::LeftZ => 3,
        Axis::RightStickX => 4,
        Axis::RightStickY => 5,
        Axis::RightZ => 6,
        Axis::DPadX => 7,
        Axis::DPadY => 8,
        _ => return None,
    };
    Some(id)
}

/// gilrs axis value (-1.0..1.0, up positive) to raw range (up negative)
pub fn axis_value(axis: Axis, value: f32) -> i32 {
    let scaled = (value.clamp(-1.0, 1.0) * 32767.0).round() as i32;
    match axis {
        Axis::LeftStickY | Axis::RightStickY | Axis::DPadY => -scaled,
        _ => scaled,
    }
}

/// Hex GUID from a gilrs UUID, empty when the platform has none
pub fn guid_from_uuid(uuid: [u8; 16]) -> String {
    if uuid.iter().all(|b| *b == 0) {
        return String::new();
    }
    uuid.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Controller description for a gilrs gamepad
pub fn standard_description(guid: &str, name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c == ',' || c == ':' { ' ' } else { c })
        .collect();
    format!("{},{},{}", guid, name, STANDARD_BINDINGS)
}

pub fn battery_from_power(power: PowerInfo) -> Battery {
    match power {
        PowerInfo::Unknown => Battery::Unknown,
        PowerInfo::Wired => Battery::Wired,
        PowerInfo::Discharging(level) => Battery::Discharging(level),
        PowerInfo::Charging(level) => Battery::Charging(level),
        PowerInfo::Charged => Battery::Charged,
    }
}

fn index_of(id: GamepadId) -> u32 {
    u32::try_from(usize::from(id)).unwrap_or(u32::MAX)
}

/// Platform source reading every controller through gilrs
pub struct GilrsSource {
    gilrs: Gilrs,
    pending: VecDeque<SourceEvent>,
    batteries: HashMap<u32, Battery>,
    last_battery_check: Instant,
}

impl GilrsSource {
    /// Initialize gilrs
    ///
    /// Must be called on the thread that will poll the source.
    pub fn new() -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| anyhow!("Failed to initialize gilrs: {:?}", e))?;
        info!("✅ gilrs initialized");
        Ok(Self {
            gilrs,
            pending: VecDeque::new(),
            batteries: HashMap::new(),
            last_battery_check: Instant::now(),
        })
    }

    fn describe(id: GamepadId, gamepad: &Gamepad<'_>) -> DeviceInfo {
        let name = gamepad.name().to_string();
        let guid = guid_from_uuid(gamepad.uuid());
        let index = index_of(id);

        let mut axis_rest = vec![0; AXIS_COUNT];
        for axis in AXES {
            if let Some(slot) = axis_id(axis).and_then(|a| usize::try_from(a).ok()) {
                axis_rest[slot] = axis_value(axis, gamepad.value(axis));
            }
        }

        let mut info = DeviceInfo::new(index, DeviceIdentity::new(name.clone(), guid.clone()));
        info.axis_count = AXIS_COUNT;
        info.button_count = BUTTON_COUNT;
        info.axis_rest = axis_rest;
        info.battery = battery_from_power(gamepad.power_info());
        info.description = Some(standard_description(&guid, &name));
        info
    }

    fn convert(index: u32, event: EventType) -> Option<SourceEvent> {
        let device = DeviceId::Joystick(index);
        let raw = match event {
            EventType::ButtonPressed(button, code) | EventType::ButtonReleased(button, code) => {
                let pressed = matches!(event, EventType::ButtonPressed(..));
                let code = i32::try_from(code.into_u32()).unwrap_or(0);
                match button_id(button) {
                    Some(id) => RawEvent::button(device, id, pressed).with_code(code),
                    None => RawEvent::new(device, RawKind::Unknown, code, pressed as i32).with_code(code),
                }
            }
            EventType::AxisChanged(axis, value, code) => {
                let code = i32::try_from(code.into_u32()).unwrap_or(0);
                match axis_id(axis) {
                    Some(id) => RawEvent::axis(device, id, axis_value(axis, value)).with_code(code),
                    None => RawEvent::new(device, RawKind::Unknown, code, 0).with_code(code),
                }
            }
            EventType::Connected | EventType::Disconnected => return Some(SourceEvent::DevicesChanged),
            // Repeats carry no new edge; analog trigger levels also arrive as press/release
            _ => return None,
        };
        Some(SourceEvent::Raw(raw))
    }

    fn check_batteries(&mut self) {
        self.last_battery_check = Instant::now();
        for (id, gamepad) in self.gilrs.gamepads().filter(|(_, gp)| gp.is_connected()) {
            let index = index_of(id);
            let battery = battery_from_power(gamepad.power_info());
            if self.batteries.insert(index, battery) != Some(battery) {
                debug!("Battery of {} ({}): {:?}", gamepad.name(), index, battery);
                self.pending.push_back(SourceEvent::Battery { index, battery });
            }
        }
    }
}

impl DeviceSource for GilrsSource {
    fn enumerate(&mut self) -> Vec<DeviceInfo> {
        let devices: Vec<DeviceInfo> = self
            .gilrs
            .gamepads()
            .filter(|(_, gp)| gp.is_connected())
            .map(|(id, gp)| Self::describe(id, &gp))
            .collect();

        if devices.is_empty() {
            warn!("⚠️  No gamepads detected");
        }
        self.batteries = devices.iter().map(|d| (d.index, d.battery)).collect();
        devices
    }

    fn poll(&mut self) -> Option<SourceEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(converted) = Self::convert(index_of(id), event) {
                return Some(converted);
            }
        }
        if self.last_battery_check.elapsed() >= BATTERY_POLL_INTERVAL {
            self.check_batteries();
            return self.pending.pop_front();
        }
        None
    }
}
