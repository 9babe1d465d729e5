//! Platform device-enumeration and event-source seam
//!
//! The input manager never talks to the OS directly: it asks a
//! [`DeviceSource`] for the current device list and for pending events.
//! [`super::gilrs_source::GilrsSource`] is the production implementation.

use super::device::{Battery, DeviceIdentity};
use super::raw::RawEvent;

/// One device as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Live platform index
    pub index: u32,
    pub identity: DeviceIdentity,
    pub axis_count: usize,
    pub hat_count: usize,
    pub button_count: usize,
    /// Reading of every axis at enumeration time
    pub axis_rest: Vec<i32>,
    /// False for accelerometers and other non-game devices
    pub is_pad: bool,
    pub battery: Battery,
    /// Generic controller description (SDL mapping string), if the platform has one
    pub description: Option<String>,
}

impl DeviceInfo {
    pub fn new(index: u32, identity: DeviceIdentity) -> Self {
        Self {
            index,
            identity,
            axis_count: 0,
            hat_count: 0,
            button_count: 0,
            axis_rest: Vec::new(),
            is_pad: true,
            battery: Battery::Unknown,
            description: None,
        }
    }
}

/// Something the platform reported since the last poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Raw(RawEvent),
    /// A device appeared or vanished; the device table must be rebuilt
    DevicesChanged,
    /// Battery level update for a connected device
    Battery { index: u32, battery: Battery },
}

/// Platform input facility
pub trait DeviceSource {
    /// Currently available devices, in enumeration order
    fn enumerate(&mut self) -> Vec<DeviceInfo>;

    /// Next pending event, `None` when drained (never blocks)
    fn poll(&mut self) -> Option<SourceEvent>;
}
