//! Input normalization core
//!
//! Raw device events are translated into logical entry transitions per
//! device, devices are bound to stable player slots, and mappings are loaded
//! from documents, controller descriptions or the SDL controller database.

pub mod autoconfig;
pub mod compact;
pub mod device;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod gilrs_source;
pub mod hotplug;
pub mod manager;
pub mod mapper;
pub mod mapping_file;
pub mod raw;
pub mod source;
mod translate;

pub use autoconfig::ControllerDb;
pub use compact::CompactEvent;
pub use device::{Battery, Device, DeviceIdentity};
pub use entry::{Entries, LogicalEntry};
pub use error::InputError;
pub use gilrs_source::GilrsSource;
pub use hotplug::DeviceWatcher;
pub use manager::{InputListener, InputManager, InputSettings, MappingOrigin};
pub use mapper::{DeviceMapper, Pad, ReconcileReport, SlotState};
pub use mapping_file::{MappingDocument, MappingLibrary};
pub use raw::{DeviceId, RawEvent, RawKind, RawPattern};
pub use source::{DeviceInfo, DeviceSource, SourceEvent};
