//! Device and slot diagnostics for troubleshooting detection issues

use tracing::info;

use super::device::{Battery, Device};
use super::manager::InputManager;
use super::mapper::{Pad, SlotState};

fn battery_label(battery: Battery) -> String {
    match battery {
        Battery::Unknown => "unknown".to_string(),
        Battery::Wired => "wired".to_string(),
        Battery::Discharging(level) => format!("{}%", level),
        Battery::Charging(level) => format!("{}% (charging)", level),
        Battery::Charged => "charged".to_string(),
    }
}

/// One-line summary of a player slot
pub fn describe_pad(pad: &Pad) -> String {
    let player = pad.position() + 1;
    match (pad.state(), pad.identity()) {
        (SlotState::Empty, _) | (_, None) => format!("P{}: (empty)", player),
        (SlotState::Disconnected, Some(identity)) => {
            format!("P{}: \"{}\" [{}] disconnected", player, identity.name, identity.guid)
        }
        (SlotState::Connected, Some(identity)) => format!(
            "P{}: \"{}\" [{}] on #{}",
            player,
            identity.name,
            identity.guid,
            pad.index().map(|i| i.to_string()).unwrap_or_default()
        ),
    }
}

/// Multi-line description of a device and its mapping
pub fn describe_device(device: &Device) -> Vec<String> {
    let mut lines = vec![format!("{} \"{}\"", device.id(), device.name())];
    if !device.guid().is_empty() {
        lines.push(format!("   GUID: {}", device.guid()));
    }
    if device.is_true_pad() {
        lines.push(format!(
            "   Controls: {} axes, {} hats, {} buttons",
            device.axis_count(),
            device.hat_count(),
            device.button_count()
        ));
        lines.push(format!("   Battery: {}", battery_label(device.battery())));
    }
    if device.needs_configuration() {
        lines.push("   ⚠️  Not configured".to_string());
    } else {
        lines.push(format!("   Mapping ({} entries):", device.configured_count()));
        for (entry, pattern) in device.patterns() {
            lines.push(format!("      {:<16} {}", entry.name(), pattern));
        }
    }
    lines
}

/// Print slot assignments and every device of the table
pub fn print_device_table(manager: &InputManager) {
    info!("=== Input Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!("");
    info!(
        "🎮 Player slots ({} connected / {}):",
        manager.mapper().connected_count(),
        manager.mapper().capacity()
    );
    for pad in manager.mapper().pads() {
        info!("   {}", describe_pad(pad));
    }

    info!("");
    let devices: Vec<&Device> = manager.devices().collect();
    if devices.is_empty() {
        info!("⚠️  No input devices detected");
        return;
    }
    info!("📋 Devices ({}):", devices.len());
    for device in devices {
        info!("   origin: {:?}", manager.mapping_origin(device.id()));
        for line in describe_device(device) {
            info!("   {}", line);
        }
    }
}
