//! Device roles and identity resolution.
//!
//! Devices are bucketed into a closed set of roles; downstream buffering and
//! file naming key off the role rather than raw SDK class ids.

use crate::sdk::{
    DeviceProperty, TrackingSystem, CLASS_CONTROLLER, CLASS_GENERIC_TRACKER, CLASS_HMD,
    CLASS_TRACKING_REFERENCE,
};
use serde::{Deserialize, Serialize};

/// Classification bucket for a tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Headset,
    Controller,
    Tracker,
    Unknown,
}

impl Role {
    /// Every role, in a fixed order. Used for exhaustive per-role iteration.
    pub const ALL: [Role; 4] = [Role::Headset, Role::Controller, Role::Tracker, Role::Unknown];

    /// Lowercase label used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Headset => "headset",
            Role::Controller => "controller",
            Role::Tracker => "tracker",
            Role::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a raw SDK device-class id to a role.
///
/// Total: anything unrecognized is `Unknown`. Tracking references (base
/// stations) are bucketed with generic trackers.
pub fn classify(raw_class: u32) -> Role {
    match raw_class {
        CLASS_HMD => Role::Headset,
        CLASS_CONTROLLER => Role::Controller,
        CLASS_GENERIC_TRACKER | CLASS_TRACKING_REFERENCE => Role::Tracker,
        _ => Role::Unknown,
    }
}

/// Resolved identity of a device slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub slot: u32,
    pub role: Role,
    pub name: String,
    pub serial: String,
}

/// Identity lookups over a tracking runtime.
///
/// Lookups never fail the sweep: a missing or empty name/serial degrades to a
/// slot-derived placeholder. The serial fallback (`slot-N`) doubles as the
/// collision guard for identity-less devices — slots are unique within a
/// session, so two blank-serial devices can never share an output file.
pub struct DeviceDirectory<'a, T: TrackingSystem> {
    system: &'a T,
}

impl<'a, T: TrackingSystem> DeviceDirectory<'a, T> {
    pub fn new(system: &'a T) -> Self {
        Self { system }
    }

    /// Resolve name, serial, and role for a slot.
    ///
    /// Returns the info and whether any identity field fell back to a
    /// placeholder.
    pub fn describe(&self, slot: u32) -> (DeviceInfo, bool) {
        let mut degraded = false;

        let name = match self.lookup(slot, DeviceProperty::ModelName) {
            Some(name) => name,
            None => {
                degraded = true;
                format!("device-{slot}")
            }
        };
        let serial = match self.lookup(slot, DeviceProperty::SerialNumber) {
            Some(serial) => serial,
            None => {
                degraded = true;
                format!("slot-{slot}")
            }
        };

        let info = DeviceInfo {
            slot,
            role: classify(self.system.device_class(slot)),
            name,
            serial,
        };
        (info, degraded)
    }

    /// A property lookup that treats errors and empty strings alike.
    fn lookup(&self, slot: u32, prop: DeviceProperty) -> Option<String> {
        match self.system.string_property(slot, prop) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}
