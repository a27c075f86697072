//! Simulated tracking backend.
//!
//! This exists so the agent (and its tests) can run anywhere without tracking
//! hardware. Devices are scripted: each has a class, identity strings, a
//! connection state, and an optional number of initial polls for which its
//! pose reports invalid (device warm-up / occlusion).

use crate::sdk::{
    DeviceProperty, PropertyError, RawPose, TrackingSystem, CLASS_CONTROLLER, CLASS_HMD,
    CLASS_GENERIC_TRACKER,
};
use std::cell::Cell;

/// One scripted device occupying a slot of the simulated rig.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub class: u32,
    pub name: String,
    pub serial: String,
    pub connected: bool,
    /// Number of initial pose polls that report invalid before tracking locks.
    pub invalid_polls: u32,
    polls: Cell<u32>,
}

impl SimDevice {
    pub fn new(class: u32, name: &str, serial: &str) -> Self {
        Self {
            class,
            name: name.to_string(),
            serial: serial.to_string(),
            connected: true,
            invalid_polls: 0,
            polls: Cell::new(0),
        }
    }

    pub fn headset(serial: &str) -> Self {
        Self::new(CLASS_HMD, "Sim HMD", serial)
    }

    pub fn controller(serial: &str) -> Self {
        Self::new(CLASS_CONTROLLER, "Sim Controller", serial)
    }

    pub fn tracker(serial: &str) -> Self {
        Self::new(CLASS_GENERIC_TRACKER, "Sim Tracker", serial)
    }

    /// Report an invalid pose for the first `polls` pose queries.
    pub fn invalid_for(mut self, polls: u32) -> Self {
        self.invalid_polls = polls;
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }
}

/// A deterministic in-process tracking runtime.
///
/// Poses advance with every poll so successive sweeps produce distinct
/// transforms: identity rotation, translation `(slot, 0.01 * poll, 0)`.
pub struct SimulatedRig {
    devices: Vec<SimDevice>,
    capacity: u32,
}

impl SimulatedRig {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        let capacity = devices.len() as u32;
        Self { devices, capacity }
    }

    /// A rig with one headset, one controller, and one tracker — the default
    /// CLI setup when no device count is given.
    pub fn standard() -> Self {
        Self::new(vec![
            SimDevice::headset("SIM-HMD-001"),
            SimDevice::controller("SIM-CTL-001"),
            SimDevice::tracker("SIM-TRK-001"),
        ])
    }

    /// A rig of `count` devices: slot 0 is a headset, slot 1 a controller,
    /// remaining slots are trackers.
    pub fn sized(count: u32) -> Self {
        let mut devices = Vec::new();
        for i in 0..count {
            let device = match i {
                0 => SimDevice::headset("SIM-HMD-001"),
                1 => SimDevice::controller("SIM-CTL-001"),
                n => SimDevice::tracker(&format!("SIM-TRK-{n:03}")),
            };
            devices.push(device);
        }
        Self::new(devices)
    }

    /// Extend the slot space beyond the scripted devices with empty slots.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity.max(self.devices.len() as u32);
        self
    }

    fn device(&self, slot: u32) -> Option<&SimDevice> {
        self.devices.get(slot as usize)
    }
}

impl TrackingSystem for SimulatedRig {
    fn device_count(&self) -> u32 {
        self.capacity
    }

    fn is_connected(&self, slot: u32) -> bool {
        self.device(slot).map(|d| d.connected).unwrap_or(false)
    }

    fn pose(&self, slot: u32) -> RawPose {
        let Some(device) = self.device(slot) else {
            return RawPose::invalid();
        };
        if !device.connected {
            return RawPose::invalid();
        }

        let poll = device.polls.get();
        device.polls.set(poll + 1);
        if poll < device.invalid_polls {
            return RawPose::invalid();
        }

        let mut matrix = [0.0f32; 12];
        matrix[0] = 1.0;
        matrix[5] = 1.0;
        matrix[10] = 1.0;
        matrix[3] = slot as f32;
        matrix[7] = 0.01 * poll as f32;
        RawPose::tracked(matrix)
    }

    fn device_class(&self, slot: u32) -> u32 {
        self.device(slot).map(|d| d.class).unwrap_or(0)
    }

    fn string_property(&self, slot: u32, prop: DeviceProperty) -> Result<String, PropertyError> {
        let device = self
            .device(slot)
            .ok_or(PropertyError::InvalidSlot(slot))?;
        let value = match prop {
            DeviceProperty::ModelName => device.name.clone(),
            DeviceProperty::SerialNumber => device.serial.clone(),
        };
        if value.is_empty() {
            return Err(PropertyError::Unavailable);
        }
        Ok(value)
    }
}
