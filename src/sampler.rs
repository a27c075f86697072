//! Pose sampling sweeps.
//!
//! A sweep is one bounded pass over the runtime's slot space. Disconnected
//! slots and invalid poses are skipped silently — transient invalidity is the
//! normal case for partially tracked sessions, not an error.

use crate::device::{DeviceDirectory, Role};
use crate::sdk::TrackingSystem;
use crate::stats::SessionStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped pose record for one device.
///
/// `transform` is the device-to-origin transform, 12 scalars row-major
/// (3 rows of rotation plus translation). Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSample {
    pub timestamp: DateTime<Utc>,
    pub slot: u32,
    pub role: Role,
    pub name: String,
    pub serial: String,
    pub transform: [f32; 12],
}

/// Produces one sweep of pose samples per call.
pub struct PoseSampler<'a, T: TrackingSystem> {
    system: &'a T,
    directory: DeviceDirectory<'a, T>,
}

impl<'a, T: TrackingSystem> PoseSampler<'a, T> {
    pub fn new(system: &'a T) -> Self {
        Self {
            system,
            directory: DeviceDirectory::new(system),
        }
    }

    /// Sweep every slot once, in ascending order.
    ///
    /// All samples of a sweep share a single timestamp captured at sweep
    /// start, so devices within one sweep stay comparable. Identity is
    /// re-resolved every sweep; connection state can change between ticks.
    pub fn sweep(&self, stats: &SessionStats) -> Vec<PoseSample> {
        let timestamp = Utc::now();
        let mut samples = Vec::new();

        for slot in 0..self.system.device_count() {
            if !self.system.is_connected(slot) {
                continue;
            }

            let pose = self.system.pose(slot);
            if !pose.valid {
                stats.record_invalid_pose();
                continue;
            }

            let (info, degraded) = self.directory.describe(slot);
            if degraded {
                stats.record_identity_fallback();
            }

            samples.push(PoseSample {
                timestamp,
                slot,
                role: info.role,
                name: info.name,
                serial: info.serial,
                transform: pose.matrix,
            });
        }

        stats.record_sweep(samples.len() as u64);
        samples
    }
}
