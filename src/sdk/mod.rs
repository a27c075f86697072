//! Tracking-SDK seam for the pose capture agent.
//!
//! The agent never talks to tracking hardware directly. Everything it needs
//! from a runtime is captured by the [`TrackingSystem`] trait: a bounded slot
//! space, per-slot connection/pose queries, and per-slot identity lookups.
//! Hardware backends implement this trait outside the crate; [`sim`] provides
//! a deterministic in-process backend used by the CLI and the tests.

pub mod sim;

pub use sim::{SimDevice, SimulatedRig};

/// Raw device-class ids, following OpenVR numbering.
pub const CLASS_HMD: u32 = 1;
pub const CLASS_CONTROLLER: u32 = 2;
pub const CLASS_GENERIC_TRACKER: u32 = 3;
pub const CLASS_TRACKING_REFERENCE: u32 = 4;

/// String properties the agent reads from a device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProperty {
    /// Human-readable model name.
    ModelName,
    /// Factory serial number.
    SerialNumber,
}

/// A pose as reported by the tracking runtime for one slot.
///
/// `matrix` is the device-to-origin transform as 12 scalars, row-major
/// (3 rows of rotation plus translation). When `valid` is false the matrix
/// contents are unspecified and must not be used.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPose {
    pub valid: bool,
    pub matrix: [f32; 12],
}

impl RawPose {
    /// A pose the runtime could not resolve this tick.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn tracked(matrix: [f32; 12]) -> Self {
        Self {
            valid: true,
            matrix,
        }
    }
}

/// Errors from identity-property lookups.
#[derive(Debug)]
pub enum PropertyError {
    /// The slot exists but the runtime has no value for this property.
    Unavailable,
    /// The slot index is outside the runtime's slot space.
    InvalidSlot(u32),
}

impl std::fmt::Display for PropertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyError::Unavailable => write!(f, "property unavailable"),
            PropertyError::InvalidSlot(slot) => write!(f, "invalid device slot {slot}"),
        }
    }
}

impl std::error::Error for PropertyError {}

/// Minimal surface the agent requires from a tracking runtime.
///
/// Queries are expected from a single thread at a time; most tracking SDKs
/// are not safe for concurrent property access.
pub trait TrackingSystem {
    /// Fixed upper bound on device slots. Slot indices are `0..device_count()`.
    fn device_count(&self) -> u32;

    /// Whether a device currently occupies the slot.
    fn is_connected(&self, slot: u32) -> bool;

    /// The slot's pose this instant. Transient invalidity is normal.
    fn pose(&self, slot: u32) -> RawPose;

    /// Raw device-class id for the slot (see the `CLASS_*` constants).
    fn device_class(&self, slot: u32) -> u32;

    /// Read a string identity property for the slot.
    fn string_property(&self, slot: u32, prop: DeviceProperty) -> Result<String, PropertyError>;
}
