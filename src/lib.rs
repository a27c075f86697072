//! Pose Capture Agent - fixed-rate pose recorder for tracked devices.
//!
//! This library samples spatial-tracking poses from a bounded set of device
//! slots at a controlled rate, classifies each device by role, buffers the
//! samples, and flushes them in batches to per-device CSV files.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Pose Capture Agent                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐       │
//! │  │RateScheduler│──▶│ PoseSampler │──▶│ SampleBuffer │       │
//! │  │  (N Hz tick)│   │  (sweep)    │   │  (by role)   │       │
//! │  └─────────────┘   └─────────────┘   └──────────────┘       │
//! │         │                │                   │ full?        │
//! │         ▼                ▼                   ▼              │
//! │  ┌─────────────┐  ┌───────────────┐  ┌──────────────┐       │
//! │  │TrackingSystem│ │DeviceDirectory│  │   CsvSink    │       │
//! │  │  (SDK seam) │  │  (identity)   │  │(role+serial) │       │
//! │  └─────────────┘  └───────────────┘  └──────────────┘       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tracking runtime is reached only through the [`sdk::TrackingSystem`]
//! trait; [`sdk::SimulatedRig`] is a deterministic in-process backend used by
//! the CLI and the tests.
//!
//! # Example
//!
//! ```no_run
//! use crossbeam_channel::unbounded;
//! use pose_capture_agent::{
//!     Config, RateScheduler, SessionStats, SimulatedRig, SystemClock,
//! };
//!
//! let config = Config::default();
//! config.validate().expect("invalid config");
//!
//! let rig = SimulatedRig::standard();
//! let (_cancel_tx, cancel_rx) = unbounded();
//! let stats = SessionStats::new();
//!
//! let mut scheduler = RateScheduler::new(&rig, SystemClock, &config, cancel_rx)
//!     .expect("could not open output directory");
//! scheduler.run(&stats).expect("capture session failed");
//! ```

pub mod buffer;
pub mod config;
pub mod device;
pub mod sampler;
pub mod scheduler;
pub mod sdk;
pub mod stats;
pub mod writer;

// Re-export key types at crate root for convenience
pub use buffer::{BufferSnapshot, RoleMap, SampleBuffer};
pub use config::{CaptureMode, Config, ConfigError};
pub use device::{classify, DeviceDirectory, DeviceInfo, Role};
pub use sampler::{PoseSample, PoseSampler};
pub use scheduler::{Clock, RateScheduler, SchedulerState, SystemClock, TestClock};
pub use sdk::{DeviceProperty, RawPose, SimDevice, SimulatedRig, TrackingSystem};
pub use stats::{SessionStats, SessionSummary};
pub use writer::{CsvSink, OutputFormat, PersistenceError, CSV_HEADER};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
