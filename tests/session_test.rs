//! End-to-end capture sessions against the simulated rig.

use crossbeam_channel::unbounded;
use pose_capture_agent::{
    Config, RateScheduler, SessionStats, SimDevice, SimulatedRig, TestClock,
};
use std::path::PathBuf;
use uuid::Uuid;

fn test_output_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pose-capture-session-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_for(dir: &PathBuf) -> Config {
    let mut config = Config::default();
    config.output_dir = dir.clone();
    config
}

#[test]
fn test_fixed_duration_session_produces_complete_files() {
    let dir = test_output_dir();
    let rig = SimulatedRig::new(vec![
        SimDevice::headset("HMD-A"),
        SimDevice::controller("CTL-A"),
        SimDevice::tracker("TRK-A"),
    ]);

    let mut config = config_for(&dir);
    config.frequency_hz = 10.0;
    config.duration_secs = Some(2);
    config.batch_size = Some(5);
    config.validate().unwrap();

    let (_cancel_tx, cancel_rx) = unbounded();
    let stats = SessionStats::new();
    let mut scheduler = RateScheduler::new(&rig, TestClock::new(), &config, cancel_rx).unwrap();
    scheduler.run(&stats).unwrap();

    let summary = stats.snapshot();
    assert_eq!(summary.sweeps, 20);
    assert_eq!(summary.samples, 60);
    assert_eq!(summary.rows_written, 60);

    for name in ["headset_HMD-A", "controller_CTL-A", "tracker_TRK-A"] {
        let content = std::fs::read_to_string(dir.join(format!("{name}.csv"))).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split(',').count(), 16);
        assert!(header.starts_with("Timestamp,DeviceID,DeviceName,DeviceSerial,M00"));
        assert_eq!(lines.count(), 20);
    }

    stats.save(&dir).unwrap();
    let saved = std::fs::read_to_string(dir.join("session_summary.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(parsed["sweeps"], 20);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unsupported_format_aborts_before_any_io() {
    let dir = test_output_dir();
    let mut config = config_for(&dir);
    let nested = dir.join("never-created");
    config.output_dir = nested.clone();

    let err = config.set_format("xlsx").unwrap_err();
    assert!(err.to_string().contains("xlsx"));
    // Rejected at configuration time: the output directory was never touched.
    assert!(!nested.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_cancellation_preserves_buffered_samples() {
    let dir = test_output_dir();
    let rig = SimulatedRig::new(vec![SimDevice::tracker("TRK-B")]);

    let mut config = config_for(&dir);
    config.frequency_hz = 10.0;
    config.batch_size = Some(10);
    config.validate().unwrap();

    let (_cancel_tx, cancel_rx) = unbounded();
    let stats = SessionStats::new();
    let clock = TestClock::new().cancel_after(7);
    let mut scheduler = RateScheduler::new(&rig, clock, &config, cancel_rx).unwrap();
    scheduler.run(&stats).unwrap();

    // Cancelled with 7 buffered against a batch of 10: the terminal drain
    // writes exactly those 7.
    let content = std::fs::read_to_string(dir.join("tracker_TRK-B.csv")).unwrap();
    assert_eq!(content.lines().count(), 8);
    assert_eq!(stats.snapshot().rows_written, 7);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_device_dropout_and_recovery() {
    let dir = test_output_dir();
    let rig = SimulatedRig::new(vec![
        SimDevice::headset("HMD-C"),
        SimDevice::tracker("TRK-C").invalid_for(3),
    ]);

    let mut config = config_for(&dir);
    config.frequency_hz = 10.0;
    config.duration_secs = Some(1);
    config.batch_size = Some(100);
    config.validate().unwrap();

    let (_cancel_tx, cancel_rx) = unbounded();
    let stats = SessionStats::new();
    let mut scheduler = RateScheduler::new(&rig, TestClock::new(), &config, cancel_rx).unwrap();
    scheduler.run(&stats).unwrap();

    // 10 sweeps: headset records all 10, tracker misses the first 3 silently.
    let headset = std::fs::read_to_string(dir.join("headset_HMD-C.csv")).unwrap();
    let tracker = std::fs::read_to_string(dir.join("tracker_TRK-C.csv")).unwrap();
    assert_eq!(headset.lines().count(), 11);
    assert_eq!(tracker.lines().count(), 8);
    assert_eq!(stats.snapshot().invalid_poses, 3);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_blank_serial_devices_get_distinct_files() {
    let dir = test_output_dir();
    let rig = SimulatedRig::new(vec![
        SimDevice::new(pose_capture_agent::sdk::CLASS_GENERIC_TRACKER, "Sim Tracker", ""),
        SimDevice::new(pose_capture_agent::sdk::CLASS_GENERIC_TRACKER, "Sim Tracker", ""),
    ]);

    let mut config = config_for(&dir);
    config.frequency_hz = 10.0;
    config.duration_secs = Some(1);
    config.validate().unwrap();

    let (_cancel_tx, cancel_rx) = unbounded();
    let stats = SessionStats::new();
    let mut scheduler = RateScheduler::new(&rig, TestClock::new(), &config, cancel_rx).unwrap();
    scheduler.run(&stats).unwrap();

    // Identity-less devices fall back to slot-derived serials instead of
    // merging into one file.
    assert!(dir.join("tracker_slot-0.csv").exists());
    assert!(dir.join("tracker_slot-1.csv").exists());
    assert!(stats.snapshot().identity_fallbacks > 0);

    std::fs::remove_dir_all(&dir).unwrap();
}
