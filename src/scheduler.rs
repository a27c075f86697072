//! Fixed-rate capture loop.
//!
//! The scheduler drives one session: sweep, buffer, flush when full, sleep
//! the residual tick interval. Everything runs on one thread; the only
//! suspension point is the inter-tick pause, which doubles as the cooperative
//! cancellation check. Pacing is residual-interval: each tick sleeps
//! `period - processing_time`, so the average rate tracks the configured
//! frequency while individual ticks may run long. Missed ticks are not made
//! up.

use crate::buffer::SampleBuffer;
use crate::config::{CaptureMode, Config};
use crate::sampler::PoseSampler;
use crate::sdk::TrackingSystem;
use crate::stats::SessionStats;
use crate::writer::{CsvSink, OutputFormat, PersistenceError};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source for the capture loop.
///
/// `pause` is the cancellable inter-tick sleep: it returns true if a
/// cancellation request arrived during (or before) the pause. Injecting a
/// clock keeps the scheduler deterministic under test.
pub trait Clock {
    fn now(&self) -> Instant;
    fn pause(&self, duration: Duration, cancel: &Receiver<()>) -> bool;
}

/// Wall-clock time; pauses via `recv_timeout` on the cancellation channel so
/// a ctrl-c wakes the loop immediately instead of after the tick.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn pause(&self, duration: Duration, cancel: &Receiver<()>) -> bool {
        if duration.is_zero() {
            return cancel.try_recv().is_ok();
        }
        match cancel.recv_timeout(duration) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            // A vanished sender could never cancel us later; stop rather
            // than run an unstoppable session.
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// Virtual time for tests: `pause` advances instantly and can report
/// cancellation after a scripted number of pauses.
#[derive(Debug)]
pub struct TestClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    pauses: Cell<u64>,
    cancel_after_pauses: Option<u64>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            pauses: Cell::new(0),
            cancel_after_pauses: None,
        }
    }

    /// Report cancellation once `count` pauses have completed.
    pub fn cancel_after(mut self, count: u64) -> Self {
        self.cancel_after_pauses = Some(count);
        self
    }

    pub fn pauses(&self) -> u64 {
        self.pauses.get()
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn pause(&self, duration: Duration, cancel: &Receiver<()>) -> bool {
        self.elapsed.set(self.elapsed.get() + duration);
        let pauses = self.pauses.get() + 1;
        self.pauses.set(pauses);
        if let Some(limit) = self.cancel_after_pauses {
            if pauses >= limit {
                return true;
            }
        }
        cancel.try_recv().is_ok()
    }
}

/// Where the capture loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timers active, no device polling.
    Idle,
    /// Ticking: sweep and absorb.
    Running,
    /// Draining a full buffer to the sink.
    Flushing,
    /// Final drain on the way out of the loop.
    Draining,
}

/// Drives the sample → buffer → flush cycle at a configured frequency.
///
/// Owns the session state end to end: the buffer, the output sink, and the
/// cancellation receiver. Nothing about a session lives at process scope.
pub struct RateScheduler<'a, T: TrackingSystem, C: Clock> {
    sampler: PoseSampler<'a, T>,
    buffer: SampleBuffer,
    sink: CsvSink,
    clock: C,
    period: Duration,
    mode: CaptureMode,
    cancel: Receiver<()>,
    state: SchedulerState,
}

impl<'a, T: TrackingSystem, C: Clock> RateScheduler<'a, T, C> {
    /// Build a scheduler for one session.
    ///
    /// The config must already be validated; the output directory is created
    /// here and nothing else touches the filesystem before `run`.
    pub fn new(
        system: &'a T,
        clock: C,
        config: &Config,
        cancel: Receiver<()>,
    ) -> Result<Self, PersistenceError> {
        let sink = match config.format {
            OutputFormat::Csv => CsvSink::new(&config.output_dir)?,
        };
        Ok(Self {
            sampler: PoseSampler::new(system),
            buffer: SampleBuffer::new(config.effective_batch_size()),
            sink,
            clock,
            period: config.period(),
            mode: config.mode(),
            cancel,
            state: SchedulerState::Idle,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run the session to completion.
    ///
    /// Fixed-duration mode returns once the configured duration has elapsed;
    /// indefinite mode returns on cancellation. Every exit path, including a
    /// persistence failure mid-run, performs the terminal drain so buffered
    /// samples are not lost.
    pub fn run(&mut self, stats: &SessionStats) -> Result<(), PersistenceError> {
        self.state = SchedulerState::Running;
        let session_start = self.clock.now();
        let mut run_error: Option<PersistenceError> = None;

        loop {
            if let CaptureMode::FixedDuration(limit) = self.mode {
                if self.clock.now().duration_since(session_start) >= limit {
                    break;
                }
            }

            let tick_start = self.clock.now();

            let samples = self.sampler.sweep(stats);
            self.buffer.absorb(samples);

            if self.buffer.is_full() {
                self.state = SchedulerState::Flushing;
                stats.record_flush();
                let batch = self.buffer.drain();
                if let Err(e) = self.sink.persist(batch, stats) {
                    run_error = Some(e);
                    break;
                }
                self.state = SchedulerState::Running;
            }

            let elapsed = self.clock.now().duration_since(tick_start);
            let residual = self.period.saturating_sub(elapsed);
            if self.clock.pause(residual, &self.cancel) {
                break;
            }
        }

        self.state = SchedulerState::Draining;
        let residual = self.buffer.drain();
        if !residual.is_empty() {
            stats.record_flush();
            if let Err(e) = self.sink.persist(residual, stats) {
                run_error.get_or_insert(e);
            }
        }
        self.state = SchedulerState::Idle;

        match run_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of output files the sink has opened so far.
    pub fn file_count(&self) -> usize {
        self.sink.file_count()
    }
}
