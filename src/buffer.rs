//! Sample buffering between sweeps and flushes.

use crate::device::Role;
use crate::sampler::PoseSample;

/// Fixed-shape per-role storage.
///
/// One field per role instead of a string-keyed map, so adding a role is a
/// compile-time change that the compiler chases through every use site.
#[derive(Debug, Clone, Default)]
pub struct RoleMap<T> {
    pub headset: T,
    pub controller: T,
    pub tracker: T,
    pub unknown: T,
}

impl<T> RoleMap<T> {
    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Headset => &self.headset,
            Role::Controller => &self.controller,
            Role::Tracker => &self.tracker,
            Role::Unknown => &self.unknown,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Headset => &mut self.headset,
            Role::Controller => &mut self.controller,
            Role::Tracker => &mut self.tracker,
            Role::Unknown => &mut self.unknown,
        }
    }

    /// Visit every role's value, in `Role::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> + '_ {
        Role::ALL.iter().map(move |&role| (role, self.get(role)))
    }
}

/// Snapshot of buffered samples handed to the writer on a flush.
pub type BufferSnapshot = RoleMap<Vec<PoseSample>>;

impl BufferSnapshot {
    /// Total samples across all roles.
    pub fn total(&self) -> usize {
        self.iter().map(|(_, samples)| samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Accumulates pose samples by role until a batch is full.
#[derive(Debug)]
pub struct SampleBuffer {
    batch_size: usize,
    pending: BufferSnapshot,
}

impl SampleBuffer {
    /// Create a buffer that fills at `batch_size` samples. Sizes below 1 are
    /// clamped to 1.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pending: BufferSnapshot::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Append a sweep's samples, preserving sample order within each role.
    pub fn absorb(&mut self, samples: Vec<PoseSample>) {
        for sample in samples {
            self.pending.get_mut(sample.role).push(sample);
        }
    }

    /// Whether the total buffered count has reached the batch size.
    pub fn is_full(&self) -> bool {
        self.pending.total() >= self.batch_size
    }

    pub fn len(&self) -> usize {
        self.pending.total()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take the entire buffer content, leaving the buffer empty.
    ///
    /// Draining an empty buffer returns an empty snapshot. Nothing is ever
    /// dropped between an absorb and the next drain.
    pub fn drain(&mut self) -> BufferSnapshot {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(slot: u32, role: Role) -> PoseSample {
        PoseSample {
            timestamp: Utc::now(),
            slot,
            role,
            name: format!("device-{slot}"),
            serial: format!("SER-{slot}"),
            transform: [0.0; 12],
        }
    }

    #[test]
    fn test_absorb_preserves_total_count() {
        let mut buffer = SampleBuffer::new(100);
        buffer.absorb(vec![sample(0, Role::Headset), sample(1, Role::Controller)]);
        buffer.absorb(vec![sample(2, Role::Tracker)]);
        buffer.absorb(vec![]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_full_iff_threshold_reached() {
        let mut buffer = SampleBuffer::new(3);
        buffer.absorb(vec![sample(0, Role::Headset), sample(1, Role::Tracker)]);
        assert!(!buffer.is_full());
        buffer.absorb(vec![sample(2, Role::Tracker)]);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_drain_returns_everything_and_resets() {
        let mut buffer = SampleBuffer::new(10);
        buffer.absorb(vec![
            sample(0, Role::Headset),
            sample(1, Role::Controller),
            sample(2, Role::Tracker),
        ]);

        let snapshot = buffer.drain();
        assert_eq!(snapshot.total(), 3);
        assert_eq!(snapshot.headset.len(), 1);
        assert_eq!(snapshot.controller.len(), 1);
        assert_eq!(snapshot.tracker.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_keeps_sampling_order() {
        let mut buffer = SampleBuffer::new(10);
        for slot in 0..4 {
            buffer.absorb(vec![sample(slot, Role::Tracker)]);
        }
        let snapshot = buffer.drain();
        let slots: Vec<u32> = snapshot.tracker.iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_drain_is_empty_snapshot() {
        let mut buffer = SampleBuffer::new(5);
        let snapshot = buffer.drain();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_batch_size_clamped_to_one() {
        let buffer = SampleBuffer::new(0);
        assert_eq!(buffer.batch_size(), 1);
    }
}
