//! Admission queue ordered by priority, then arrival.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::unit::{LaunchTask, UnitId};

/// A launch waiting for a free slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedLaunch {
    /// Unit to launch.
    pub unit_id: UnitId,
    /// Task to run once admitted.
    pub task: LaunchTask,
    /// Priority; lower admits first.
    pub priority: i32,
    /// Arrival sequence number; breaks priority ties.
    pub seq: u64,
}

/// Heap wrapper: lowest priority value first, FIFO within a priority.
#[derive(Debug)]
struct Entry(QueuedLaunch);

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so both keys are reversed.
        other
            .0
            .priority
            .cmp(&self.0.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// Priority-then-FIFO queue of pending launches.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl AdmissionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a launch behind everything of equal or lower priority value.
    pub fn enqueue(&mut self, unit_id: impl Into<UnitId>, task: LaunchTask, priority: i32) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry(QueuedLaunch {
            unit_id: unit_id.into(),
            task,
            priority,
            seq,
        }));
        seq
    }

    /// Put a previously popped launch back, keeping its original arrival slot.
    pub fn requeue(&mut self, launch: QueuedLaunch) {
        self.heap.push(Entry(launch));
    }

    /// Take the next launch.
    pub fn pop(&mut self) -> Option<QueuedLaunch> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// Drop any queued launch for `unit_id`.
    pub fn remove(&mut self, unit_id: &str) -> Option<QueuedLaunch> {
        let mut removed = None;
        self.heap.retain(|entry| {
            if removed.is_none() && entry.0.unit_id == unit_id {
                removed = Some(entry.0.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Zero-based admission position of `unit_id`.
    #[must_use]
    pub fn position(&self, unit_id: &str) -> Option<usize> {
        self.snapshot().iter().position(|l| l.unit_id == unit_id)
    }

    /// Queued launches in admission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedLaunch> {
        let mut entries: Vec<&Entry> = self.heap.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| entry.0.clone()).collect()
    }

    /// Number of queued launches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
