// src/dag/ready_queue.rs

//! Priority-ordered queue of tasks whose dependencies are satisfied.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use tracing::trace;

use crate::types::{Priority, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    priority: Priority,
    seq: u64,
    id: TaskId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower sequence (older) first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| Reverse(self.seq).cmp(&Reverse(other.seq)))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ready queue: strict priority, FIFO within a priority tier.
///
/// Removal is lazy. `queued` maps each live id to the sequence number of its
/// current heap entry; heap entries whose sequence no longer matches are
/// stale and skipped by [`ReadyQueue::pop`]. This keeps every id present at
/// most once even when it is removed and pushed again.
///
/// There is no starvation guard: a steady stream of high-priority work keeps
/// lower tiers waiting.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<Entry>,
    queued: HashMap<TaskId, u64>,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.queued.contains_key(&id)
    }

    /// Enqueue a task. Returns `false` (and changes nothing) if it is already
    /// queued.
    pub fn push(&mut self, id: TaskId, priority: Priority) -> bool {
        if self.queued.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queued.insert(id, seq);
        self.heap.push(Entry { priority, seq, id });
        trace!(task = %id, ?priority, seq, "pushed onto ready queue");
        true
    }

    /// Dequeue the highest-priority, oldest task.
    pub fn pop(&mut self) -> Option<TaskId> {
        while let Some(entry) = self.heap.pop() {
            if self.queued.get(&entry.id) == Some(&entry.seq) {
                self.queued.remove(&entry.id);
                return Some(entry.id);
            }
        }
        None
    }

    /// Remove a task if queued. Returns whether it was present.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let removed = self.queued.remove(&id).is_some();
        if removed && self.queued.is_empty() {
            // Everything left in the heap is stale.
            self.heap.clear();
        }
        removed
    }

    /// Remove and return every queued task in dequeue order.
    pub fn drain(&mut self) -> Vec<TaskId> {
        let mut out = Vec::with_capacity(self.queued.len());
        while let Some(id) = self.pop() {
            out.push(id);
        }
        self.heap.clear();
        out
    }
}
