//! # Tier Queues
//!
//! The three priority tiers and the fixed-capacity ordered container that
//! backs each of them.
//!
//! Each tier holds ready-but-not-running tasks in FIFO arrival order:
//! insertion is always at the tail, and the selection algorithms may remove
//! from any position but never reorder the survivors. The container stores
//! arena indices ([`TaskId`]) rather than task records, so the aging
//! engine can scan a snapshot of one tier while appending migrants to
//! another without invalidating anything.
//!
//! [`TaskId`]: crate::task::TaskId

use crate::config::{MAX_TASKS, TIER1_MIN_PRIORITY, TIER2_MIN_PRIORITY};
use crate::task::TaskId;

// ---------------------------------------------------------------------------
// Tier model
// ---------------------------------------------------------------------------

/// One of the three fixed priority bands, each with its own queue and
/// selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Priority 100..=149 — shortest-predicted-burst-first.
    L1,
    /// Priority 50..=99 — highest static priority, non-preemptive among
    /// peers.
    L2,
    /// Priority 0..=49 — plain FIFO, time-sliced every tick.
    L3,
}

impl Tier {
    /// Classify a priority into its tier band.
    pub fn for_priority(priority: u32) -> Tier {
        if priority >= TIER1_MIN_PRIORITY {
            Tier::L1
        } else if priority >= TIER2_MIN_PRIORITY {
            Tier::L2
        } else {
            Tier::L3
        }
    }

    /// Index into the scheduler's `[TierQueue; 3]`, L1 first.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Tier::L1 => 0,
            Tier::L2 => 1,
            Tier::L3 => 2,
        }
    }

    /// Tier number for trace output (L1 → 1, L3 → 3).
    #[inline]
    pub const fn number(self) -> u32 {
        self.index() as u32 + 1
    }

    /// The tier one band up, if any. Aging migration moves one step at a
    /// time: L3 → L2 on one pass, L2 → L1 on a later one.
    pub const fn promoted(self) -> Option<Tier> {
        match self {
            Tier::L1 => None,
            Tier::L2 => Some(Tier::L1),
            Tier::L3 => Some(Tier::L2),
        }
    }

    /// Priority a queued task must reach to migrate out of this tier.
    pub const fn promotion_threshold(self) -> Option<u32> {
        match self {
            Tier::L1 => None,
            Tier::L2 => Some(TIER1_MIN_PRIORITY),
            Tier::L3 => Some(TIER2_MIN_PRIORITY),
        }
    }
}

// ---------------------------------------------------------------------------
// Tier container
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO of task ids backing one tier.
///
/// Capacity is `MAX_TASKS`: a task is in at most one queue, so a single
/// tier can never hold more tasks than the arena does. Membership is
/// unique — inserting an id that is already present is a fatal invariant
/// violation.
pub struct TierQueue {
    slots: [TaskId; MAX_TASKS],
    len: usize,
}

impl TierQueue {
    pub const fn new() -> Self {
        Self {
            slots: [0; MAX_TASKS],
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Queued ids in arrival order, head first.
    #[inline]
    pub fn as_slice(&self) -> &[TaskId] {
        &self.slots[..self.len]
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.as_slice().contains(&id)
    }

    /// Append `id` at the tail.
    ///
    /// # Panics
    /// If `id` is already queued here, or the queue is somehow full —
    /// both indicate corrupted queue-membership bookkeeping upstream.
    pub fn push_back(&mut self, id: TaskId) {
        assert!(!self.contains(id), "task {} already queued in this tier", id);
        assert!(self.len < MAX_TASKS, "tier queue overflow");
        self.slots[self.len] = id;
        self.len += 1;
    }

    /// Remove and return the head, or `None` if empty.
    pub fn pop_front(&mut self) -> Option<TaskId> {
        if self.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Remove the element at `pos`, preserving the order of the rest.
    ///
    /// # Panics
    /// If `pos` is out of bounds.
    pub fn remove_at(&mut self, pos: usize) -> TaskId {
        assert!(pos < self.len, "tier queue position out of bounds");
        let id = self.slots[pos];
        self.slots.copy_within(pos + 1..self.len, pos);
        self.len -= 1;
        id
    }

    /// Remove `id` from wherever it sits in the queue.
    ///
    /// # Panics
    /// If `id` is not a member — callers only remove tasks they know to
    /// be queued here.
    pub fn remove(&mut self, id: TaskId) {
        let pos = self
            .as_slice()
            .iter()
            .position(|&q| q == id)
            .unwrap_or_else(|| panic!("task {} not queued in this tier", id));
        self.remove_at(pos);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
