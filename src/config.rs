//! # TriqOS Configuration
//!
//! Compile-time constants governing the scheduler core. All limits are
//! fixed at compile time — no dynamic allocation.

/// Maximum number of tasks the scheduler can manage simultaneously.
/// This bounds the static task arena and the capacity of each tier queue.
pub const MAX_TASKS: usize = 32;

/// Highest admissible task priority. Priorities live in `0..=PRIORITY_MAX`
/// and never decrease over a task's lifetime. Aging clamps here.
pub const PRIORITY_MAX: u32 = 149;

/// Lower bound of the Tier-1 priority band. Tasks at or above this
/// priority are scheduled shortest-predicted-burst-first.
pub const TIER1_MIN_PRIORITY: u32 = 100;

/// Lower bound of the Tier-2 priority band. Tasks in
/// `TIER2_MIN_PRIORITY..TIER1_MIN_PRIORITY` are scheduled by highest
/// static priority, non-preemptively among peers. Everything below is
/// Tier-3 round-robin.
pub const TIER2_MIN_PRIORITY: u32 = 50;

/// Wait-tick credit a queued task must accumulate before the aging
/// engine exchanges it for one priority boost.
pub const AGING_THRESHOLD: u64 = 1500;

/// Priority gained per exchanged `AGING_THRESHOLD` of wait credit.
pub const AGING_BOOST: u32 = 10;
