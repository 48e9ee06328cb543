//! # Task Record
//!
//! Defines the per-task state consumed and mutated by the scheduler: the
//! priority the tier queues are keyed on, the externally supplied burst
//! prediction used for Tier-1 ordering, and the wait-credit bookkeeping the
//! aging engine exchanges for priority boosts.
//!
//! Tasks live in a fixed-size arena inside the [`Scheduler`]
//! (`[Task; MAX_TASKS]`) — no heap allocation. A task's `id` is its arena
//! index and is stable for as long as the task is alive.
//!
//! [`Scheduler`]: crate::scheduler::Scheduler

use crate::config::PRIORITY_MAX;
use crate::machine::SpaceId;

/// The scheduler's time base. Ticks are advanced by the external timer
/// machinery and passed in by the caller; this core never reads a clock
/// of its own.
pub type Tick = u64;

/// Index of a task in the scheduler's arena.
pub type TaskId = usize;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// A task is a member of exactly one tier queue while `Ready` and of no
/// queue while `Running` or `Blocked`. A `Finished` task is parked in the
/// single deferred-destruction slot until the dispatcher drains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Ready to run, waiting in a tier queue.
    Ready,
    /// Currently occupying the CPU.
    Running,
    /// Waiting on an event or resource; not in any tier queue.
    Blocked,
    /// Finished executing; awaiting deferred destruction.
    Finished,
}

// ---------------------------------------------------------------------------
// Task record
// ---------------------------------------------------------------------------

/// Per-schedulable-unit state.
///
/// `priority` is private: it is mutated only through [`Task::raise_to`]
/// (privileged external raise) and [`Task::exchange_wait_credit`] (aging),
/// both of which keep it inside `0..=PRIORITY_MAX` and never let it
/// decrease.
pub struct Task {
    /// Arena index. Assigned at creation, immutable while alive.
    pub id: TaskId,

    /// Scheduling priority, `0..=149`. Higher is more favored.
    priority: u32,

    /// Externally supplied estimate of remaining CPU need. Read-only to
    /// the scheduler; consulted only by Tier-1 selection.
    pub predicted_burst_time: u32,

    /// Accumulated waiting credit in wait-ticks. Exchanged by the aging
    /// engine in `AGING_THRESHOLD`-sized chunks for priority boosts.
    /// Meaningful only while the task is queued.
    pub aging_token: u64,

    /// Tick at which aging accounting was last settled. Rewritten on
    /// admit and on every settlement.
    pub since_tick: Tick,

    /// Tick at which the task most recently began occupying the CPU.
    pub run_start_tick: Tick,

    /// Current execution state.
    pub status: TaskStatus,

    /// Opaque handle to an optional user-mode execution context. `None`
    /// for pure kernel tasks. The scheduler only ever asks the machine
    /// collaborator to save or restore it around a handoff.
    pub space: Option<SpaceId>,

    /// Whether this arena slot is allocated (true) or free (false).
    pub active: bool,
}

impl Task {
    /// An empty (unallocated) record. Used to initialize the arena.
    pub const EMPTY: Task = Task {
        id: 0,
        priority: 0,
        predicted_burst_time: 0,
        aging_token: 0,
        since_tick: 0,
        run_start_tick: 0,
        status: TaskStatus::Blocked,
        space: None,
        active: false,
    };

    /// Initialize this record for a newly created task.
    ///
    /// The task starts `Ready` with no accumulated wait credit. It is not
    /// yet a member of any tier queue — the kernel either admits it or
    /// installs it as the bootstrap current task.
    ///
    /// # Panics
    /// If `priority` is outside `0..=PRIORITY_MAX` (invariant violation,
    /// fatal).
    pub fn init(
        &mut self,
        id: TaskId,
        priority: u32,
        predicted_burst_time: u32,
        space: Option<SpaceId>,
    ) {
        assert!(
            priority <= PRIORITY_MAX,
            "task priority {} outside 0..={}",
            priority,
            PRIORITY_MAX
        );
        self.id = id;
        self.priority = priority;
        self.predicted_burst_time = predicted_burst_time;
        self.aging_token = 0;
        self.since_tick = 0;
        self.run_start_tick = 0;
        self.status = TaskStatus::Ready;
        self.space = space;
        self.active = true;
    }

    /// Current priority.
    #[inline]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Privileged priority raise (external caller, e.g. a kernel syscall).
    ///
    /// # Panics
    /// If `new` would decrease the priority or exceed `PRIORITY_MAX` —
    /// a task's priority is monotonically non-decreasing over its whole
    /// lifetime.
    pub fn raise_to(&mut self, new: u32) {
        assert!(
            new >= self.priority && new <= PRIORITY_MAX,
            "priority raise {} -> {} violates monotonic 0..={} bound",
            self.priority,
            new,
            PRIORITY_MAX
        );
        self.priority = new;
    }

    /// Settle elapsed wait time into the aging token and restart the
    /// accounting window at `now`.
    ///
    /// Called by the aging engine once per pass for every queued task.
    pub fn settle_wait(&mut self, now: Tick) {
        self.aging_token += now - self.since_tick;
        self.since_tick = now;
    }

    /// Exchange accumulated wait credit for priority, one
    /// `AGING_THRESHOLD` chunk per `AGING_BOOST` step, clamping at
    /// `PRIORITY_MAX` and carrying any remainder forward.
    ///
    /// Returns the total priority gained (0 if no chunk was exchangeable).
    pub fn exchange_wait_credit(&mut self) -> u32 {
        use crate::config::{AGING_BOOST, AGING_THRESHOLD};

        let before = self.priority;
        while self.priority < PRIORITY_MAX && self.aging_token >= AGING_THRESHOLD {
            self.priority = (self.priority + AGING_BOOST).min(PRIORITY_MAX);
            self.aging_token -= AGING_THRESHOLD;
        }
        self.priority - before
    }

    /// Release the arena slot. Called only from the dispatcher's
    /// deferred-destruction drain.
    pub fn destroy(&mut self) {
        self.space = None;
        self.active = false;
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
