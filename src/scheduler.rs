//! # Scheduler
//!
//! The multilevel-feedback-queue core: three priority tiers, each with its
//! own selection algorithm, plus the aging engine that keeps waiting tasks
//! from starving and the preemption policy driven by the timer tick.
//!
//! ## Scheduling Algorithm
//!
//! At each timer tick (interrupts disabled):
//! 1. **Aging**: every queued task converts elapsed wait time into
//!    wait credit; each full `AGING_THRESHOLD` of credit buys an
//!    `AGING_BOOST` priority step, and tasks that outgrow their band
//!    migrate one tier up.
//! 2. **Preemption check**: the running task's tier is classified from its
//!    current priority; Tier-3 tasks are time-sliced every tick, Tier-1 and
//!    Tier-2 tasks yield only to a non-empty Tier-1 queue.
//! 3. At the next safe return point the kernel consumes the yield flag,
//!    re-admits the running task, and dispatches [`Scheduler::select_next`]
//!    through [`Scheduler::run`].
//!
//! ## Selection
//!
//! - **Tier-1**: shortest `predicted_burst_time` first (earliest-arrival
//!   tie-break).
//! - **Tier-2**: highest static `priority`, non-preemptive among peers
//!   (earliest-arrival tie-break).
//! - **Tier-3**: plain FIFO.
//!
//! All entry points run to completion without blocking; the only
//! suspension point in the whole core is the register switch inside
//! [`Scheduler::run`].

use cortex_m::interrupt::CriticalSection;
use core::fmt;
use log::{debug, trace};

use crate::config::{MAX_TASKS, PRIORITY_MAX};
use crate::machine::{Machine, SpaceId};
use crate::queue::{Tier, TierQueue};
use crate::task::{Task, TaskId, TaskStatus, Tick};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The central scheduler state: the task arena, the three tier queues, the
/// current-task reference, and the single deferred-destruction slot.
///
/// ## Design Notes
///
/// - All tasks are stored inline in a fixed-size arena (no heap); the tier
///   queues hold arena indices, never references.
/// - Every mutating method takes `&CriticalSection`: callers prove that
///   interrupt delivery is disabled, which is the core's only
///   mutual-exclusion mechanism. No method blocks or suspends, except the
///   register switch inside [`Scheduler::run`].
/// - At most one task is parked for destruction at a time; occupying the
///   slot while it is full is fatal.
pub struct Scheduler {
    /// Fixed-size task arena. A task's id is its index here.
    tasks: [Task; MAX_TASKS],

    /// The three tier queues, `Tier::L1` first.
    tiers: [TierQueue; 3],

    /// The task currently occupying the CPU, once one is installed.
    current: Option<TaskId>,

    /// Single-slot register for a finishing task whose stack is still in
    /// use. Drained by the dispatcher after control has moved elsewhere.
    to_be_destroyed: Option<TaskId>,

    /// Set by the preemption policy; consumed by the kernel at the next
    /// safe preemption point.
    yield_requested: bool,
}

impl Scheduler {
    /// Create an empty scheduler: no tasks, all tiers empty, no current
    /// task.
    pub const fn new() -> Self {
        Self {
            tasks: [Task::EMPTY; MAX_TASKS],
            tiers: [TierQueue::new(), TierQueue::new(), TierQueue::new()],
            current: None,
            to_be_destroyed: None,
            yield_requested: false,
        }
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Allocate and initialize a task in the arena.
    ///
    /// The new task starts `Ready` but is not yet queued; follow up with
    /// [`Scheduler::admit`] or [`Scheduler::install_current`].
    ///
    /// # Returns
    /// - `Ok(id)` — the arena index of the new task
    /// - `Err(())` — if the arena is full
    ///
    /// # Panics
    /// If `priority` is outside `0..=PRIORITY_MAX`.
    pub fn create_task(
        &mut self,
        _cs: &CriticalSection,
        priority: u32,
        predicted_burst_time: u32,
        space: Option<SpaceId>,
    ) -> Result<TaskId, ()> {
        let id = match self.tasks.iter().position(|t| !t.active) {
            Some(id) => id,
            None => return Err(()),
        };
        self.tasks[id].init(id, priority, predicted_burst_time, space);
        trace!("task [{}] created with priority [{}]", id, priority);
        Ok(id)
    }

    /// Read access to a task record.
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    /// Mutable access to a task record, e.g. for the kernel to mark the
    /// current task `Blocked` before dispatching away from it.
    pub fn task_mut(&mut self, _cs: &CriticalSection, id: TaskId) -> &mut Task {
        &mut self.tasks[id]
    }

    /// The task currently occupying the CPU.
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    /// Adopt `id` as the running task without a dispatch. Used once at
    /// boot, before the first [`Scheduler::run`].
    ///
    /// # Panics
    /// If a current task is already installed.
    pub fn install_current(&mut self, _cs: &CriticalSection, id: TaskId, now: Tick) {
        assert!(
            self.current.is_none(),
            "current task already installed"
        );
        self.tasks[id].status = TaskStatus::Running;
        self.tasks[id].run_start_tick = now;
        self.current = Some(id);
    }

    /// Privileged priority raise for `id`.
    ///
    /// Tier membership is fixed at insertion time, so a queued task is
    /// *not* requeued here; the aging engine's migration step reconciles
    /// its band on the next tick.
    ///
    /// # Panics
    /// If the raise would decrease the priority or exceed `PRIORITY_MAX`.
    pub fn raise_priority(&mut self, _cs: &CriticalSection, id: TaskId, new: u32) {
        let old = self.tasks[id].priority();
        self.tasks[id].raise_to(new);
        trace!("task [{}] priority raised [{}] -> [{}]", id, old, new);
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Insert a ready task into the tier matching its current priority
    /// band, at the tail, and restart its aging accounting at `now`.
    ///
    /// # Panics
    /// If the task is already a member of some tier queue.
    pub fn admit(&mut self, _cs: &CriticalSection, id: TaskId, now: Tick) {
        assert!(
            !self.is_queued(id),
            "task {} is already queued in a tier",
            id
        );
        self.tasks[id].status = TaskStatus::Ready;
        let tier = Tier::for_priority(self.tasks[id].priority());
        self.tiers[tier.index()].push_back(id);
        self.tasks[id].since_tick = now;
        trace!(
            "tick [{}]: task [{}] inserted into queue L{}",
            now,
            id,
            tier.number()
        );
    }

    fn is_queued(&self, id: TaskId) -> bool {
        self.tiers.iter().any(|q| q.contains(id))
    }

    // -----------------------------------------------------------------------
    // Aging engine
    // -----------------------------------------------------------------------

    /// Run one aging pass over all tiers, in the fixed order L1, L2, L3.
    ///
    /// For every task resident in a tier at the start of that tier's scan:
    /// settle elapsed wait time into its token, exchange full token chunks
    /// for priority boosts, then check migration against the tier it was
    /// queued in when the scan began. Migrations are applied after the
    /// scan, tail-appended one band up. A task that the L3 pass moves into
    /// L2 is not re-examined until the next invocation — L2 has already
    /// been scanned by then.
    ///
    /// The running task is never aged: it is not a member of any queue.
    pub fn tick_aging(&mut self, _cs: &CriticalSection, now: Tick) {
        for tier in [Tier::L1, Tier::L2, Tier::L3] {
            // Snapshot of the residents when this tier's scan starts.
            let mut resident: [TaskId; MAX_TASKS] = [0; MAX_TASKS];
            let snapshot = self.tiers[tier.index()].as_slice();
            let count = snapshot.len();
            resident[..count].copy_from_slice(snapshot);

            let mut migrants: [TaskId; MAX_TASKS] = [0; MAX_TASKS];
            let mut migrant_count = 0;

            for &id in &resident[..count] {
                let task = &mut self.tasks[id];
                task.settle_wait(now);

                let old = task.priority();
                if task.exchange_wait_credit() > 0 {
                    trace!(
                        "tick [{}]: task [{}] changes its priority from [{}] to [{}]",
                        now,
                        id,
                        old,
                        task.priority()
                    );
                }

                if let Some(threshold) = tier.promotion_threshold() {
                    if task.priority() >= threshold {
                        migrants[migrant_count] = id;
                        migrant_count += 1;
                    }
                }
            }

            if let Some(up) = tier.promoted() {
                for &id in &migrants[..migrant_count] {
                    self.tiers[tier.index()].remove(id);
                    trace!(
                        "tick [{}]: task [{}] is removed from queue L{}",
                        now,
                        id,
                        tier.number()
                    );
                    self.tiers[up.index()].push_back(id);
                    trace!(
                        "tick [{}]: task [{}] is inserted into queue L{}",
                        now,
                        id,
                        up.number()
                    );
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tier selector
    // -----------------------------------------------------------------------

    /// Pick the next task to run and remove it from its queue.
    ///
    /// The first non-empty tier wins, inspected L1, L2, L3. Selection
    /// within a tier is the tier's own algorithm; strict comparisons break
    /// ties in favor of the earliest-arrived member. Returns `None` when
    /// all tiers are empty (idle — a normal result, not an error).
    pub fn select_next(&mut self, _cs: &CriticalSection) -> Option<TaskId> {
        let tier = *[Tier::L1, Tier::L2, Tier::L3]
            .iter()
            .find(|t| !self.tiers[t.index()].is_empty())?;

        let pos = match tier {
            Tier::L1 => self.scan_position(tier, |best, cand| {
                cand.predicted_burst_time < best.predicted_burst_time
            }),
            Tier::L2 => self.scan_position(tier, |best, cand| cand.priority() > best.priority()),
            Tier::L3 => 0,
        };

        let id = self.tiers[tier.index()].remove_at(pos);
        trace!("task [{}] is removed from queue L{}", id, tier.number());
        Some(id)
    }

    /// Position of the best member of `tier` under `beats`, keeping the
    /// earliest-arrived member on ties.
    fn scan_position<F>(&self, tier: Tier, beats: F) -> usize
    where
        F: Fn(&Task, &Task) -> bool,
    {
        let queue = self.tiers[tier.index()].as_slice();
        let mut best = 0;
        for pos in 1..queue.len() {
            if beats(&self.tasks[queue[best]], &self.tasks[queue[pos]]) {
                best = pos;
            }
        }
        best
    }

    // -----------------------------------------------------------------------
    // Preemption policy
    // -----------------------------------------------------------------------

    /// Timer-tick handler. Called once per tick by the external timer
    /// machinery, with interrupts disabled; `idle` is the machine's
    /// current operating mode.
    ///
    /// When busy, runs one aging pass, classifies the running task's tier
    /// from its *current* priority, and raises the yield flag if the
    /// running task should give way: a Tier-1 or Tier-2 task yields to a
    /// non-empty Tier-1 queue, a Tier-3 task is time-sliced every tick.
    /// The actual suspension happens later, when the kernel consumes
    /// [`Scheduler::take_yield_request`] at a safe preemption point.
    pub fn on_timer_tick(&mut self, cs: &CriticalSection, now: Tick, idle: bool) {
        if idle {
            return;
        }

        self.tick_aging(cs, now);

        let current = match self.current {
            Some(id) => id,
            None => return,
        };
        let priority = self.tasks[current].priority();
        assert!(
            priority <= PRIORITY_MAX,
            "running task priority {} outside 0..={}",
            priority,
            PRIORITY_MAX
        );

        let preempt = match Tier::for_priority(priority) {
            // Tier-1 and Tier-2 give way only to a waiting Tier-1 task.
            Tier::L1 | Tier::L2 => !self.tiers[Tier::L1.index()].is_empty(),
            // Tier-3 is time-sliced unconditionally.
            Tier::L3 => true,
        };

        if preempt {
            trace!(
                "tick [{}]: task [{}] flagged to yield on return",
                now,
                current
            );
            self.yield_requested = true;
        }
    }

    /// Whether the preemption policy has flagged the running task.
    pub fn yield_requested(&self) -> bool {
        self.yield_requested
    }

    /// Consume the yield flag. Called by the kernel at the safe
    /// preemption point (return from interrupt).
    pub fn take_yield_request(&mut self, _cs: &CriticalSection) -> bool {
        let requested = self.yield_requested;
        self.yield_requested = false;
        requested
    }

    // -----------------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------------

    /// Hand the CPU to `next`. If `finishing`, the outgoing task is
    /// parked in the deferred-destruction slot and reclaimed only after
    /// control has provably left its stack.
    ///
    /// The outgoing task's status must already reflect why it is leaving
    /// (`Ready` after a yield, `Blocked` after a sleep); this function
    /// does not decide that. Control returns here when the outgoing task
    /// is eventually resumed, still inside a critical section, at which
    /// point any parked task is destroyed and the outgoing task's user
    /// context is restored.
    ///
    /// # Panics
    /// - If no current task is installed.
    /// - If `finishing` and the destruction slot is already occupied
    ///   (double-finish upstream).
    /// - If the outgoing task's stack bounds have been violated.
    pub fn run<M: Machine>(
        &mut self,
        _cs: &CriticalSection,
        machine: &mut M,
        next: TaskId,
        finishing: bool,
    ) {
        let old = match self.current {
            Some(id) => id,
            None => panic!("dispatch without an installed current task"),
        };

        if finishing {
            assert!(
                self.to_be_destroyed.is_none(),
                "deferred-destruction slot already occupied by task {}",
                self.to_be_destroyed.unwrap_or(0)
            );
            self.tasks[old].status = TaskStatus::Finished;
            self.to_be_destroyed = Some(old);
        }

        if let Some(space) = self.tasks[old].space {
            machine.save_user_state(space);
        }

        assert!(
            machine.stack_intact(old),
            "task {} stack bounds violated",
            old
        );

        self.current = Some(next);
        self.tasks[next].status = TaskStatus::Running;
        let now = machine.now();
        self.tasks[next].run_start_tick = now;
        debug!(
            "tick [{}]: task [{}] is now selected for execution, task [{}] is replaced after [{}] ticks",
            now,
            next,
            old,
            now - self.tasks[old].run_start_tick
        );

        machine.switch(old, next);

        // Control is back: the outgoing task has been resumed on its own
        // stack, interrupts still disabled.
        self.tasks[old].run_start_tick = machine.now();

        self.reap_destroyed();

        if let Some(space) = self.tasks[old].space {
            machine.restore_user_state(space);
        }
    }

    /// Destroy the task parked in the deferred-destruction slot, if any.
    /// Runs on a different stack than the parked task's own.
    fn reap_destroyed(&mut self) {
        if let Some(id) = self.to_be_destroyed.take() {
            trace!("task [{}] destroyed", id);
            self.tasks[id].destroy();
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

impl fmt::Debug for Scheduler {
    /// Queue-contents dump for diagnostics: the three tiers in order,
    /// the current task, and the destruction slot.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("L1", &self.tiers[Tier::L1.index()].as_slice())
            .field("L2", &self.tiers[Tier::L2.index()].as_slice())
            .field("L3", &self.tiers[Tier::L3.index()].as_slice())
            .field("current", &self.current)
            .field("to_be_destroyed", &self.to_be_destroyed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::SpaceId;

    /// Mint the interrupts-disabled token for tests; the host test
    /// harness has no interrupts to mask.
    fn with_cs<R>(f: impl FnOnce(&CriticalSection) -> R) -> R {
        f(unsafe { &CriticalSection::new() })
    }

    struct MockMachine {
        now: Tick,
        /// Added to `now` by `switch`, simulating time spent away.
        switch_advance: Tick,
        switches: usize,
        last_switch: Option<(TaskId, TaskId)>,
        saved: Option<SpaceId>,
        restored: Option<SpaceId>,
        stack_ok: bool,
    }

    impl MockMachine {
        fn at(now: Tick) -> Self {
            Self {
                now,
                switch_advance: 0,
                switches: 0,
                last_switch: None,
                saved: None,
                restored: None,
                stack_ok: true,
            }
        }
    }

    impl Machine for MockMachine {
        fn now(&self) -> Tick {
            self.now
        }

        fn switch(&mut self, from: TaskId, to: TaskId) {
            self.switches += 1;
            self.last_switch = Some((from, to));
            self.now += self.switch_advance;
        }

        fn save_user_state(&mut self, space: SpaceId) {
            self.saved = Some(space);
        }

        fn restore_user_state(&mut self, space: SpaceId) {
            self.restored = Some(space);
        }

        fn stack_intact(&self, _task: TaskId) -> bool {
            self.stack_ok
        }
    }

    fn admit_new(
        sched: &mut Scheduler,
        cs: &CriticalSection,
        priority: u32,
        burst: u32,
        now: Tick,
    ) -> TaskId {
        let id = sched.create_task(cs, priority, burst, None).unwrap();
        sched.admit(cs, id, now);
        id
    }

    #[test]
    fn admission_lands_in_the_priority_band_tier() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let t1 = admit_new(&mut sched, cs, 100, 0, 0);
            let t2 = admit_new(&mut sched, cs, 99, 0, 0);
            let t3 = admit_new(&mut sched, cs, 50, 0, 0);
            let t4 = admit_new(&mut sched, cs, 49, 0, 0);
            assert!(sched.tiers[Tier::L1.index()].contains(t1));
            assert!(sched.tiers[Tier::L2.index()].contains(t2));
            assert!(sched.tiers[Tier::L2.index()].contains(t3));
            assert!(sched.tiers[Tier::L3.index()].contains(t4));
        });
    }

    #[test]
    fn highest_tier_wins_selection() {
        // Scenario: priorities 120, 70, 20 — the Tier-1 task is chosen.
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let hi = admit_new(&mut sched, cs, 120, 30, 0);
            let _mid = admit_new(&mut sched, cs, 70, 0, 0);
            let _lo = admit_new(&mut sched, cs, 20, 0, 0);
            assert_eq!(sched.select_next(cs), Some(hi));
            assert!(!sched.tiers[Tier::L1.index()].contains(hi));
        });
    }

    #[test]
    fn tier3_is_strict_fifo() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let t1 = admit_new(&mut sched, cs, 10, 0, 0);
            let t2 = admit_new(&mut sched, cs, 10, 0, 0);
            assert_eq!(sched.select_next(cs), Some(t1));
            assert_eq!(sched.select_next(cs), Some(t2));
            assert_eq!(sched.select_next(cs), None);
        });
    }

    #[test]
    fn tier1_picks_shortest_predicted_burst_earliest_arrival() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let _a = admit_new(&mut sched, cs, 110, 5, 0);
            let b = admit_new(&mut sched, cs, 120, 3, 0);
            let _c = admit_new(&mut sched, cs, 130, 3, 0);
            let _d = admit_new(&mut sched, cs, 140, 7, 0);
            // b and c tie on burst 3; b arrived first.
            assert_eq!(sched.select_next(cs), Some(b));
        });
    }

    #[test]
    fn tier2_picks_highest_priority_earliest_arrival() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let _a = admit_new(&mut sched, cs, 80, 0, 0);
            let b = admit_new(&mut sched, cs, 90, 0, 0);
            let _c = admit_new(&mut sched, cs, 90, 0, 0);
            assert_eq!(sched.select_next(cs), Some(b));
        });
    }

    #[test]
    fn select_on_empty_tiers_is_idle() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            assert_eq!(sched.select_next(cs), None);
        });
    }

    #[test]
    fn admit_then_select_returns_the_task_unchanged() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = sched.create_task(cs, 70, 25, None).unwrap();
            sched.admit(cs, id, 400);
            assert_eq!(sched.select_next(cs), Some(id));
            let t = sched.task(id);
            assert_eq!(t.priority(), 70);
            assert_eq!(t.predicted_burst_time, 25);
            assert_eq!(t.aging_token, 0);
            assert_eq!(t.since_tick, 400);
            assert_eq!(t.status, TaskStatus::Ready);
        });
    }

    #[test]
    #[should_panic]
    fn double_admission_is_fatal() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = admit_new(&mut sched, cs, 10, 0, 0);
            sched.admit(cs, id, 0);
        });
    }

    // -- Aging ------------------------------------------------------------

    #[test]
    fn aging_boosts_and_migrates_to_tier2() {
        // Scenario: 1600 wait-ticks at priority 45 → priority 55,
        // remainder 100, now queued in L2.
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = admit_new(&mut sched, cs, 45, 0, 0);
            sched.tick_aging(cs, 1600);
            assert_eq!(sched.task(id).priority(), 55);
            assert_eq!(sched.task(id).aging_token, 100);
            assert!(!sched.tiers[Tier::L3.index()].contains(id));
            assert!(sched.tiers[Tier::L2.index()].contains(id));
        });
    }

    #[test]
    fn migration_is_one_tier_per_invocation() {
        // Enough credit to climb past 100 in one pass, but an L3 resident
        // still lands in L2 first and only reaches L1 on the next pass.
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = admit_new(&mut sched, cs, 45, 0, 0);
            sched.tick_aging(cs, 9000);
            assert_eq!(sched.task(id).priority(), 105);
            assert!(sched.tiers[Tier::L2.index()].contains(id));
            assert!(!sched.tiers[Tier::L1.index()].contains(id));

            sched.tick_aging(cs, 9000);
            assert!(sched.tiers[Tier::L1.index()].contains(id));
        });
    }

    #[test]
    fn aging_preserves_arrival_order_across_migration() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let first = admit_new(&mut sched, cs, 45, 0, 0);
            let second = admit_new(&mut sched, cs, 45, 0, 0);
            let incumbent = admit_new(&mut sched, cs, 60, 0, 1600);
            sched.tick_aging(cs, 1600);
            // Migrants append at the L2 tail, behind the incumbent, in
            // their L3 arrival order.
            assert_eq!(
                sched.tiers[Tier::L2.index()].as_slice(),
                &[incumbent, first, second]
            );
        });
    }

    #[test]
    fn aging_never_touches_the_running_task() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = sched.create_task(cs, 45, 0, None).unwrap();
            sched.install_current(cs, id, 0);
            sched.tick_aging(cs, 5000);
            assert_eq!(sched.task(id).priority(), 45);
            assert_eq!(sched.task(id).aging_token, 0);
        });
    }

    #[test]
    fn raise_does_not_requeue_until_the_next_aging_pass() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = admit_new(&mut sched, cs, 45, 0, 0);
            sched.raise_priority(cs, id, 120);
            assert!(sched.tiers[Tier::L3.index()].contains(id));
            // Migration check reconciles the band, one tier at a time.
            sched.tick_aging(cs, 0);
            assert!(sched.tiers[Tier::L2.index()].contains(id));
        });
    }

    // -- Preemption policy ------------------------------------------------

    #[test]
    fn tier3_running_task_is_time_sliced_every_tick() {
        // Scenario: running priority 30, Tier-1 empty, one other Tier-3
        // waiter → yield is flagged.
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let running = sched.create_task(cs, 30, 0, None).unwrap();
            sched.install_current(cs, running, 0);
            let _waiter = admit_new(&mut sched, cs, 10, 0, 0);
            sched.on_timer_tick(cs, 100, false);
            assert!(sched.yield_requested());
        });
    }

    #[test]
    fn tier1_running_task_keeps_cpu_while_tier1_queue_is_empty() {
        // Scenario: running priority 110, Tier-1 queue empty → no yield.
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let running = sched.create_task(cs, 110, 0, None).unwrap();
            sched.install_current(cs, running, 0);
            let _waiter = admit_new(&mut sched, cs, 70, 0, 0);
            sched.on_timer_tick(cs, 100, false);
            assert!(!sched.yield_requested());
        });
    }

    #[test]
    fn tier2_running_task_yields_only_to_tier1() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let running = sched.create_task(cs, 70, 0, None).unwrap();
            sched.install_current(cs, running, 0);
            let _peer = admit_new(&mut sched, cs, 90, 0, 0);
            sched.on_timer_tick(cs, 100, false);
            assert!(!sched.yield_requested());

            let _hi = admit_new(&mut sched, cs, 120, 0, 100);
            sched.on_timer_tick(cs, 200, false);
            assert!(sched.yield_requested());
        });
    }

    #[test]
    fn idle_tick_does_no_aging_and_flags_nothing() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let id = admit_new(&mut sched, cs, 45, 0, 0);
            sched.on_timer_tick(cs, 5000, true);
            assert_eq!(sched.task(id).aging_token, 0);
            assert_eq!(sched.task(id).priority(), 45);
            assert!(!sched.yield_requested());
        });
    }

    #[test]
    fn take_yield_request_consumes_the_flag() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let running = sched.create_task(cs, 30, 0, None).unwrap();
            sched.install_current(cs, running, 0);
            sched.on_timer_tick(cs, 100, false);
            assert!(sched.take_yield_request(cs));
            assert!(!sched.yield_requested());
            assert!(!sched.take_yield_request(cs));
        });
    }

    // -- Dispatcher -------------------------------------------------------

    #[test]
    fn run_hands_off_and_restores_user_context() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(100);
            machine.switch_advance = 50;

            let old = sched
                .create_task(cs, 70, 0, Some(SpaceId(7)))
                .unwrap();
            sched.install_current(cs, old, 0);
            let next = sched.create_task(cs, 80, 0, None).unwrap();

            sched.task_mut(cs, old).status = TaskStatus::Ready;
            sched.run(cs, &mut machine, next, false);

            assert_eq!(sched.current(), Some(next));
            assert_eq!(sched.task(next).status, TaskStatus::Running);
            assert_eq!(sched.task(next).run_start_tick, 100);
            assert_eq!(machine.last_switch, Some((old, next)));
            assert_eq!(machine.saved, Some(SpaceId(7)));
            // After the (mocked) resume, the outgoing task's run clock
            // restarts and its user context is reloaded.
            assert_eq!(sched.task(old).run_start_tick, 150);
            assert_eq!(machine.restored, Some(SpaceId(7)));
        });
    }

    #[test]
    fn finishing_task_is_parked_then_destroyed_exactly_once() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(0);

            let old = sched.create_task(cs, 70, 0, None).unwrap();
            sched.install_current(cs, old, 0);
            let next = sched.create_task(cs, 80, 0, None).unwrap();

            sched.run(cs, &mut machine, next, true);

            // The mock switch returns immediately, so the drain already
            // ran: the finishing task is gone and the slot is free again.
            assert!(!sched.task(old).active);
            assert!(sched.to_be_destroyed.is_none());
            assert_eq!(machine.switches, 1);
        });
    }

    #[test]
    #[should_panic]
    fn occupied_destruction_slot_is_fatal() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(0);

            let old = sched.create_task(cs, 70, 0, None).unwrap();
            sched.install_current(cs, old, 0);
            let parked = sched.create_task(cs, 20, 0, None).unwrap();
            let next = sched.create_task(cs, 80, 0, None).unwrap();

            // A task is already awaiting destruction; a second finishing
            // dispatch is a double-finish bug upstream.
            sched.to_be_destroyed = Some(parked);
            sched.run(cs, &mut machine, next, true);
        });
    }

    #[test]
    #[should_panic]
    fn stack_violation_is_fatal() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(0);
            machine.stack_ok = false;

            let old = sched.create_task(cs, 70, 0, None).unwrap();
            sched.install_current(cs, old, 0);
            let next = sched.create_task(cs, 80, 0, None).unwrap();
            sched.run(cs, &mut machine, next, false);
        });
    }

    #[test]
    #[should_panic]
    fn dispatch_without_current_is_fatal() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(0);
            let next = sched.create_task(cs, 80, 0, None).unwrap();
            sched.run(cs, &mut machine, next, false);
        });
    }

    #[test]
    fn destroyed_slot_can_be_reused() {
        with_cs(|cs| {
            let mut sched = Scheduler::new();
            let mut machine = MockMachine::at(0);

            let old = sched.create_task(cs, 70, 0, None).unwrap();
            sched.install_current(cs, old, 0);
            let next = sched.create_task(cs, 80, 0, None).unwrap();
            sched.run(cs, &mut machine, next, true);
            assert!(!sched.task(old).active);

            let replacement = sched.create_task(cs, 10, 0, None).unwrap();
            assert_eq!(replacement, old);
        });
    }
}
