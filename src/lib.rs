//! # TriqOS — Multilevel-Feedback-Queue Scheduler Core
//!
//! A preemptive MLFQ thread scheduler core for single-processor kernels.
//! Three fixed priority tiers, each with its own selection algorithm, a
//! tick-driven aging engine that converts wait time into priority, and a
//! timer-driven preemption policy — all running to completion with
//! interrupts disabled and without ever blocking.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Embedding Kernel                       │
//! │   create_task() · admit() · select_next() · run()         │
//! ├──────────────┬─────────────────────┬──────────────────────┤
//! │ Tier Queues  │   Aging Engine      │  Preemption Policy   │
//! │ queue.rs     │   scheduler.rs      │  scheduler.rs        │
//! │ ─ L1 SJF     │   ─ tick_aging()    │  ─ on_timer_tick()   │
//! │ ─ L2 prio    │   ─ migration       │  ─ yield flag        │
//! │ ─ L3 FIFO    │                     │                      │
//! ├──────────────┴─────────────────────┴──────────────────────┤
//! │              Task Model (task.rs)                         │
//! │    Task · TaskStatus · priority/wait-credit arithmetic    │
//! ├───────────────────────────────────────────────────────────┤
//! │   Machine Collaborators (machine.rs) — external           │
//! │   tick counter · register switch · user ctx · stack check │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tier model
//!
//! | Tier | Priority band | Selection                              |
//! |------|---------------|----------------------------------------|
//! | L1   | 100..=149     | shortest predicted burst first         |
//! | L2   | 50..=99       | highest priority, non-preemptive peers |
//! | L3   | 0..=49        | FIFO, time-sliced every tick           |
//!
//! Queued tasks accumulate wait credit; every 1500 wait-ticks buys a
//! +10 priority boost (clamped at 149), and a task that outgrows its band
//! migrates one tier up at the tail, preserving arrival order.
//!
//! ## Concurrency model
//!
//! Single logical CPU. The only mutual exclusion is disabled interrupt
//! delivery, expressed in the API as an explicit `&CriticalSection`
//! capability token on every mutating entry point (`sync.rs`). Blocking
//! locks are forbidden inside the core — waiting on one would re-enter
//! the scheduler. The only suspension point is the register-level context
//! switch inside the dispatcher, delegated to the [`machine::Machine`]
//! collaborator.
//!
//! ## Memory model
//!
//! - **No heap**: all state is statically sized
//! - **Fixed task arena**: `[Task; MAX_TASKS]`, ids are arena indices
//! - **Index-based tier queues**: `TierQueue` holds ids, never references
//! - **Deferred destruction**: a single-slot register for a finishing
//!   task, drained only after control has left its stack

#![no_std]

pub mod config;
pub mod machine;
pub mod queue;
pub mod scheduler;
pub mod sync;
pub mod task;
