//! # Machine Collaborators
//!
//! The seam between the scheduler core and the surrounding kernel's
//! hardware layer. Everything register-level — the actual context switch,
//! user-mode state save/restore, stack-bounds checking — and the global
//! tick counter live behind the [`Machine`] trait; the core only decides
//! *what* to do and *when*.
//!
//! A real port implements `Machine` over its switch primitive and timer
//! (on Cortex-M that would be a PendSV-style stack swap plus the SysTick
//! counter). Host-side tests implement it with a mock that records calls.

use crate::task::{TaskId, Tick};

/// Opaque handle to a user-mode execution context (address space plus
/// user-visible register file). Owned by the task record, understood only
/// by the machine layer. Kernel-only tasks have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceId(pub u32);

/// Hardware services the dispatcher and aging engine depend on.
///
/// All methods are invoked with interrupts disabled and must not block;
/// `switch` is the single point in the whole core where control leaves
/// the calling task.
pub trait Machine {
    /// Current value of the global monotonically increasing tick counter.
    fn now(&self) -> Tick;

    /// Perform the register/stack transfer from `from` to `to`.
    ///
    /// Returns only when `from` is later resumed: the caller's execution
    /// continues at the point after this call, on `from`'s own stack,
    /// with interrupts still disabled.
    fn switch(&mut self, from: TaskId, to: TaskId);

    /// Persist the user-mode CPU state belonging to `space`.
    fn save_user_state(&mut self, space: SpaceId);

    /// Reload the user-mode CPU state belonging to `space`.
    fn restore_user_state(&mut self, space: SpaceId);

    /// Whether `task`'s stack and resource bounds are still intact. A
    /// `false` return is fatal to the dispatcher: an overflowed stack
    /// means scheduling state can no longer be trusted.
    fn stack_intact(&self, task: TaskId) -> bool;
}
