//! # Synchronization Primitives
//!
//! Interrupt-disabled critical sections — the sole mutual-exclusion
//! mechanism in the core. On a uniprocessor, masking interrupt delivery is
//! sufficient, and blocking locks are forbidden here: waiting on a busy
//! lock would re-enter the scheduler and deadlock.
//!
//! Every mutating scheduler entry point takes `&CriticalSection` as an
//! explicit capability token, so "called with interrupts enabled" is a
//! compile-time impossibility rather than a runtime assertion.

use cortex_m::interrupt;

/// Execute a closure within a critical section (interrupts disabled).
///
/// The token handed to the closure is what the scheduler's entry points
/// require; it cannot outlive the section.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     scheduler.admit(cs, id, now);
/// });
/// ```
///
/// # Performance
/// Keep critical sections as short as possible to minimize interrupt
/// latency. Every scheduler operation below runs to completion in bounded
/// time, so the latency cost is a small constant per call.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
