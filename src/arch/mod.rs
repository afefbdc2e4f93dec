//! # Architecture Abstraction Layer
//!
//! Everything the scheduling core asks of the hardware goes through `Port`.
//! The core swaps register files and stacks through it and masks the timer
//! interrupt for the length of a scheduling pass. The idle loop also sleeps
//! through it.
//!
//! `cortex_m4` is the only hardware port. Host tests run the core against
//! `mock`, which records switches instead of performing them.

use crate::context::Context;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(test)]
pub mod mock;

/// Hardware services consumed by the scheduler.
pub trait Port {
    /// Resume address installed in the context of every spawned task. The
    /// code there must call `Scheduler::schedule_tail` before running the
    /// task's entry.
    fn trampoline(&self) -> usize;

    /// Save the live callee-saved registers, stack pointer and return
    /// address into `prev`, then load `next` and continue at its resume
    /// address. Returns once a later switch restores `prev`.
    ///
    /// # Safety
    /// Both pointers must be valid, distinct and stay valid until the
    /// saved task is resumed. `next` must hold a context produced by an
    /// earlier switch or by `Context::seeded` over an owned stack.
    unsafe fn switch(&mut self, prev: *mut Context, next: *const Context);

    /// Mask interrupts. Returns whether they were enabled before.
    fn disable_interrupts(&mut self) -> bool;

    /// Unmask interrupts if `was_enabled`, otherwise leave them masked.
    fn restore_interrupts(&mut self, was_enabled: bool);

    /// Sleep until an interrupt is pending. Called with interrupts enabled.
    fn wait_for_interrupt(&mut self);
}
