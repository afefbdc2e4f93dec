//! # Context Switch
//!
//! A `Context` is the machine state a task needs to continue: the
//! callee-saved registers, the stack pointer and the address to resume at.
//! Caller-saved registers need no slot because every switch happens at a
//! function call boundary.
//!
//! ## Layout
//!
//! `#[repr(C)]`, read and written by the port's switch routine:
//!
//! ```text
//! offset  0   regs[0..8]   r4-r11
//! offset 32   sp
//! offset 36   pc           resume address (Thumb bit set)
//! ```

use crate::arch::Port;
use crate::scheduler::Scheduler;

/// Number of callee-saved general-purpose registers (r4-r11).
pub const CALLEE_SAVED: usize = 8;

/// Saved machine state of a task that is not executing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub regs: [usize; CALLEE_SAVED],
    pub sp: usize,
    pub pc: usize,
}

impl Context {
    pub const fn zeroed() -> Self {
        Self {
            regs: [0; CALLEE_SAVED],
            sp: 0,
            pc: 0,
        }
    }

    /// State of a task that has never run: clean registers, an empty stack
    /// and `resume` as the first instruction.
    pub const fn seeded(sp: usize, resume: usize) -> Self {
        Self {
            regs: [0; CALLEE_SAVED],
            sp,
            pc: resume,
        }
    }
}

impl<P: Port, const N: usize> Scheduler<P, N> {
    /// Transfer control to slot `next`.
    ///
    /// Switching to the current slot returns at once without touching
    /// anything, so the live state of a task that keeps running is never
    /// overwritten by its stale saved copy. Otherwise the live state goes
    /// into the current TCB, `next` becomes current, and its saved state is
    /// restored. The call returns when some later switch selects this task
    /// again.
    ///
    /// Only reachable from inside a scheduling pass. The public entry points
    /// (`yield_current`, `select_and_switch`, `timer_tick`) open the pass
    /// before they get here.
    pub(crate) fn switch_to(&mut self, next: usize) {
        let prev = self.current;
        if next == prev {
            return;
        }
        let Some((prev_ctx, next_ctx)) = self.table.context_pair(prev, next) else {
            log::error!("switch from task {} to unoccupied slot {} ignored", prev, next);
            return;
        };

        self.current = next;
        // SAFETY: both pointers address contexts of distinct occupied slots.
        // Slots are never freed, and the table does not move while the
        // scheduler is in use.
        unsafe { self.port.switch(prev_ctx, next_ctx) };
    }
}
