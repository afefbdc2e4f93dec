//! # Timer Tick
//!
//! Entry point for the periodic timer interrupt. A single countdown,
//! shared by all tasks, decides when parked tasks are reconsidered. When it
//! expires, every task in `Wait` is woken in slot order. Each wakeup
//! switches to the woken task, marks it Running and reschedules once, so
//! a tick that wakes `k` tasks runs `k` scheduling passes.
//!
//! Slots are visited one after another and each one's state is read when
//! the cascade reaches it. Execution resumes inside every woken task before
//! the next slot is read, so a higher slot that parks itself meanwhile is
//! still woken on the same tick. Stack use does not grow with the number
//! of waiting tasks.

use crate::arch::Port;
use crate::config::WAIT_TICKS;
use crate::scheduler::Scheduler;
use crate::task::TaskState;

/// What a call to `timer_tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Countdown decremented, still this many ticks to go.
    Counting(u32),
    /// Countdown expired and was re-armed; this many tasks were woken.
    Woke(usize),
    /// A scheduling pass was already open. Nothing was touched.
    Deferred,
}

impl<P: Port, const N: usize> Scheduler<P, N> {
    /// Advance the shared wait countdown by one tick, waking parked tasks
    /// when it expires.
    ///
    /// Safe to call from interrupt context. A tick that lands inside an
    /// open scheduling pass does not reenter it and is dropped.
    pub fn timer_tick(&mut self) -> Tick {
        if self.preempt_count > 0 {
            log::trace!("tick deferred, pass open at depth {}", self.preempt_count);
            return Tick::Deferred;
        }
        self.without_preemption(Self::tick)
    }

    fn tick(&mut self) -> Tick {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            log::trace!("timer countdown: {}", self.countdown);
            return Tick::Counting(self.countdown);
        }

        self.countdown = WAIT_TICKS;
        let mut woken = 0;
        for slot in 0..N {
            if self.table.get(slot).is_some_and(|tcb| tcb.state == TaskState::Wait) {
                self.wake(slot);
                woken += 1;
            }
        }
        Tick::Woke(woken)
    }

    fn wake(&mut self, slot: usize) {
        self.switch_to(slot);
        if let Some(tcb) = self.table.get_mut(slot) {
            tcb.state = TaskState::Running;
        }
        log::debug!("task {} woken", slot);
        self.reschedule();
    }
}
