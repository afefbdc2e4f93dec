//! # Task Factory
//!
//! Creates tasks: claims a table slot, carves a stack out of the arena and
//! seeds a context that resumes at the port's trampoline. The trampoline
//! calls `schedule_tail` on first activation to collect the entry and
//! argument.

use crate::arch::Port;
use crate::error::SpawnError;
use crate::scheduler::Scheduler;
use crate::task::{TaskConfig, TaskControlBlock, TaskEntry, BOOTSTRAP_PRIORITY};

impl<P: Port, const N: usize> Scheduler<P, N> {
    /// Create a task running `entry(arg)` with the current task's priority
    /// and the default stack size.
    pub fn spawn(&mut self, entry: TaskEntry, arg: usize) -> Result<usize, SpawnError> {
        let priority = self.current_task().map_or(BOOTSTRAP_PRIORITY, |tcb| tcb.priority);
        self.spawn_with(entry, arg, TaskConfig::new(priority))
    }

    /// Create a task running `entry(arg)` as described by `config`.
    ///
    /// The task starts Running with `counter = priority` and first runs
    /// whenever selection picks it. On failure nothing is consumed: a full
    /// table is detected before the arena is touched.
    pub fn spawn_with(&mut self, entry: TaskEntry, arg: usize, config: TaskConfig) -> Result<usize, SpawnError> {
        self.without_preemption(|sched| sched.spawn_locked(entry, arg, config))
    }

    fn spawn_locked(&mut self, entry: TaskEntry, arg: usize, config: TaskConfig) -> Result<usize, SpawnError> {
        if self.table.is_full() {
            log::warn!("spawn refused: all {} slots taken", N);
            return Err(SpawnError::Full);
        }
        let Some(stack) = self.stacks.alloc(config.stack_size) else {
            log::warn!(
                "spawn refused: {} stack bytes requested, {} left",
                config.stack_size,
                self.stacks.remaining()
            );
            return Err(SpawnError::OutOfMemory);
        };

        let (base, top) = (stack.base(), stack.top());
        let tcb = TaskControlBlock::new(config, stack, entry, arg, self.port.trampoline());
        let id = self.table.register(tcb)?;
        log::info!(
            "task {} created: priority {}, stack {:#x}..{:#x}",
            id,
            config.priority,
            base,
            top
        );
        Ok(id)
    }

    /// First-activation hook, called by the trampoline of a fresh task.
    ///
    /// Closes the scheduling pass that switched to this task, which never
    /// returns to its opener, and enables interrupts. Returns the entry
    /// and argument the first time it runs for a task, `None` afterwards.
    pub fn schedule_tail(&mut self) -> Option<(TaskEntry, usize)> {
        self.preempt_count = self.preempt_count.saturating_sub(1);
        let current = self.current;
        let first = self.table.get_mut(current).and_then(TaskControlBlock::take_entry);
        self.port.restore_interrupts(true);
        first
    }
}
