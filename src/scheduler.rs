//! # Scheduler
//!
//! Priority-decay round-robin selection. Every task carries a `counter` of
//! credit. The runnable task with the most credit runs next; yielding gives
//! up all credit for the round. When no runnable task has credit left,
//! every task is aged (`counter / 2 + priority`) and selection repeats.
//!
//! ## Selection
//!
//! 1. Scan occupied slots in index order, keeping the Running task with
//!    the largest counter. Only a strictly greater counter replaces the
//!    best so far, so ties go to the lowest slot.
//! 2. A best candidate with credit left wins.
//! 3. With credit exhausted everywhere, age every occupied slot and scan
//!    again.
//! 4. With no Running task at all, slot 0 is chosen whether or not it is
//!    runnable. Keeping an always-runnable idle task means this fallback
//!    never picks a parked task.
//!
//! Aging cannot loop forever: priorities are positive, so one pass gives
//! every runnable task credit.
//!
//! ## Exclusion
//!
//! All state lives in one `Scheduler` value. Public entry points run inside
//! a preemption guard that masks interrupts through the `Port` and bumps
//! `preempt_count`. A tick that finds the count raised does not reenter
//! (see `timer`). A pass that switches away is closed by the task that
//! resumes: by its own guard, or by `schedule_tail` on first activation.

use crate::arch::Port;
use crate::config::{MAX_TASKS, WAIT_TICKS};
use crate::stack::StackArena;
use crate::table::TaskTable;
use crate::task::{TaskControlBlock, TaskState};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The scheduling state: task table, stack arena, current slot, shared wait
/// countdown and the hardware port.
pub struct Scheduler<P: Port, const N: usize = MAX_TASKS> {
    pub(crate) table: TaskTable<N>,
    pub(crate) stacks: StackArena,
    pub(crate) port: P,

    /// Slot of the executing task.
    pub(crate) current: usize,

    /// Ticks left before waiting tasks are woken.
    pub(crate) countdown: u32,

    /// Depth of open scheduling passes.
    pub(crate) preempt_count: u32,
}

impl<P: Port, const N: usize> Scheduler<P, N> {
    const HAS_BOOTSTRAP_SLOT: () = assert!(N > 0, "task table needs room for the bootstrap task");

    /// Create the scheduler with the caller registered as the bootstrap
    /// task in slot 0. The caller keeps running and is current.
    pub fn new(port: P, stacks: StackArena) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_BOOTSTRAP_SLOT;

        let mut table = TaskTable::new();
        let registered = table.register(TaskControlBlock::bootstrap());
        debug_assert_eq!(registered, Ok(0));
        log::info!("scheduler up: {} slots, {} stack bytes", N, stacks.remaining());

        Self {
            table,
            stacks,
            port,
            current: 0,
            countdown: 0,
            preempt_count: 0,
        }
    }

    /// Slot of the executing task.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_task(&self) -> Option<&TaskControlBlock> {
        self.table.get(self.current)
    }

    pub fn task(&self, id: usize) -> Option<&TaskControlBlock> {
        self.table.get(id)
    }

    /// Occupied slots, bootstrap included.
    pub fn task_count(&self) -> usize {
        self.table.len()
    }

    pub fn tasks(&self) -> &TaskTable<N> {
        &self.table
    }

    /// Shared wait countdown.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Depth of open scheduling passes.
    pub fn preempt_count(&self) -> u32 {
        self.preempt_count
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Run `f` as one scheduling pass: interrupts masked, count raised.
    pub(crate) fn without_preemption<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_enabled = self.port.disable_interrupts();
        self.preempt_count += 1;
        let result = f(self);
        debug_assert!(self.preempt_count > 0);
        self.preempt_count = self.preempt_count.saturating_sub(1);
        self.port.restore_interrupts(was_enabled);
        result
    }

    /// Give up the rest of the current task's turn.
    ///
    /// The current counter drops to zero, putting the task behind every
    /// runnable task with credit, and a new task is selected.
    pub fn yield_current(&mut self) {
        self.without_preemption(Self::reschedule);
    }

    /// Select the next task and switch to it.
    pub fn select_and_switch(&mut self) {
        self.without_preemption(Self::pick_and_switch);
    }

    /// One turn of the bootstrap task's fallback loop: sleep until an
    /// interrupt is pending, then yield.
    pub fn idle(&mut self) {
        self.port.wait_for_interrupt();
        self.yield_current();
    }

    /// Change the runnability of the current task. Parking in `Wait` also
    /// re-arms the shared countdown; the task is not switched out until it
    /// yields.
    pub fn set_state(&mut self, state: TaskState) {
        self.without_preemption(|sched| {
            let current = sched.current;
            if let Some(tcb) = sched.table.get_mut(current) {
                tcb.state = state;
            }
            if state == TaskState::Wait {
                sched.countdown = WAIT_TICKS;
            }
            log::debug!("task {} changed to {:?}", current, state);
        });
    }

    /// Choose the slot to run next. Ages the table as often as selection
    /// needs; see the module docs for the rules.
    pub fn select_next(&mut self) -> usize {
        loop {
            match self.best_candidate() {
                None => return 0,
                Some((id, counter)) if counter > 0 => return id,
                Some(_) => self.age_all(),
            }
        }
    }

    /// `yield_current` without the guard.
    pub(crate) fn reschedule(&mut self) {
        let current = self.current;
        if let Some(tcb) = self.table.get_mut(current) {
            tcb.counter = 0;
        }
        self.pick_and_switch();
    }

    fn pick_and_switch(&mut self) {
        let next = self.select_next();
        self.switch_to(next);
    }

    /// Runnable task with the largest counter, lowest slot on ties.
    fn best_candidate(&self) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for tcb in self.table.iter().filter(|tcb| tcb.is_runnable()) {
            if best.map_or(true, |(_, counter)| tcb.counter > counter) {
                best = Some((tcb.id, tcb.counter));
            }
        }
        best
    }

    fn age_all(&mut self) {
        self.table.for_each_occupied_mut(TaskControlBlock::age);
        log::trace!("aged {} tasks", self.table.len());
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use core::num::NonZeroU32;

    use super::*;
    use crate::arch::mock::{self, RecordingPort};
    use crate::config::STACK_SIZE;
    use crate::task::TaskConfig;

    fn nop(_: usize) {}

    fn config(priority: u32) -> TaskConfig {
        TaskConfig::new(NonZeroU32::new(priority).unwrap())
    }

    fn scheduler<const N: usize>() -> Scheduler<RecordingPort, N> {
        Scheduler::new(RecordingPort::new(), mock::arena(N * STACK_SIZE))
    }

    fn counters<const N: usize>(sched: &Scheduler<RecordingPort, N>) -> Vec<u32> {
        sched.tasks().iter().map(|tcb| tcb.counter).collect()
    }

    #[test]
    fn test_new_registers_bootstrap() {
        let sched: Scheduler<RecordingPort, 4> = scheduler();
        assert_eq!(sched.task_count(), 1);
        assert_eq!(sched.current(), 0);
        assert_eq!(sched.countdown(), 0);
        let boot = sched.current_task().unwrap();
        assert_eq!(boot.state, TaskState::Running);
        assert_eq!(boot.counter, 0);
    }

    #[test]
    fn test_yield_zeroes_counter_and_lands_on_runnable() {
        let mut sched: Scheduler<RecordingPort, 4> = scheduler();
        let a = sched.spawn_with(nop, 0, config(3)).unwrap();
        sched.spawn_with(nop, 0, config(2)).unwrap();

        sched.switch_to(a);
        sched.yield_current();

        assert_eq!(sched.task(a).unwrap().counter, 0);
        assert_ne!(sched.current(), a);
        assert_eq!(sched.current_task().unwrap().state, TaskState::Running);
    }

    #[test]
    fn test_highest_counter_wins_ties_to_lowest_slot() {
        let mut sched: Scheduler<RecordingPort, 4> = scheduler();
        sched.spawn_with(nop, 0, config(2)).unwrap();
        sched.spawn_with(nop, 0, config(5)).unwrap();
        sched.spawn_with(nop, 0, config(5)).unwrap();

        assert_eq!(sched.select_next(), 2);
        // Choosing does not consume credit.
        assert_eq!(counters(&sched), vec![0, 2, 5, 5]);
    }

    #[test]
    fn test_aging_from_zero() {
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        sched.spawn_with(nop, 0, config(2)).unwrap();
        sched.spawn_with(nop, 0, config(3)).unwrap();
        sched.set_state(TaskState::Wait);
        sched.table.for_each_occupied_mut(|tcb| tcb.counter = 0);

        assert_eq!(sched.select_next(), 2);
        // 0/2+1 for the parked bootstrap, 0/2+2, 0/2+3.
        assert_eq!(counters(&sched), vec![1, 2, 3]);
    }

    #[test]
    fn test_aging_keeps_half_of_leftover_credit() {
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        sched.spawn_with(nop, 0, config(4)).unwrap();
        sched.spawn_with(nop, 0, config(1)).unwrap();
        sched.table.get_mut(1).unwrap().state = TaskState::Wait;
        sched.table.get_mut(0).unwrap().counter = 0;
        sched.table.get_mut(2).unwrap().counter = 0;

        // Slot 1 is parked with 4 credits and ages too.
        assert_eq!(sched.select_next(), 0);
        assert_eq!(counters(&sched), vec![1, 6, 1]);
    }

    #[test]
    fn test_aging_huge_priority_saturates() {
        let mut sched: Scheduler<RecordingPort, 2> = scheduler();
        let big = sched.spawn_with(nop, 0, config(3_000_000_000)).unwrap();
        sched.table.get_mut(big).unwrap().state = TaskState::Wait;

        // Only the bootstrap is runnable, with no credit, so the parked
        // task's full counter goes through an aging pass.
        assert_eq!(sched.select_next(), 0);
        assert_eq!(counters(&sched), vec![1, u32::MAX]);
    }

    #[test]
    fn test_no_runnable_task_falls_back_to_slot_zero() {
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        let a = sched.spawn_with(nop, 0, config(2)).unwrap();
        let b = sched.spawn_with(nop, 0, config(3)).unwrap();
        for id in [0, a, b] {
            sched.table.get_mut(id).unwrap().state = TaskState::Wait;
        }
        let before = counters(&sched);

        assert_eq!(sched.select_next(), 0);
        // Fallback is immediate: no aging pass runs.
        assert_eq!(counters(&sched), before);

        sched.switch_to(b);
        sched.yield_current();
        assert_eq!(sched.current(), 0);
        assert_eq!(sched.current_task().unwrap().state, TaskState::Wait);
    }

    #[test]
    fn test_round_robin_alternates_equal_priorities() {
        const P: u32 = 3;
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        let a = sched.spawn_with(nop, 0, config(P)).unwrap();
        let b = sched.spawn_with(nop, 0, config(P)).unwrap();
        // Bootstrap parks so only the two peers compete.
        sched.set_state(TaskState::Wait);

        let mut order = Vec::new();
        let mut turns = [0usize; 3];
        for _ in 0..200 {
            sched.yield_current();
            let current = sched.current();
            order.push(current);
            turns[current] += 1;

            // Whoever runs right after an aging pass found both peers at P.
            let other = if current == a { b } else { a };
            if sched.task(other).unwrap().counter == P && order.len() > 1 {
                assert_eq!(sched.task(current).unwrap().counter, P);
            }
        }

        assert!(order.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(order[0], a);
        assert!(turns[a].abs_diff(turns[b]) <= 1);
        assert_eq!(turns[0], 0);
    }

    #[test]
    fn test_full_aging_cycle_restores_priority() {
        const P: u32 = 4;
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        let a = sched.spawn_with(nop, 0, config(P)).unwrap();
        let b = sched.spawn_with(nop, 0, config(P)).unwrap();
        sched.set_state(TaskState::Wait);

        // Into a, then into b, then both spent: the third yield ages.
        sched.yield_current();
        sched.yield_current();
        assert_eq!(sched.current(), b);
        sched.yield_current();

        assert_eq!(sched.current(), a);
        assert_eq!(sched.task(a).unwrap().counter, P);
        assert_eq!(sched.task(b).unwrap().counter, P);
    }

    #[test]
    fn test_set_state_wait_arms_countdown() {
        let mut sched: Scheduler<RecordingPort, 2> = scheduler();
        sched.set_state(TaskState::Wait);
        assert_eq!(sched.countdown(), WAIT_TICKS);
        assert_eq!(sched.current_task().unwrap().state, TaskState::Wait);

        sched.countdown = 2;
        sched.set_state(TaskState::Running);
        assert_eq!(sched.countdown(), 2);
        assert_eq!(sched.current_task().unwrap().state, TaskState::Running);
    }

    #[test]
    fn test_passes_mask_and_restore_interrupts() {
        let mut sched: Scheduler<RecordingPort, 3> = scheduler();
        sched.spawn(nop, 0).unwrap();
        let masks = sched.port().masks;

        sched.yield_current();
        sched.select_and_switch();
        sched.set_state(TaskState::Running);

        assert_eq!(sched.port().masks, masks + 3);
        assert!(sched.port().interrupts_enabled);
        assert_eq!(sched.preempt_count(), 0);
    }

    #[test]
    fn test_nested_pass_keeps_interrupts_masked() {
        let mut sched: Scheduler<RecordingPort, 2> = scheduler();
        sched.without_preemption(|inner| {
            inner.yield_current();
            assert!(!inner.port().interrupts_enabled);
            assert_eq!(inner.preempt_count(), 1);
        });
        assert!(sched.port().interrupts_enabled);
    }

    #[test]
    fn test_idle_sleeps_then_yields() {
        let mut sched: Scheduler<RecordingPort, 2> = scheduler();
        let a = sched.spawn(nop, 0).unwrap();

        sched.idle();

        assert_eq!(sched.port().waits, 1);
        assert_eq!(mock::trace(&sched), vec![(0, a)]);
        assert!(sched.port().interrupts_enabled);
        assert_eq!(sched.preempt_count(), 0);
    }
}
