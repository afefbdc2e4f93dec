//! # Task Table
//!
//! Fixed-capacity registry of TCBs. Slots are claimed in index order and
//! never released, so the occupied slots are always `0..len()`.

use crate::context::Context;
use crate::error::SpawnError;
use crate::task::TaskControlBlock;

/// `N` inline slots, each empty or holding one TCB.
pub struct TaskTable<const N: usize> {
    slots: [Option<TaskControlBlock>; N],
    count: usize,
}

impl<const N: usize> TaskTable<N> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            count: 0,
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots. Never decreases.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= N
    }

    /// Claim the next empty slot for `tcb`, stamping its `id`.
    pub fn register(&mut self, mut tcb: TaskControlBlock) -> Result<usize, SpawnError> {
        let id = self.count;
        let slot = self.slots.get_mut(id).ok_or(SpawnError::Full)?;
        tcb.id = id;
        *slot = Some(tcb);
        self.count += 1;
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Option<&TaskControlBlock> {
        self.slots.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut TaskControlBlock> {
        self.slots.get_mut(id)?.as_mut()
    }

    /// Occupied TCBs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskControlBlock> {
        self.slots.iter().flatten()
    }

    pub fn for_each_occupied(&self, f: impl FnMut(&TaskControlBlock)) {
        self.iter().for_each(f);
    }

    pub fn for_each_occupied_mut(&mut self, f: impl FnMut(&mut TaskControlBlock)) {
        self.slots.iter_mut().flatten().for_each(f);
    }

    /// Raw pointers to the contexts of two distinct occupied slots, as
    /// consumed by `Port::switch`.
    ///
    /// Both pointers come from one `split_at_mut` of the slot array, so
    /// neither borrow invalidates the other.
    pub(crate) fn context_pair(&mut self, prev: usize, next: usize) -> Option<(*mut Context, *const Context)> {
        if prev == next || prev.max(next) >= N {
            return None;
        }
        let (low, high) = self.slots.split_at_mut(prev.max(next));
        let (low, high) = (&mut low[prev.min(next)], &mut high[0]);
        let (prev_slot, next_slot) = if prev < next { (low, high) } else { (high, low) };

        let prev_ctx: *mut Context = &mut prev_slot.as_mut()?.context;
        let next_ctx: *const Context = &next_slot.as_ref()?.context;
        Some((prev_ctx, next_ctx))
    }
}

impl<const N: usize> Default for TaskTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
