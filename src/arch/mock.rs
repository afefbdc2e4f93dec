//! Host-side port for unit tests. Nothing executes on a switch: the port
//! keeps a simulated live register file, moves contexts the way the real
//! routine would, and records each switch.

use std::boxed::Box;
use std::vec;
use std::vec::Vec;

use super::Port;
use crate::context::Context;
use crate::scheduler::Scheduler;
use crate::stack::StackArena;
use crate::task::TaskState;

/// Resume address the mock hands to spawned tasks.
pub const TRAMPOLINE: usize = 0x0800_1235;

#[derive(Debug)]
pub struct RecordingPort {
    /// Simulated register file of whatever task is executing.
    pub live: Context,
    /// `(prev, next)` context addresses, one per switch.
    pub switches: Vec<(*const Context, *const Context)>,
    pub interrupts_enabled: bool,
    /// Number of `disable_interrupts` calls.
    pub masks: usize,
    /// Number of `wait_for_interrupt` calls.
    pub waits: usize,
    /// `(n, state)`: during switch number `n`, counting from zero, write
    /// `Wait` through `state`. Stands in for the resumed task parking a
    /// task before it hands the CPU back.
    pub park_on_switch: Option<(usize, *mut TaskState)>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self {
            live: Context::zeroed(),
            switches: Vec::new(),
            interrupts_enabled: true,
            masks: 0,
            waits: 0,
            park_on_switch: None,
        }
    }
}

impl Port for RecordingPort {
    fn trampoline(&self) -> usize {
        TRAMPOLINE
    }

    unsafe fn switch(&mut self, prev: *mut Context, next: *const Context) {
        // SAFETY: the caller guarantees both pointers are valid and distinct.
        unsafe {
            *prev = self.live;
            self.live = *next;
        }
        self.switches.push((prev as *const Context, next));

        if let Some((index, state)) = self.park_on_switch {
            if self.switches.len() == index + 1 {
                self.park_on_switch = None;
                // SAFETY: the test that installed `state` keeps the task
                // table alive and in place for the whole switch.
                unsafe { *state = TaskState::Wait }
            }
        }
    }

    fn disable_interrupts(&mut self) -> bool {
        self.masks += 1;
        core::mem::replace(&mut self.interrupts_enabled, false)
    }

    fn restore_interrupts(&mut self, was_enabled: bool) {
        if was_enabled {
            self.interrupts_enabled = true;
        }
    }

    fn wait_for_interrupt(&mut self) {
        self.waits += 1;
    }
}

/// A leaked, 8-byte aligned arena of `len` bytes.
pub fn arena(len: usize) -> StackArena {
    let words: &'static mut [u64] = Box::leak(vec![0u64; len.div_ceil(8)].into_boxed_slice());
    // SAFETY: the u64 buffer is at least `len` bytes and leaked, so it
    // lives forever and nothing else references it.
    let bytes = unsafe { core::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), len) };
    StackArena::new(bytes)
}

/// Recorded switches translated to `(from_slot, to_slot)`.
pub fn trace<const N: usize>(sched: &Scheduler<RecordingPort, N>) -> Vec<(usize, usize)> {
    let slot_of = |ptr: *const Context| {
        (0..N)
            .find(|&id| sched.task(id).is_some_and(|tcb| core::ptr::eq(&tcb.context, ptr)))
            .expect("switch recorded for a context outside the table")
    };
    sched
        .port()
        .switches
        .iter()
        .map(|&(prev, next)| (slot_of(prev), slot_of(next)))
        .collect()
}
