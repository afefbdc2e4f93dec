//! # Task Control Block
//!
//! Defines the task model. A task is a forever-running function with an
//! owned stack, a saved machine context, and two pieces of scheduling
//! credit: a fixed `priority` and a consumable `counter`.

use core::num::NonZeroU32;

use crate::config::{DEFAULT_PRIORITY, STACK_SIZE};
use crate::context::Context;
use crate::stack::Stack;

/// Priority of the bootstrap task, checked positive at compile time.
pub const BOOTSTRAP_PRIORITY: NonZeroU32 = match NonZeroU32::new(DEFAULT_PRIORITY) {
    Some(priority) => priority,
    None => panic!("DEFAULT_PRIORITY must be positive"),
};

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Runnability of a task.
///
/// ```text
///   ┌──────────┐   set_state(Wait)   ┌──────────┐
///   │ Running  │ ──────────────────► │   Wait   │
///   └──────────┘                     └──────────┘
///        ▲                                │
///        │      timer_tick() cascade      │
///        └────────────────────────────────┘
/// ```
///
/// There is no terminal state: tasks never exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Eligible for selection. Exactly one Running task executes at a time;
    /// the rest are waiting for their turn.
    Running,
    /// Parked until the shared wait countdown expires.
    Wait,
}

/// Task entry point. Receives the opaque argument given to `spawn`.
///
/// Entries are expected to loop forever. One that returns parks its task
/// in a low-power loop.
pub type TaskEntry = fn(usize);

// ---------------------------------------------------------------------------
// Task configuration (immutable after creation)
// ---------------------------------------------------------------------------

/// Creation parameters for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    /// Credit added to the counter on every aging pass.
    pub priority: NonZeroU32,
    /// Stack size in bytes, rounded up to `STACK_ALIGN` when carved.
    pub stack_size: usize,
}

impl TaskConfig {
    /// Configuration with the given priority and the default stack size.
    pub const fn new(priority: NonZeroU32) -> Self {
        Self {
            priority,
            stack_size: STACK_SIZE,
        }
    }

    /// Replace the stack size.
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB), the per-task state record.
///
/// TCBs live inline in the `TaskTable`. They are created once and then
/// mutated in place; nothing ever destroys or recycles one.
#[derive(Debug)]
pub struct TaskControlBlock {
    /// Slot index in the task table.
    pub id: usize,

    /// Runnability.
    pub state: TaskState,

    /// Dynamic credit. Zeroed on yield, restored by aging.
    pub counter: u32,

    /// Fixed credit added back during aging.
    pub priority: NonZeroU32,

    /// Saved machine state. Stale while this task is the one executing.
    pub context: Context,

    /// Owned stack region. `None` for the bootstrap task, which keeps the
    /// boot stack it was started on.
    pub stack: Option<Stack>,

    /// Entry point, taken by the trampoline on first activation.
    pub entry: Option<TaskEntry>,

    /// Argument handed to `entry`.
    pub arg: usize,
}

impl TaskControlBlock {
    /// The task that is already executing when the scheduler is created.
    ///
    /// It enters the running machine state directly, so its context is only
    /// filled in by its first switch away, and it has no entry to run.
    pub const fn bootstrap() -> Self {
        Self {
            id: 0,
            state: TaskState::Running,
            counter: 0,
            priority: BOOTSTRAP_PRIORITY,
            context: Context::zeroed(),
            stack: None,
            entry: None,
            arg: 0,
        }
    }

    /// A fresh task whose first activation resumes at `resume` on top of
    /// `stack`. Starts Running with a full counter.
    pub fn new(config: TaskConfig, stack: Stack, entry: TaskEntry, arg: usize, resume: usize) -> Self {
        Self {
            id: 0,
            state: TaskState::Running,
            counter: config.priority.get(),
            priority: config.priority,
            context: Context::seeded(stack.top(), resume),
            stack: Some(stack),
            entry: Some(entry),
            arg,
        }
    }

    /// Whether selection may pick this task.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Running
    }

    /// One aging step: halve the leftover credit and add the priority.
    /// Saturates at `u32::MAX` for priorities above `u32::MAX / 2`.
    #[inline]
    pub fn age(&mut self) {
        self.counter = (self.counter / 2).saturating_add(self.priority.get());
    }

    /// Hand out the entry point and argument. Only the first call returns
    /// them.
    pub fn take_entry(&mut self) -> Option<(TaskEntry, usize)> {
        self.entry.take().map(|entry| (entry, self.arg))
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
