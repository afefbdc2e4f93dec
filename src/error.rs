//! Errors reported to `spawn` callers.

use core::fmt;

/// Why a task could not be created. Neither kind is fatal: the caller must
/// not expect the task to run, and every existing task is unaffected.
#[must_use = "a failed spawn means the task will never run"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Every slot of the task table is occupied.
    Full,
    /// The stack arena cannot hold another stack of the requested size.
    OutOfMemory,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("task table is full"),
            Self::OutOfMemory => f.write_str("stack arena exhausted"),
        }
    }
}
