//! # rrsched
//!
//! A minimal preemptible multitasking core for single-core, interrupt
//! driven ARM Cortex-M4 systems.
//!
//! ## Overview
//!
//! A fixed table of tasks shares the CPU under a priority-decay round-robin
//! policy. Every task spends a `counter` of credit; the runnable task with
//! the most credit runs, and once all runnable tasks are spent the whole
//! table is aged (`counter / 2 + priority`). Tasks can park themselves in
//! `Wait`; a countdown driven by the timer tick wakes all of them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init() · spawn() · start() · yield_current() · ...    │
//! ├──────────────┬──────────────┬──────────────┬───────────┤
//! │  Scheduler   │ Task Factory │  Timer Tick  │  Context  │
//! │ scheduler.rs │   spawn.rs   │   timer.rs   │ context.rs│
//! ├──────────────┴──────────────┴──────────────┴───────────┤
//! │     Task Model (task.rs) · Table (table.rs) · Stacks    │
//! ├────────────────────────────────────────────────────────┤
//! │       Port trait (arch) · Cortex-M4 (arch/cortex_m4)    │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size TCB table**: `N` inline slots, never freed
//! - **Stack arena**: `STACK_ARENA_SIZE` bytes carved once per spawn
//! - **No termination**: tasks run forever
//!
//! Everything outside `arch::cortex_m4` and `kernel` is plain Rust
//! and runs under host unit tests against a recording port.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod context;
pub mod error;
pub mod scheduler;
pub mod spawn;
pub mod stack;
pub mod table;
pub mod task;
pub mod timer;

#[cfg(target_arch = "arm")]
pub mod kernel;

pub use error::SpawnError;
pub use scheduler::Scheduler;
pub use task::{TaskConfig, TaskEntry, TaskState};
pub use timer::Tick;
