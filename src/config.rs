//! # Configuration
//!
//! Compile-time constants governing the task core. All resources are
//! sized here. Nothing is allocated or freed at runtime.

/// Task table capacity, including the bootstrap task in slot 0.
/// Also the default for the `N` const parameter of `TaskTable` and
/// `Scheduler`.
pub const MAX_TASKS: usize = 8;

/// Default per-task stack size in bytes, used when a `TaskConfig` does not
/// name one. Stack overflow is not detected, so size for the deepest call
/// chain plus the exception frame a tick pushes onto it.
pub const STACK_SIZE: usize = 1024;

/// Bytes reserved for spawned task stacks. The bootstrap task runs on the
/// boot stack and takes nothing from here.
pub const STACK_ARENA_SIZE: usize = (MAX_TASKS - 1) * STACK_SIZE;

/// Alignment of every carved stack and of every initial stack pointer
/// (AAPCS requires 8).
pub const STACK_ALIGN: usize = 8;

/// Value the shared wait countdown is reset to, in ticks. Arming happens
/// when a task parks itself in `Wait`, and again after every wake cascade.
pub const WAIT_TICKS: u32 = 5;

/// Priority of the bootstrap task. Tasks spawned with `spawn` inherit the
/// priority of their creator, so this is also the default for them.
pub const DEFAULT_PRIORITY: u32 = 1;

/// SysTick frequency in Hz. One `timer_tick` per period.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Value loaded into SysTick's 24-bit reload register: the counter runs
/// from here down to zero once per tick.
pub const SYSTICK_RELOAD: u32 = SYSTEM_CLOCK_HZ / TICK_HZ - 1;

const _: () = assert!(SYSTICK_RELOAD <= 0x00FF_FFFF, "tick period does not fit SysTick");
