//! # Kernel
//!
//! The global scheduler instance and the public task API for firmware.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()     ← Scheduler with main() as task 0
//!         ├─► kernel::spawn()    ← Register tasks (×N)
//!         └─► kernel::start()    ← SysTick on, task 0 idles forever
//! ```

use core::ptr::addr_of_mut;

use crate::arch::cortex_m4::{self, CortexM4};
use crate::config::{MAX_TASKS, STACK_ALIGN, STACK_ARENA_SIZE};
use crate::error::SpawnError;
use crate::scheduler::Scheduler;
use crate::stack::StackArena;
use crate::task::{TaskConfig, TaskEntry, TaskState};
use crate::timer::Tick;

type KernelScheduler = Scheduler<CortexM4, MAX_TASKS>;

#[repr(C, align(8))]
struct Arena([u8; STACK_ARENA_SIZE]);

const _: () = assert!(core::mem::align_of::<Arena>() >= STACK_ALIGN);

/// Backing storage for every spawned task's stack.
static mut STACK_ARENA: Arena = Arena([0; STACK_ARENA_SIZE]);

/// Global scheduler instance.
///
/// # Safety
/// Filled once by `init()`. Afterwards it is reached from thread code and
/// from SysTick; each `Scheduler` entry point masks interrupts for its
/// pass, which serializes the two.
static mut SCHEDULER: Option<KernelScheduler> = None;

fn scheduler() -> &'static mut KernelScheduler {
    // SAFETY: the first call happens from `init()` inside a critical
    // section, before SysTick is enabled. The arena is handed out exactly
    // once, inside the `get_or_insert_with` closure.
    unsafe {
        (*addr_of_mut!(SCHEDULER)).get_or_insert_with(|| {
            let region: &'static mut [u8] = &mut (*addr_of_mut!(STACK_ARENA)).0;
            Scheduler::new(CortexM4, StackArena::new(region))
        })
    }
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Create the scheduler. The caller becomes task 0.
///
/// Call from `main()` before anything else in this module. Later calls
/// do nothing.
pub fn init() {
    cortex_m::interrupt::free(|_cs| {
        scheduler();
    });
}

/// Create a task running `entry(arg)` with the caller's priority.
///
/// # Example
/// ```ignore
/// kernel::spawn(blink, LED_PIN).expect("blink not spawned");
/// ```
pub fn spawn(entry: TaskEntry, arg: usize) -> Result<usize, SpawnError> {
    scheduler().spawn(entry, arg)
}

/// Create a task with an explicit priority and stack size.
pub fn spawn_with(entry: TaskEntry, arg: usize, config: TaskConfig) -> Result<usize, SpawnError> {
    scheduler().spawn_with(entry, arg, config)
}

/// Start ticking and turn the caller (task 0) into the fallback loop,
/// which sleeps until the next interrupt before every yield.
/// **Does not return.**
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);
    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    log::info!("starting with {} tasks", scheduler().task_count());

    loop {
        scheduler().idle();
    }
}

/// Give up the rest of the current turn.
pub fn yield_current() {
    scheduler().yield_current();
}

/// Change the current task's runnability. `Wait` parks it until the next
/// wake cascade, once it yields.
pub fn set_state(state: TaskState) {
    scheduler().set_state(state);
}

/// One timer period elapsed. Called from the SysTick handler.
pub fn timer_tick() -> Tick {
    scheduler().timer_tick()
}

/// Called once by each fresh task from the trampoline.
pub(crate) fn first_activation() -> Option<(TaskEntry, usize)> {
    scheduler().schedule_tail()
}
