//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! the context switch routine, the first-activation trampoline, SysTick
//! configuration and the SysTick handler.
//!
//! ## Stack Model
//!
//! Every task runs in privileged Thread mode on MSP; a switch simply
//! points MSP at another task's stack. There is no PSP split. A tick
//! therefore stacks its exception frame on the interrupted task's stack,
//! and a wakeup switches out of the handler onto the woken task's stack.
//! The handler returns once the interrupted task is selected again. Until
//! then SysTick stays active and cannot fire again.
//!
//! ## Context Switch
//!
//! `rrsched_cpu_switch_to(prev, next)` is an ordinary AAPCS call, so only
//! the callee-saved registers r4-r11, SP and the return address need
//! saving (see `context` for the layout). The return address becomes the
//! resume address; for a fresh task the resume address is the trampoline.
//!
//! The FPU is not saved. Build for `thumbv7em-none-eabi` (soft-float).

use core::arch::global_asm;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m::{interrupt, register};

use super::Port;
use crate::config::SYSTICK_RELOAD;
use crate::context::Context;

// ---------------------------------------------------------------------------
// Context switch and trampoline
// ---------------------------------------------------------------------------

global_asm!(
    ".section .text.rrsched_cpu_switch_to,\"ax\",%progbits",
    ".global rrsched_cpu_switch_to",
    ".type rrsched_cpu_switch_to,%function",
    ".thumb_func",
    "rrsched_cpu_switch_to:",
    // Save into prev (r0)
    "    stmia r0, {{r4-r11}}",
    "    mov r2, sp",
    "    str r2, [r0, #32]",
    "    str lr, [r0, #36]",
    // Restore from next (r1)
    "    ldmia r1, {{r4-r11}}",
    "    ldr r2, [r1, #32]",
    "    mov sp, r2",
    "    ldr r2, [r1, #36]",
    "    bx r2",
    ".size rrsched_cpu_switch_to, . - rrsched_cpu_switch_to",
    "",
    ".section .text.rrsched_task_trampoline,\"ax\",%progbits",
    ".global rrsched_task_trampoline",
    ".type rrsched_task_trampoline,%function",
    ".thumb_func",
    "rrsched_task_trampoline:",
    "    bl {task_start}",
    "    b .",
    ".size rrsched_task_trampoline, . - rrsched_task_trampoline",
    task_start = sym task_start,
);

extern "C" {
    fn rrsched_cpu_switch_to(prev: *mut Context, next: *const Context);
    fn rrsched_task_trampoline();
}

/// First code a spawned task runs after the trampoline.
extern "C" fn task_start() -> ! {
    if let Some((entry, arg)) = crate::kernel::first_activation() {
        entry(arg);
    }
    task_exit()
}

/// Parking loop for tasks whose entry returned. There is no way to exit.
fn task_exit() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// The Cortex-M4 implementation of `Port`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CortexM4;

impl Port for CortexM4 {
    fn trampoline(&self) -> usize {
        rrsched_task_trampoline as usize
    }

    unsafe fn switch(&mut self, prev: *mut Context, next: *const Context) {
        // SAFETY: upheld by the caller, see `Port::switch`.
        unsafe { rrsched_cpu_switch_to(prev, next) }
    }

    fn disable_interrupts(&mut self) -> bool {
        let was_enabled = register::primask::read().is_inactive();
        interrupt::disable();
        was_enabled
    }

    fn restore_interrupts(&mut self, was_enabled: bool) {
        if was_enabled {
            // SAFETY: only re-enables what `disable_interrupts` masked.
            unsafe { interrupt::enable() }
        }
    }

    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Start the periodic tick from the core clock, `TICK_HZ` times a second.
///
/// The counter is stopped while it is reprogrammed, so the first tick lands
/// one full period after this returns.
pub fn configure_systick(syst: &mut SYST) {
    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(SYSTICK_RELOAD);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Put SysTick at the lowest priority so it never preempts application
/// interrupt handlers.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // SAFETY: changing a system handler priority cannot break a priority
    // based critical section here; the core masks with PRIMASK only.
    unsafe { scb.set_priority(SystemHandler::SysTick, 0xFF) }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler: one `timer_tick` per period.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    crate::kernel::timer_tick();
}
