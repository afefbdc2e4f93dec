//! # Demo Firmware
//!
//! Three tasks plus the bootstrap loop:
//!
//! | Task | Priority | Behavior |
//! |------|----------|----------|
//! | `worker` ×2 | inherited (1) | Busy work, then yields |
//! | `sleeper` | 2 | Busy work, then parks in `Wait` until the countdown expires |
//! | bootstrap (`main`) | 1 | Yields forever, so slot 0 is always runnable |

#![no_std]
#![no_main]

use core::num::NonZeroU32;

use cortex_m_rt::entry;
use panic_halt as _;

use rrsched::kernel;
use rrsched::{TaskConfig, TaskState};

fn spin(rounds: usize) {
    let mut work: u32 = 0;
    for _ in 0..rounds {
        work = work.wrapping_add(1);
        core::hint::black_box(work);
    }
}

/// Busy work scaled by `arg`, then a voluntary yield.
fn worker(arg: usize) {
    loop {
        spin(arg * 1000);
        kernel::yield_current();
    }
}

/// Parks itself after every burst. The timer wakes it again.
fn sleeper(_arg: usize) {
    loop {
        spin(2000);
        kernel::set_state(TaskState::Wait);
        kernel::yield_current();
    }
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init();

    kernel::spawn(worker, 3).expect("failed to spawn worker 1");
    kernel::spawn(worker, 5).expect("failed to spawn worker 2");

    let sleeper_priority = NonZeroU32::new(2).unwrap();
    kernel::spawn_with(sleeper, 0, TaskConfig::new(sleeper_priority).with_stack_size(512))
        .expect("failed to spawn sleeper");

    kernel::start(cp)
}
