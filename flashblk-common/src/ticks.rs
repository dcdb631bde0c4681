// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Millisecond tick counter.
//!
//! The counter is written only by the timer interrupt and read by tasks.
//! Both sides use single-word atomic accesses, which the compiler may not
//! cache across loop iterations. The increment is a load followed by a
//! store since rv32i has no atomic read-modify-write.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

static SYSTEM_TICKS: AtomicU32 = AtomicU32::new(0);

/// Source of a monotonic millisecond count.
pub trait TickSource {
    fn now_ms(&self) -> u32;
}

/// The process-wide tick counter driven by the timer interrupt.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTicks;

impl SystemTicks {
    /// Advance the counter by one millisecond. Call from the timer ISR only.
    pub fn tick() {
        let now = SYSTEM_TICKS.load(Ordering::Relaxed);
        SYSTEM_TICKS.store(now.wrapping_add(1), Ordering::Release);
    }

    /// Current tick count.
    pub fn now() -> u32 {
        SYSTEM_TICKS.load(Ordering::Acquire)
    }
}

impl TickSource for SystemTicks {
    fn now_ms(&self) -> u32 {
        SystemTicks::now()
    }
}

/// Milliseconds elapsed from `start` to `now`, across counter wrap.
pub fn elapsed_since(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// True if `now` is strictly later than `deadline`, across counter wrap.
pub fn is_past(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}

/// Clock that advances by a fixed step every time it is read.
///
/// Used by host replays and tests, where nothing drives a timer interrupt
/// but busy-wait timeouts must still expire.
#[derive(Debug, Default)]
pub struct StepClock {
    now: Cell<u32>,
    step: u32,
}

impl StepClock {
    pub fn new(start: u32, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    /// Current value without advancing.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }
}

impl TickSource for StepClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}
