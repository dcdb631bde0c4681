// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Timer setup and the machine-external interrupt router.
//!
//! VexRiscv exposes LiteX interrupt lines through two custom CSRs: a mask
//! register and a pending register. All lines arrive on the single
//! machine-external interrupt, which this module demultiplexes.

use core::arch::asm;

use flashblk_common::ticks::SystemTicks;

use crate::csr::{self, timer0};
use crate::usb;

pub const TIMER0_INTERRUPT: u32 = 2;
pub const USB_INTERRUPT: u32 = 3;

fn mask() -> u32 {
    let value: u32;
    // SAFETY: reads the VexRiscv IRQ mask CSR, no side effects.
    unsafe { asm!("csrr {0}, 0xBC0", out(reg) value) };
    value
}

fn set_mask(value: u32) {
    // SAFETY: writes the VexRiscv IRQ mask CSR.
    unsafe { asm!("csrw 0xBC0, {0}", in(reg) value) };
}

fn pending() -> u32 {
    let value: u32;
    // SAFETY: reads the VexRiscv IRQ pending CSR, no side effects.
    unsafe { asm!("csrr {0}, 0xFC0", out(reg) value) };
    value
}

/// Unmask one LiteX interrupt line.
pub fn unmask(line: u32) {
    set_mask(mask() | (1 << line));
}

/// Mask every line, then enable machine-external interrupts globally.
pub fn init() {
    set_mask(0);
    // SAFETY: the handler below is ready before any line is unmasked.
    unsafe {
        riscv::register::mie::set_mext();
        riscv::interrupt::enable();
    }
}

/// Start timer0 as a 1 kHz periodic tick and unmask it.
pub fn timer_init(clock_hz: u32) {
    let reload = clock_hz / 1000;

    csr::write(timer0::EN, 0);
    csr::write(timer0::RELOAD, reload);
    csr::write(timer0::LOAD, reload);
    csr::write(timer0::EN, 1);
    csr::write(timer0::EV_ENABLE, 1);
    csr::write(timer0::EV_PENDING, 1);

    unmask(TIMER0_INTERRUPT);
}

#[unsafe(no_mangle)]
extern "C" fn MachineExternal() {
    let irqs = pending() & mask();

    if irqs & (1 << USB_INTERRUPT) != 0 {
        usb::on_interrupt();
    }
    if irqs & (1 << TIMER0_INTERRUPT) != 0 {
        SystemTicks::tick();
        csr::write(timer0::EV_PENDING, 1);
    }
}
