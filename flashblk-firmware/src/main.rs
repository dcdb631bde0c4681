// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! flashblk firmware for LiteX/VexRiscv ECP5 boards: exposes the SPI flash
//! data region over USB as a UF2 drive.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod board;
#[cfg(target_os = "none")]
mod csr;
#[cfg(target_os = "none")]
mod flash;
#[cfg(target_os = "none")]
mod irq;
#[cfg(target_os = "none")]
mod lxspi;
#[cfg(target_os = "none")]
mod reboot;
#[cfg(target_os = "none")]
mod rgb;
#[cfg(target_os = "none")]
mod usb;

#[cfg(target_os = "none")]
use defmt_rtt as _;
#[cfg(target_os = "none")]
use panic_halt as _;

#[cfg(target_os = "none")]
defmt::timestamp!("{=u32:ms}", flashblk_common::ticks::SystemTicks::now());

#[cfg(target_os = "none")]
#[riscv_rt::entry]
fn main() -> ! {
    use flashblk_common::indicator::Indicator;
    use flashblk_common::reset::RebootControl;
    use flashblk_common::ticks::SystemTicks;

    defmt::println!("flashblk init ({})", board::CONFIG.name);

    let (red, green, blue) = rgb::init();
    let mut indicator = Indicator::new(red, green, blue);
    let mut reboot = reboot::LiteXReboot;

    irq::init();
    irq::timer_init(board::CONFIG.clock_hz);

    if let Err(e) = flash::init() {
        defmt::error!("flash init failed: {}", e);
    }
    usb::init();

    loop {
        usb::task();

        let now = SystemTicks::now();
        indicator.set_state(usb::state());
        indicator.set_writing(usb::is_writing());
        indicator.poll(now);

        if let Some(value) = usb::reset_due(now) {
            reboot.reboot(value);
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("flashblk-firmware only runs on the board; build it for riscv32i-unknown-none-elf");
}
