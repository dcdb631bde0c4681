// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! LiteX SPI flash core: XIP window plus bit-banged command access.
//!
//! While `bitbang_en` is set the core stops serving the memory-mapped
//! window and the SPI lines follow the `bitbang` register instead. The two
//! halves are separate types so the SPI-NOR controller can own both.

use core::convert::Infallible;

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::csr::{self, lxspi};

/// Command access through the bit-bang register (mode 0, MSB first).
pub struct LxSpiBitbang {
    clock_hz: u32,
}

impl LxSpiBitbang {
    pub fn new(clock_hz: u32) -> Self {
        Self { clock_hz }
    }

    /// Drive the lines; DIR stays clear so MOSI is an output.
    fn set_lines(&mut self, bits: u32) {
        csr::write(lxspi::BITBANG, bits & !lxspi::DIR);
    }

    fn select(&mut self) {
        self.set_lines(0);
    }

    fn deselect(&mut self) {
        self.set_lines(lxspi::CS_N);
    }

    /// Shift one byte out on MOSI while sampling MISO.
    fn exchange(&mut self, out: u8) -> u8 {
        let mut input = 0u8;
        for bit in (0..8).rev() {
            let mosi = if out & (1 << bit) != 0 { lxspi::MOSI } else { 0 };
            self.set_lines(mosi);
            self.set_lines(mosi | lxspi::CLK);
            input = (input << 1) | (csr::read(lxspi::MISO) & 1) as u8;
        }
        self.set_lines(0);
        input
    }

    fn delay_ns(&mut self, ns: u32) {
        let cycles = (ns as u64 * self.clock_hz as u64 / 1_000_000_000) as u32;
        for _ in 0..cycles {
            core::hint::spin_loop();
        }
    }
}

impl ErrorType for LxSpiBitbang {
    type Error = Infallible;
}

impl SpiDevice for LxSpiBitbang {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        self.select();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => {
                    for &b in data.iter() {
                        self.exchange(b);
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.exchange(0xFF);
                    }
                }
                Operation::Transfer(read, write) => {
                    let len = read.len().max(write.len());
                    for i in 0..len {
                        let out = write.get(i).copied().unwrap_or(0xFF);
                        let input = self.exchange(out);
                        if let Some(slot) = read.get_mut(i) {
                            *slot = input;
                        }
                    }
                }
                Operation::TransferInPlace(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.exchange(*b);
                    }
                }
                Operation::DelayNs(ns) => self.delay_ns(*ns),
            }
        }
        self.deselect();
        Ok(())
    }
}

/// The memory-mapped read window at `SPIFLASH_WINDOW_BASE`.
pub struct LxSpiWindow;

impl flashblk_common::spi_nor::XipWindow for LxSpiWindow {
    fn set_memory_mapped(&mut self, enabled: bool) {
        csr::write(lxspi::BITBANG_EN, u32::from(!enabled));
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        let base = addr as usize as *const u8;
        for (i, b) in buf.iter_mut().enumerate() {
            // SAFETY: the caller passes addresses inside the XIP window.
            *b = unsafe { core::ptr::read_volatile(base.add(i)) };
        }
    }
}
