// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SPI-NOR command sequences over an `embedded-hal` SPI device.
//!
//! The controller owns two views of the same flash part: an [`XipWindow`]
//! that switches the memory-mapped read path on and off, and a
//! [`SpiDevice`] used while it is off to issue raw commands.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::controller::FlashController;

/// SPI-NOR opcodes.
pub mod opcodes {
    pub const WRITE_ENABLE: u8 = 0x06;
    pub const WRITE_DISABLE: u8 = 0x04;
    pub const READ_STATUS: u8 = 0x05;
    pub const PAGE_PROGRAM: u8 = 0x02;
    pub const SECTOR_ERASE_4K: u8 = 0x20;
    pub const BLOCK_ERASE_64K: u8 = 0xD8;
    pub const FAST_READ: u8 = 0x0B;
    pub const JEDEC_ID: u8 = 0x9F;
}

/// Write-in-progress bit of status register 1.
pub const STATUS_WIP: u8 = 0x01;

/// Memory-mapped access to the flash part.
pub trait XipWindow {
    /// Enable (XIP) or disable (command access) the memory-mapped path.
    fn set_memory_mapped(&mut self, enabled: bool);

    /// Copy from the window at CPU address `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]);
}

/// Opcode followed by a 24-bit big-endian address.
pub fn address_command(opcode: u8, offset: u32) -> [u8; 4] {
    let [_, a2, a1, a0] = offset.to_be_bytes();
    [opcode, a2, a1, a0]
}

/// [`FlashController`] that drives a SPI-NOR part with standard commands.
pub struct SpiNorController<S, W> {
    spi: S,
    window: W,
    bus_errors: u32,
}

impl<S: SpiDevice, W: XipWindow> SpiNorController<S, W> {
    pub fn new(spi: S, window: W) -> Self {
        Self {
            spi,
            window,
            bus_errors: 0,
        }
    }

    /// SPI transfers that failed since creation.
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    pub fn release(self) -> (S, W) {
        (self.spi, self.window)
    }

    /// Read the JEDEC manufacturer and device id. Command mode only.
    pub fn read_jedec_id(&mut self) -> Option<[u8; 3]> {
        let mut id = [0u8; 3];
        let result = self.spi.transaction(&mut [
            Operation::Write(&[opcodes::JEDEC_ID]),
            Operation::Read(&mut id),
        ]);
        self.check(result).then_some(id)
    }

    fn check<E>(&mut self, result: Result<(), E>) -> bool {
        if result.is_err() {
            self.bus_errors += 1;
            warn!("spi-nor: bus error");
            return false;
        }
        true
    }

    fn write_enable(&mut self) {
        let result = self.spi.write(&[opcodes::WRITE_ENABLE]);
        self.check(result);
    }
}

impl<S: SpiDevice, W: XipWindow> FlashController for SpiNorController<S, W> {
    fn enter_memory_mapped(&mut self) {
        self.window.set_memory_mapped(true);
    }

    fn enter_command(&mut self) {
        self.window.set_memory_mapped(false);
    }

    fn begin_sector_erase_4k(&mut self, offset: u32) {
        self.write_enable();
        let cmd = address_command(opcodes::SECTOR_ERASE_4K, offset);
        let result = self.spi.write(&cmd);
        self.check(result);
    }

    fn begin_page_program(&mut self, offset: u32, data: &[u8]) {
        self.write_enable();
        let cmd = address_command(opcodes::PAGE_PROGRAM, offset);
        let result = self
            .spi
            .transaction(&mut [Operation::Write(&cmd), Operation::Write(data)]);
        self.check(result);
    }

    fn is_busy(&mut self) -> bool {
        let mut status = [0u8; 1];
        let result = self.spi.transaction(&mut [
            Operation::Write(&[opcodes::READ_STATUS]),
            Operation::Read(&mut status),
        ]);
        // A failed status read counts as busy; the caller's timeout bounds it
        if !self.check(result) {
            return true;
        }
        status[0] & STATUS_WIP != 0
    }

    fn read_mapped(&mut self, addr: u32, buf: &mut [u8]) {
        self.window.read(addr, buf);
    }
}
