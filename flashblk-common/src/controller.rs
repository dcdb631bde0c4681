// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash controller primitives consumed by the block translator.

/// Access mode of the flash controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerMode {
    /// Loads from the XIP window return flash contents; no commands.
    MemoryMapped,
    /// Direct SPI commands may be issued; the window is not readable.
    Command,
}

/// The five SPI-NOR primitives plus the XIP window read.
///
/// Erase and program only start the operation; callers poll [`is_busy`]
/// before issuing the next command.
///
/// [`is_busy`]: FlashController::is_busy
pub trait FlashController {
    /// Place the controller in XIP mode.
    fn enter_memory_mapped(&mut self);

    /// Place the controller in command mode.
    fn enter_command(&mut self);

    /// Start a 4 KiB erase at a sector-aligned flash offset.
    fn begin_sector_erase_4k(&mut self, offset: u32);

    /// Start programming up to one page at `offset`.
    fn begin_page_program(&mut self, offset: u32, data: &[u8]);

    /// True while the last erase or program is in flight.
    fn is_busy(&mut self) -> bool;

    /// Copy from the XIP window starting at CPU address `addr`.
    fn read_mapped(&mut self, addr: u32, buf: &mut [u8]);
}
