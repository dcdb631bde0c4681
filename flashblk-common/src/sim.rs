// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory SPI-NOR flash with an XIP window, for tests and host replays.
//!
//! The simulator applies NOR semantics (programming can only clear bits,
//! erase sets a whole sector to 0xFF), logs every primitive it receives and
//! counts mode-discipline violations instead of panicking, so tests can
//! assert on them.

use heapless::Vec;

use crate::controller::{ControllerMode, FlashController};
use crate::layout::{sector_base, ERASED_BYTE, PAGE_SIZE, SECTOR_SIZE, SPIFLASH_WINDOW_BASE};

/// Maximum number of operations kept in the log.
pub const OP_LOG_CAPACITY: usize = 256;

/// A primitive observed by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashOp {
    EnterMemoryMapped,
    EnterCommand,
    SectorErase(u32),
    PageProgram { offset: u32, len: usize },
    MappedRead { addr: u32, len: usize },
}

impl FlashOp {
    /// True for erase and program commands.
    pub fn is_command(&self) -> bool {
        matches!(self, FlashOp::SectorErase(_) | FlashOp::PageProgram { .. })
    }
}

/// Ways a caller broke the controller's rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Violations {
    /// Erase or program issued while in XIP mode.
    pub command_while_mapped: u32,
    /// Window read while in command mode.
    pub read_while_command: u32,
    /// Erase or program issued before the previous one finished.
    pub command_while_busy: u32,
}

impl Violations {
    pub fn total(&self) -> u32 {
        self.command_while_mapped + self.read_while_command + self.command_while_busy
    }
}

/// Simulated SPI-NOR part backed by a caller-provided buffer covering the
/// whole chip (offset 0 upwards).
pub struct SimFlash<'a> {
    mem: &'a mut [u8],
    mode: ControllerMode,
    busy_polls: u32,
    busy_left: u32,
    stalled: bool,
    ops: Vec<FlashOp, OP_LOG_CAPACITY>,
    dropped_ops: usize,
    violations: Violations,
    erase_count: u32,
    program_count: u32,
}

impl<'a> SimFlash<'a> {
    /// Create a simulator over `mem`, erasing it to 0xFF.
    pub fn new(mem: &'a mut [u8]) -> Self {
        mem.fill(ERASED_BYTE);
        Self::with_contents(mem)
    }

    /// Create a simulator over `mem`, keeping its current contents.
    pub fn with_contents(mem: &'a mut [u8]) -> Self {
        Self {
            mem,
            mode: ControllerMode::MemoryMapped,
            busy_polls: 1,
            busy_left: 0,
            stalled: false,
            ops: Vec::new(),
            dropped_ops: 0,
            violations: Violations::default(),
            erase_count: 0,
            program_count: 0,
        }
    }

    /// Number of `is_busy` polls that report busy after each command.
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Keep the busy flag set forever (or release it).
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn memory(&self) -> &[u8] {
        &*self.mem
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut *self.mem
    }

    pub fn ops(&self) -> &[FlashOp] {
        &self.ops
    }

    /// Erase and program operations only, in order.
    pub fn commands(&self) -> impl Iterator<Item = &FlashOp> + '_ {
        self.ops.iter().filter(|op| op.is_command())
    }

    /// Operations that did not fit in the log.
    pub fn dropped_ops(&self) -> usize {
        self.dropped_ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
        self.dropped_ops = 0;
    }

    pub fn violations(&self) -> Violations {
        self.violations
    }

    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    fn log(&mut self, op: FlashOp) {
        if self.ops.push(op).is_err() {
            self.dropped_ops += 1;
        }
    }

    /// Check that a command may be issued now. Returns false if the part
    /// would ignore it.
    fn accept_command(&mut self) -> bool {
        if self.mode != ControllerMode::Command {
            self.violations.command_while_mapped += 1;
            return false;
        }
        if self.stalled || self.busy_left > 0 {
            self.violations.command_while_busy += 1;
            return false;
        }
        self.busy_left = self.busy_polls;
        true
    }
}

impl FlashController for SimFlash<'_> {
    fn enter_memory_mapped(&mut self) {
        self.log(FlashOp::EnterMemoryMapped);
        self.mode = ControllerMode::MemoryMapped;
    }

    fn enter_command(&mut self) {
        self.log(FlashOp::EnterCommand);
        self.mode = ControllerMode::Command;
    }

    fn begin_sector_erase_4k(&mut self, offset: u32) {
        self.log(FlashOp::SectorErase(offset));
        if !self.accept_command() {
            return;
        }

        let start = sector_base(offset) as usize;
        let end = (start + SECTOR_SIZE as usize).min(self.mem.len());
        if start < end {
            self.mem[start..end].fill(ERASED_BYTE);
        }
        self.erase_count += 1;
    }

    fn begin_page_program(&mut self, offset: u32, data: &[u8]) {
        self.log(FlashOp::PageProgram {
            offset,
            len: data.len(),
        });
        if !self.accept_command() {
            return;
        }

        // Addresses wrap inside the page, as on the real part
        let page = (offset & !(PAGE_SIZE - 1)) as usize;
        let mut column = (offset % PAGE_SIZE) as usize;
        for &byte in data.iter().take(PAGE_SIZE as usize) {
            if let Some(cell) = self.mem.get_mut(page + column) {
                *cell &= byte;
            }
            column = (column + 1) % PAGE_SIZE as usize;
        }
        self.program_count += 1;
    }

    fn is_busy(&mut self) -> bool {
        if self.stalled {
            return true;
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return true;
        }
        false
    }

    fn read_mapped(&mut self, addr: u32, buf: &mut [u8]) {
        self.log(FlashOp::MappedRead {
            addr,
            len: buf.len(),
        });
        if self.mode != ControllerMode::MemoryMapped {
            self.violations.read_while_command += 1;
            buf.fill(0);
            return;
        }

        let start = addr.wrapping_sub(SPIFLASH_WINDOW_BASE) as usize;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.mem.get(start + i).copied().unwrap_or(ERASED_BYTE);
        }
    }
}
