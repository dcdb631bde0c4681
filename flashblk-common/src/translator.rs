// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Logical block translation onto SPI-NOR erase/program geometry.
//!
//! Reads are served from the XIP window. Writes switch the controller into
//! command mode and issue sector-erase + page-program sequences:
//!
//!   1. enter command mode (once per call)
//!   2. split the request into runs that end at a sector boundary
//!   3. erase the sector when a run starts on its first block
//!   4. program each block of the run as its own page, waiting out busy
//!
//! The write path leaves the controller in command mode; the next read
//! switches back to XIP before touching the window.
//!
//! With [`ErasePolicy::ReadModifyWrite`] writes go through a one-sector
//! write-back cache instead, so blocks of a sector may arrive in any order.

use crate::controller::{ControllerMode, FlashController};
use crate::error::{Error, Result};
use crate::layout::{
    block_in_sector, blocks_to_sector_end, sector_base, BoardConfig, BLOCK_SIZE, BUSY_TIMEOUT_MS,
    ERASED_BYTE, PAGE_SIZE, SECTOR_SIZE, SPIFLASH_WINDOW_BASE,
};
use crate::ticks::{elapsed_since, TickSource};

const BLOCK_LEN: usize = BLOCK_SIZE as usize;
const PAGE_LEN: usize = PAGE_SIZE as usize;
const SECTOR_LEN: usize = SECTOR_SIZE as usize;

/// When sectors get erased.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErasePolicy {
    /// Erase when a write starts on the first block of a sector. Mid-sector
    /// writes assume the sector was erased by an earlier call.
    SectorBoundary,
    /// Stage writes in a one-sector cache, written back on sector change
    /// and on [`BlockTranslator::flush`].
    ReadModifyWrite,
}

struct SectorCache {
    /// Flash offset of the cached sector.
    base: Option<u32>,
    dirty: bool,
    data: [u8; SECTOR_LEN],
}

impl SectorCache {
    const fn new() -> Self {
        Self {
            base: None,
            dirty: false,
            data: [ERASED_BYTE; SECTOR_LEN],
        }
    }
}

/// Serves logical block reads and writes from a SPI-NOR part.
pub struct BlockTranslator<C, T> {
    controller: C,
    ticks: T,
    config: BoardConfig,
    policy: ErasePolicy,
    mode: ControllerMode,
    busy_timeout_ms: u32,
    cache: SectorCache,
}

impl<C: FlashController, T: TickSource> BlockTranslator<C, T> {
    /// Create a translator. The controller must be in XIP mode, which is its
    /// reset state, and `config` must pass [`BoardConfig::validate`].
    pub fn new(controller: C, ticks: T, config: BoardConfig, policy: ErasePolicy) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid board config");
        Self {
            controller,
            ticks,
            config,
            policy,
            mode: ControllerMode::MemoryMapped,
            busy_timeout_ms: BUSY_TIMEOUT_MS,
            cache: SectorCache::new(),
        }
    }

    /// Override the busy-wait bound.
    pub fn with_busy_timeout(mut self, timeout_ms: u32) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn policy(&self) -> ErasePolicy {
        self.policy
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// True if the cache holds writes that have not reached the flash.
    pub fn has_pending_writes(&self) -> bool {
        self.cache.dirty
    }

    /// Give back the controller. Pending cached writes are discarded, so
    /// call [`flush`](Self::flush) first.
    pub fn release(self) -> C {
        self.controller
    }

    /// Copy `count` blocks starting at `lba` into `dest`.
    pub fn read_blocks(&mut self, dest: &mut [u8], lba: u32, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let len = self.check_request(lba, count, dest.len())?;

        self.ensure_memory_mapped();
        let addr = self.config.lba_to_mmap(lba);
        self.controller.read_mapped(addr, &mut dest[..len]);

        self.overlay_cache(self.config.lba_to_offset(lba), &mut dest[..len]);
        Ok(())
    }

    /// Write `count` blocks from `src` starting at `lba`.
    pub fn write_blocks(&mut self, src: &[u8], lba: u32, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let len = self.check_request(lba, count, src.len())?;

        match self.policy {
            ErasePolicy::SectorBoundary => self.write_direct(&src[..len], lba, count),
            ErasePolicy::ReadModifyWrite => self.write_cached(&src[..len], lba, count),
        }
    }

    /// Push staged writes to the flash. Nothing to do under
    /// [`ErasePolicy::SectorBoundary`], where writes are synchronous.
    pub fn flush(&mut self) -> Result<()> {
        self.write_back()
    }

    // --- Mode switching ---

    fn ensure_memory_mapped(&mut self) {
        if self.mode != ControllerMode::MemoryMapped {
            trace!("flash: enter memory-mapped mode");
            self.controller.enter_memory_mapped();
            self.mode = ControllerMode::MemoryMapped;
        }
    }

    fn enter_command(&mut self) {
        self.controller.enter_command();
        self.mode = ControllerMode::Command;
    }

    fn ensure_command(&mut self) {
        if self.mode != ControllerMode::Command {
            self.enter_command();
        }
    }

    // --- Request validation ---

    fn check_request(&self, lba: u32, count: u32, buf_len: usize) -> Result<usize> {
        let in_range = lba
            .checked_add(count)
            .is_some_and(|end| end <= self.config.block_count());
        if !in_range {
            return Err(Error::OutOfRange { lba, count });
        }

        let needed = count as usize * BLOCK_LEN;
        if buf_len < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: buf_len,
            });
        }
        Ok(needed)
    }

    // --- Busy handling ---

    fn wait_idle(&mut self, offset: u32) -> Result<()> {
        let start = self.ticks.now_ms();
        while self.controller.is_busy() {
            if elapsed_since(start, self.ticks.now_ms()) > self.busy_timeout_ms {
                warn!("flash: busy for over {=u32} ms at {=u32:#x}", self.busy_timeout_ms, offset);
                return Err(Error::HardwareStall { offset });
            }
        }
        Ok(())
    }

    fn erase_sector(&mut self, sector: u32) -> Result<()> {
        self.wait_idle(sector)?;
        trace!("flash: erase sector {=u32:#x}", sector);
        self.controller.begin_sector_erase_4k(sector);
        self.wait_idle(sector)
    }

    fn program_page(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.wait_idle(offset)?;
        self.controller.begin_page_program(offset, data);
        self.wait_idle(offset)
    }

    // --- Sector-boundary policy ---

    fn write_direct(&mut self, src: &[u8], mut lba: u32, mut remaining: u32) -> Result<()> {
        self.enter_command();

        let mut chunks = src.chunks_exact(BLOCK_LEN);
        while remaining > 0 {
            let run = remaining.min(blocks_to_sector_end(lba));
            let offset = self.config.lba_to_offset(lba);

            // First block in the sector, erase it
            if block_in_sector(lba) == 0 {
                self.erase_sector(sector_base(offset))?;
            }

            for (i, block) in (0..run).zip(chunks.by_ref()) {
                self.program_page(offset + i * BLOCK_SIZE, block)?;
            }

            lba += run;
            remaining -= run;
        }
        Ok(())
    }

    // --- Read-modify-write policy ---

    fn write_cached(&mut self, src: &[u8], mut lba: u32, mut remaining: u32) -> Result<()> {
        let mut cursor = 0usize;
        while remaining > 0 {
            let run = remaining.min(blocks_to_sector_end(lba));
            let offset = self.config.lba_to_offset(lba);
            let sector = sector_base(offset);

            self.load_sector(sector)?;

            let start = (offset - sector) as usize;
            let len = run as usize * BLOCK_LEN;
            self.cache.data[start..start + len].copy_from_slice(&src[cursor..cursor + len]);
            self.cache.dirty = true;

            cursor += len;
            lba += run;
            remaining -= run;
        }
        Ok(())
    }

    fn load_sector(&mut self, sector: u32) -> Result<()> {
        if self.cache.base == Some(sector) {
            return Ok(());
        }
        self.write_back()?;

        self.ensure_memory_mapped();
        self.controller
            .read_mapped(SPIFLASH_WINDOW_BASE + sector, &mut self.cache.data);
        self.cache.base = Some(sector);
        self.cache.dirty = false;
        debug!("flash: cached sector {=u32:#x}", sector);
        Ok(())
    }

    fn write_back(&mut self) -> Result<()> {
        let Some(sector) = self.cache.base else {
            return Ok(());
        };
        if !self.cache.dirty {
            return Ok(());
        }

        self.ensure_command();
        self.erase_sector(sector)?;

        for page in 0..SECTOR_LEN / PAGE_LEN {
            let start = page * PAGE_LEN;
            let erased = self.cache.data[start..start + PAGE_LEN]
                .iter()
                .all(|&b| b == ERASED_BYTE);
            if erased {
                continue;
            }

            let offset = sector + start as u32;
            self.wait_idle(offset)?;
            self.controller
                .begin_page_program(offset, &self.cache.data[start..start + PAGE_LEN]);
            self.wait_idle(offset)?;
        }

        self.cache.dirty = false;
        debug!("flash: wrote back sector {=u32:#x}", sector);
        Ok(())
    }

    /// Replace bytes of `dest` (starting at flash `offset`) that fall in the
    /// cached sector with the cache contents.
    fn overlay_cache(&self, offset: u32, dest: &mut [u8]) {
        let Some(sector) = self.cache.base else {
            return;
        };
        if !self.cache.dirty {
            return;
        }

        let start = offset.max(sector);
        let end = (offset + dest.len() as u32).min(sector + SECTOR_SIZE);
        if start >= end {
            return;
        }

        let len = (end - start) as usize;
        let dst = (start - offset) as usize;
        let src = (start - sector) as usize;
        dest[dst..dst + len].copy_from_slice(&self.cache.data[src..src + len]);
    }
}
