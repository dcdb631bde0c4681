// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash geometry, memory map and per-board layout.
//!
//! The logical block array starts at a board-specific, sector-aligned offset
//! inside the SPI-NOR part (the data region base). Reads go through the XIP
//! window at `SPIFLASH_WINDOW_BASE`, writes address the part directly.

use crate::error::{Error, Result};

// --- Memory map constants ---

pub const SPIFLASH_WINDOW_BASE: u32 = 0x2000_0000;
pub const CSR_BASE: u32 = 0xE000_0000;

// --- Flash geometry ---

pub const BLOCK_SIZE: u32 = 256;
pub const PAGE_SIZE: u32 = 256;
pub const SECTOR_SIZE: u32 = 4096;
pub const BLOCKS_PER_SECTOR: u32 = SECTOR_SIZE / BLOCK_SIZE;

pub const ERASED_BYTE: u8 = 0xFF;

// --- Timing ---

/// Upper bound on a single erase or program, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 1000;
/// Delay between the last UF2 record and the reboot, in milliseconds.
pub const RESET_DELAY_MS: u32 = 1000;

// Compile-time geometry checks
const _: () = assert!(PAGE_SIZE % BLOCK_SIZE == 0);
const _: () = assert!(SECTOR_SIZE % PAGE_SIZE == 0);
const _: () = assert!(SECTOR_SIZE.is_power_of_two());

/// Byte offset of the sector containing `offset`.
pub const fn sector_base(offset: u32) -> u32 {
    offset & !(SECTOR_SIZE - 1)
}

/// Index of block `lba` within its sector.
pub const fn block_in_sector(lba: u32) -> u32 {
    lba % BLOCKS_PER_SECTOR
}

/// Number of blocks from `lba` up to and including the last block of its sector.
pub const fn blocks_to_sector_end(lba: u32) -> u32 {
    BLOCKS_PER_SECTOR - block_in_sector(lba)
}

// --- Board layout ---

/// Layout and clocking of one board variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub name: &'static str,
    /// Size of the SPI-NOR part in bytes.
    pub flash_size: u32,
    /// Offset of logical block 0 inside the part.
    pub data_region_base: u32,
    /// System clock feeding the timer.
    pub clock_hz: u32,
    /// UF2 family id accepted by the firmware.
    pub family_id: u32,
    /// Image index passed to the reboot register after an update.
    pub boot_image: u8,
}

impl BoardConfig {
    /// CPU address of logical block 0 in the XIP window.
    pub const fn mmap_base(&self) -> u32 {
        SPIFLASH_WINDOW_BASE + self.data_region_base
    }

    /// Length of the data region in bytes.
    pub const fn region_len(&self) -> u32 {
        self.flash_size - self.data_region_base
    }

    /// Number of logical blocks in the data region.
    pub const fn block_count(&self) -> u32 {
        self.region_len() / BLOCK_SIZE
    }

    /// Flash byte offset of logical block `lba`.
    pub const fn lba_to_offset(&self, lba: u32) -> u32 {
        self.data_region_base + lba * BLOCK_SIZE
    }

    /// XIP window address of logical block `lba`.
    pub const fn lba_to_mmap(&self, lba: u32) -> u32 {
        self.mmap_base() + lba * BLOCK_SIZE
    }

    /// Logical block at XIP window address `addr`, if it is block-aligned
    /// and inside the data region.
    pub fn mmap_to_lba(&self, addr: u32) -> Option<u32> {
        let rel = addr.checked_sub(self.mmap_base())?;
        if rel % BLOCK_SIZE != 0 || rel >= self.region_len() {
            return None;
        }
        Some(rel / BLOCK_SIZE)
    }

    /// Check the invariants the translator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.data_region_base % SECTOR_SIZE != 0 {
            return Err(Error::Misaligned {
                offset: self.data_region_base,
            });
        }
        if self.flash_size % SECTOR_SIZE != 0 || self.flash_size <= self.data_region_base {
            return Err(Error::Misaligned {
                offset: self.flash_size,
            });
        }
        Ok(())
    }
}

/// Family id written into UF2 files for these boards.
pub const FLASHBLK_FAMILY_ID: u32 = 0x1C0B_A4B1;

pub const ORANGECRAB_R01: BoardConfig = BoardConfig {
    name: "orangecrab-r0.1",
    flash_size: 1024 * 1024,
    data_region_base: 0x0008_0000,
    clock_hz: 12_000_000,
    family_id: FLASHBLK_FAMILY_ID,
    boot_image: 0,
};

pub const ORANGECRAB_R02: BoardConfig = BoardConfig {
    name: "orangecrab-r0.2",
    flash_size: 16 * 1024 * 1024,
    data_region_base: 0x0008_0000,
    clock_hz: 12_000_000,
    family_id: FLASHBLK_FAMILY_ID,
    boot_image: 0,
};

pub const ORANGECART: BoardConfig = BoardConfig {
    name: "orangecart",
    flash_size: 16 * 1024 * 1024,
    data_region_base: 0x0008_0000,
    clock_hz: 12_000_000,
    family_id: FLASHBLK_FAMILY_ID,
    boot_image: 0,
};

const _: () = assert!(ORANGECRAB_R01.data_region_base % SECTOR_SIZE == 0);
const _: () = assert!(ORANGECRAB_R02.data_region_base % SECTOR_SIZE == 0);
const _: () = assert!(ORANGECART.data_region_base % SECTOR_SIZE == 0);

/// Supported boards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Board {
    OrangeCrabR01,
    OrangeCrabR02,
    OrangeCart,
}

impl Board {
    pub const ALL: [Board; 3] = [Board::OrangeCrabR01, Board::OrangeCrabR02, Board::OrangeCart];

    pub const fn config(self) -> BoardConfig {
        match self {
            Board::OrangeCrabR01 => ORANGECRAB_R01,
            Board::OrangeCrabR02 => ORANGECRAB_R02,
            Board::OrangeCart => ORANGECART,
        }
    }

    /// Look up a board by its configuration name.
    pub fn from_name(name: &str) -> Option<Board> {
        Board::ALL.into_iter().find(|b| b.config().name == name)
    }
}
