// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 record decoding and the sink that feeds records to the translator.
//!
//! A UF2 file is a sequence of self-describing 512-byte records, each
//! carrying up to 476 bytes destined for an absolute target address. The
//! firmware only accepts 256-byte payloads aimed at block-aligned addresses
//! inside the data region's XIP window, so one record is one logical block.

use core::fmt;

use crate::controller::FlashController;
use crate::error::Error;
use crate::layout::{BoardConfig, BLOCK_SIZE};
use crate::ticks::TickSource;
use crate::translator::BlockTranslator;

pub const UF2_RECORD_SIZE: usize = 512;
pub const UF2_DATA_SIZE: usize = 476;

pub const UF2_MAGIC_START0: u32 = 0x0A32_4655;
pub const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
pub const UF2_MAGIC_END: u32 = 0x0AB1_6F30;

pub const UF2_FLAG_NOT_MAIN_FLASH: u32 = 0x0000_0001;
pub const UF2_FLAG_FAMILY_ID_PRESENT: u32 = 0x0000_2000;

/// Largest transfer whose completion is tracked (4 MiB of payload).
pub const MAX_UF2_BLOCKS: usize = 16 * 1024;

const DATA_OFFSET: usize = 32;
const END_MAGIC_OFFSET: usize = UF2_RECORD_SIZE - 4;

/// One decoded UF2 record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uf2Record {
    pub flags: u32,
    pub target_addr: u32,
    pub payload_size: u32,
    pub block_no: u32,
    pub num_blocks: u32,
    /// Family id, or file size when the family flag is clear.
    pub family_id: u32,
    pub data: [u8; UF2_DATA_SIZE],
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

impl Uf2Record {
    /// A record with `payload` for `target_addr`. Panics if the payload is
    /// larger than the data area.
    pub fn new(target_addr: u32, block_no: u32, num_blocks: u32, family_id: u32, payload: &[u8]) -> Self {
        let mut data = [0u8; UF2_DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            flags: UF2_FLAG_FAMILY_ID_PRESENT,
            target_addr,
            payload_size: payload.len() as u32,
            block_no,
            num_blocks,
            family_id,
            data,
        }
    }

    /// Decode a 512-byte record.
    pub fn parse(bytes: &[u8]) -> Result<Self, Uf2Error> {
        if bytes.len() < UF2_RECORD_SIZE {
            return Err(Uf2Error::Truncated { len: bytes.len() });
        }
        if read_u32(bytes, 0) != UF2_MAGIC_START0
            || read_u32(bytes, 4) != UF2_MAGIC_START1
            || read_u32(bytes, END_MAGIC_OFFSET) != UF2_MAGIC_END
        {
            return Err(Uf2Error::BadMagic);
        }

        let mut data = [0u8; UF2_DATA_SIZE];
        data.copy_from_slice(&bytes[DATA_OFFSET..DATA_OFFSET + UF2_DATA_SIZE]);

        Ok(Self {
            flags: read_u32(bytes, 8),
            target_addr: read_u32(bytes, 12),
            payload_size: read_u32(bytes, 16),
            block_no: read_u32(bytes, 20),
            num_blocks: read_u32(bytes, 24),
            family_id: read_u32(bytes, 28),
            data,
        })
    }

    /// Encode into the 512-byte wire format.
    pub fn to_bytes(&self) -> [u8; UF2_RECORD_SIZE] {
        let mut out = [0u8; UF2_RECORD_SIZE];
        write_u32(&mut out, 0, UF2_MAGIC_START0);
        write_u32(&mut out, 4, UF2_MAGIC_START1);
        write_u32(&mut out, 8, self.flags);
        write_u32(&mut out, 12, self.target_addr);
        write_u32(&mut out, 16, self.payload_size);
        write_u32(&mut out, 20, self.block_no);
        write_u32(&mut out, 24, self.num_blocks);
        write_u32(&mut out, 28, self.family_id);
        out[DATA_OFFSET..DATA_OFFSET + UF2_DATA_SIZE].copy_from_slice(&self.data);
        write_u32(&mut out, END_MAGIC_OFFSET, UF2_MAGIC_END);
        out
    }

    pub fn has_family_id(&self) -> bool {
        self.flags & UF2_FLAG_FAMILY_ID_PRESENT != 0
    }

    pub fn is_main_flash(&self) -> bool {
        self.flags & UF2_FLAG_NOT_MAIN_FLASH == 0
    }

    /// The payload bytes, clamped to the data area.
    pub fn payload(&self) -> &[u8] {
        let len = (self.payload_size as usize).min(UF2_DATA_SIZE);
        &self.data[..len]
    }
}

/// Reasons a UF2 record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uf2Error {
    Truncated { len: usize },
    BadMagic,
    BadPayloadSize { size: u32 },
    Misaligned { addr: u32 },
    OutsideRegion { addr: u32 },
    Flash(Error),
}

impl From<Error> for Uf2Error {
    fn from(e: Error) -> Self {
        Uf2Error::Flash(e)
    }
}

impl Uf2Error {
    /// Status word returned across the USB stack's C interface.
    pub fn status_code(&self) -> i32 {
        match self {
            Uf2Error::Flash(e) => e.status_code(),
            Uf2Error::Truncated { .. } => -16,
            Uf2Error::BadMagic => -17,
            Uf2Error::BadPayloadSize { .. } => -18,
            Uf2Error::Misaligned { .. } => -19,
            Uf2Error::OutsideRegion { .. } => -20,
        }
    }
}

impl fmt::Display for Uf2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uf2Error::Truncated { len } => write!(f, "UF2 record is {} bytes, expected 512", len),
            Uf2Error::BadMagic => write!(f, "not a UF2 record"),
            Uf2Error::BadPayloadSize { size } => {
                write!(f, "UF2 payload of {} bytes, expected {}", size, BLOCK_SIZE)
            }
            Uf2Error::Misaligned { addr } => {
                write!(f, "UF2 target 0x{:08x} is not block-aligned", addr)
            }
            Uf2Error::OutsideRegion { addr } => {
                write!(f, "UF2 target 0x{:08x} is outside the data region", addr)
            }
            Uf2Error::Flash(e) => write!(f, "flash error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Uf2Error {}

/// What happened to an accepted record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uf2Status {
    /// Written to the given logical block.
    Written { lba: u32 },
    /// Valid but not written: another family, or a block flagged as not
    /// main flash.
    Ignored,
    /// Every block of the transfer has now been seen. `lba` is the block
    /// this record wrote, if any.
    Complete { lba: Option<u32> },
}

/// Tracks one UF2 transfer and writes its records through the translator.
pub struct Uf2Sink {
    family_id: u32,
    total: u32,
    seen: u32,
    complete: bool,
    written: [u32; MAX_UF2_BLOCKS / 32],
}

impl Uf2Sink {
    pub const fn new(family_id: u32) -> Self {
        Self {
            family_id,
            total: 0,
            seen: 0,
            complete: false,
            written: [0; MAX_UF2_BLOCKS / 32],
        }
    }

    /// Forget the current transfer.
    pub fn reset(&mut self) {
        self.total = 0;
        self.seen = 0;
        self.complete = false;
        self.written.fill(0);
    }

    /// Distinct blocks seen and the transfer's block count.
    pub fn progress(&self) -> (u32, u32) {
        (self.seen, self.total)
    }

    /// True while a transfer has started but not completed.
    pub fn in_progress(&self) -> bool {
        self.seen > 0 && !self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Decode `bytes` and write the record through `translator`.
    pub fn write_record<C, T>(
        &mut self,
        translator: &mut BlockTranslator<C, T>,
        bytes: &[u8],
    ) -> Result<Uf2Status, Uf2Error>
    where
        C: FlashController,
        T: TickSource,
    {
        let record = Uf2Record::parse(bytes)?;

        if record.has_family_id() && record.family_id != self.family_id {
            return Ok(Uf2Status::Ignored);
        }

        // Skipped and misplaced blocks of this transfer still count toward
        // completion; flash failures do not.
        let lba = if record.is_main_flash() {
            match Self::placement(translator.config(), &record) {
                Ok(lba) => {
                    translator.write_blocks(record.payload(), lba, 1)?;
                    Some(lba)
                }
                Err(e) => {
                    if self.track(&record) {
                        translator.flush()?;
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        if self.track(&record) {
            translator.flush()?;
            debug!("uf2: transfer of {=u32} blocks complete", self.total);
            return Ok(Uf2Status::Complete { lba });
        }
        Ok(match lba {
            Some(lba) => Uf2Status::Written { lba },
            None => Uf2Status::Ignored,
        })
    }

    /// Logical block a record's payload belongs to.
    fn placement(config: &BoardConfig, record: &Uf2Record) -> Result<u32, Uf2Error> {
        if record.payload_size != BLOCK_SIZE {
            return Err(Uf2Error::BadPayloadSize {
                size: record.payload_size,
            });
        }
        if record.target_addr % BLOCK_SIZE != 0 {
            return Err(Uf2Error::Misaligned {
                addr: record.target_addr,
            });
        }
        config
            .mmap_to_lba(record.target_addr)
            .ok_or(Uf2Error::OutsideRegion {
                addr: record.target_addr,
            })
    }

    /// Record the block as seen. Returns true on the record that completes
    /// the transfer.
    fn track(&mut self, record: &Uf2Record) -> bool {
        if record.num_blocks != self.total {
            // A new transfer starts
            self.reset();
            self.total = record.num_blocks;
        }
        if self.complete || record.block_no >= self.total {
            return false;
        }
        let block = record.block_no as usize;
        if block >= MAX_UF2_BLOCKS {
            return false;
        }

        let (word, bit) = (block / 32, 1u32 << (block % 32));
        if self.written[word] & bit == 0 {
            self.written[word] |= bit;
            self.seen += 1;
        }

        if self.seen == self.total {
            self.complete = true;
            return true;
        }
        false
    }
}
