// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error type shared by the translator and its collaborators.

use core::fmt;

/// Core error type - no_std compatible, Copy so it crosses the C ABI cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The request reaches past the end of the data region.
    OutOfRange { lba: u32, count: u32 },
    /// The caller's buffer cannot hold `count` blocks.
    BufferTooSmall { needed: usize, actual: usize },
    /// The flash controller kept its busy flag set past the timeout.
    HardwareStall { offset: u32 },
    /// The translator is already serving a request.
    Busy,
    /// A board layout value is not sector-aligned.
    Misaligned { offset: u32 },
}

impl Error {
    /// Status word returned across the USB stack's C interface.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::OutOfRange { .. } => -1,
            Error::BufferTooSmall { .. } => -2,
            Error::HardwareStall { .. } => -3,
            Error::Busy => -4,
            Error::Misaligned { .. } => -5,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange { lba, count } => {
                write!(f, "blocks {}..{} are outside the data region", lba, lba.saturating_add(*count))
            }
            Error::BufferTooSmall { needed, actual } => {
                write!(f, "buffer holds {} bytes, {} needed", actual, needed)
            }
            Error::HardwareStall { offset } => {
                write!(f, "flash stayed busy at offset 0x{:08x}", offset)
            }
            Error::Busy => write!(f, "flash translator is busy"),
            Error::Misaligned { offset } => {
                write!(f, "offset 0x{:08x} is not sector-aligned", offset)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type using the core error.
pub type Result<T> = core::result::Result<T, Error>;

/// Map a translator result to the C status word (0 on success).
pub fn status_word(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.status_code(),
    }
}
