// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash block translation core for the flashblk firmware.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for the LiteX/VexRiscv firmware
//! - `std` feature: Enables `std` support for host tools
//! - `defmt` feature: Routes the core's log statements to `defmt`
//!
//! Everything hardware-specific sits behind the [`controller::FlashController`],
//! [`ticks::TickSource`] and `embedded-hal` traits, so the whole crate runs
//! against the in-memory [`sim::SimFlash`] on the host.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod fmt;

pub mod controller;
pub mod error;
pub mod indicator;
pub mod layout;
pub mod reset;
pub mod sim;
pub mod spi_nor;
pub mod ticks;
pub mod translator;
pub mod uf2;

// Re-export commonly used types
pub use controller::{ControllerMode, FlashController};
pub use error::{Error, Result};
pub use layout::{Board, BoardConfig, BLOCKS_PER_SECTOR, BLOCK_SIZE, PAGE_SIZE, SECTOR_SIZE};
pub use translator::{BlockTranslator, ErasePolicy};
