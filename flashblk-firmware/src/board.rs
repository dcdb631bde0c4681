// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Build-time board selection.

use flashblk_common::layout::BoardConfig;
use flashblk_common::ErasePolicy;

#[cfg(all(feature = "orangecrab-r01", feature = "orangecart"))]
compile_error!("enable only one of the `orangecrab-r01` and `orangecart` features");

#[cfg(feature = "orangecart")]
pub const CONFIG: BoardConfig = flashblk_common::layout::ORANGECART;

#[cfg(all(feature = "orangecrab-r01", not(feature = "orangecart")))]
pub const CONFIG: BoardConfig = flashblk_common::layout::ORANGECRAB_R01;

#[cfg(not(any(feature = "orangecrab-r01", feature = "orangecart")))]
pub const CONFIG: BoardConfig = flashblk_common::layout::ORANGECRAB_R02;

pub const ERASE_POLICY: ErasePolicy = ErasePolicy::SectorBoundary;
