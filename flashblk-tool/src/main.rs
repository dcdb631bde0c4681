// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for flashblk boards.
//!
//! Usage:
//!   flashblk-tool boards
//!   flashblk-tool uf2 data.bin -o data.uf2 --board orangecrab-r0.2
//!   flashblk-tool image data.uf2 -o region.bin --policy cached
//!   flashblk-tool svf top.bit -o top.svf

mod cli;
mod commands;
mod svf;
mod uf2_file;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
