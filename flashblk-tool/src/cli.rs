// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use flashblk_common::{Board, ErasePolicy};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "flashblk-tool")]
#[command(about = "Host tool for flashblk UF2 boards")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Erase policy used when replaying a UF2 file.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolicyArg {
    /// Erase when a write starts a sector (what the firmware ships with)
    Boundary,
    /// One-sector read-modify-write cache
    Cached,
}

impl From<PolicyArg> for ErasePolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Boundary => ErasePolicy::SectorBoundary,
            PolicyArg::Cached => ErasePolicy::ReadModifyWrite,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List supported boards and their flash layout
    Boards,

    /// Wrap a binary into a UF2 file for the board's data region
    Uf2 {
        /// Input binary
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output UF2 file
        #[arg(short, long)]
        output: PathBuf,

        /// Target board
        #[arg(short, long, default_value = "orangecrab-r0.2", value_parser = parse_board)]
        board: Board,

        /// Byte offset inside the data region (4 KiB-aligned)
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        offset: u32,
    },

    /// Replay a UF2 file through the block translator into a data region image
    Image {
        /// Input UF2 file
        #[arg(value_name = "UF2")]
        file: PathBuf,

        /// Output image of the data region
        #[arg(short, long)]
        output: PathBuf,

        /// Target board
        #[arg(short, long, default_value = "orangecrab-r0.2", value_parser = parse_board)]
        board: Board,

        /// Erase policy of the translator
        #[arg(long, value_enum, default_value_t = PolicyArg::Boundary)]
        policy: PolicyArg,

        /// Drop trailing erased (0xFF) bytes from the image
        #[arg(long)]
        trim: bool,
    },

    /// Generate a JTAG SVF that writes an image into the SPI flash
    Svf {
        /// Image to program (a bitstream, or a data region image)
        #[arg(value_name = "IMAGE")]
        file: PathBuf,

        /// Output SVF file
        #[arg(short, long)]
        output: PathBuf,

        /// Flash byte offset (64 KiB-aligned)
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        offset: u32,

        /// FPGA IDCODE, when the image is not a bitstream
        #[arg(long, value_parser = parse_u32)]
        idcode: Option<u32>,
    },
}

fn parse_board(s: &str) -> Result<Board, String> {
    Board::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = Board::ALL.iter().map(|b| b.config().name).collect();
        format!("unknown board '{}' (expected one of: {})", s, names.join(", "))
    })
}

/// Decimal or `0x`-prefixed hex.
fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Boards => commands::boards(),
        Commands::Uf2 {
            file,
            output,
            board,
            offset,
        } => commands::uf2(&file, &output, board, offset),
        Commands::Image {
            file,
            output,
            board,
            policy,
            trim,
        } => commands::image(&file, &output, board, policy.into(), trim),
        Commands::Svf {
            file,
            output,
            offset,
            idcode,
        } => commands::svf(&file, &output, offset, idcode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u32_accepts_hex_and_decimal() {
        assert_eq!(parse_u32("0x80000"), Ok(0x8_0000));
        assert_eq!(parse_u32("0x0008_0000"), Ok(0x8_0000));
        assert_eq!(parse_u32("4096"), Ok(4096));
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_board_lists_names_on_error() {
        assert_eq!(parse_board("orangecart"), Ok(Board::OrangeCart));
        let err = parse_board("fomu").unwrap_err();
        assert!(err.contains("orangecrab-r0.1"));
    }

    #[test]
    fn test_cli_parses_image_command() {
        let cli = Cli::try_parse_from([
            "flashblk-tool",
            "image",
            "in.uf2",
            "-o",
            "out.bin",
            "--policy",
            "cached",
        ])
        .unwrap();
        match cli.command {
            Commands::Image { board, policy, .. } => {
                assert_eq!(board, Board::OrangeCrabR02);
                assert_eq!(ErasePolicy::from(policy), ErasePolicy::ReadModifyWrite);
            }
            _ => panic!("expected image command"),
        }
    }
}
