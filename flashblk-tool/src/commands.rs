// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use flashblk_common::layout::ERASED_BYTE;
use flashblk_common::sim::SimFlash;
use flashblk_common::ticks::StepClock;
use flashblk_common::uf2::{Uf2Sink, Uf2Status};
use flashblk_common::{Board, BlockTranslator, BoardConfig, ErasePolicy, BLOCK_SIZE, SECTOR_SIZE};

use crate::svf::{self, FlashParams};
use crate::uf2_file;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const SVF_ERASE_ALIGN: u32 = 64 * 1024;

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// List board profiles.
pub fn boards() -> Result<()> {
    println!(
        "{:<18} {:>10} {:>12} {:>12} {:>8} {:>10}",
        "BOARD", "FLASH", "DATA BASE", "MMAP BASE", "BLOCKS", "FAMILY"
    );
    for board in Board::ALL {
        let c = board.config();
        println!(
            "{:<18} {:>7} KiB {:>#12x} {:>#12x} {:>8} {:>#10x}",
            c.name,
            c.flash_size / 1024,
            c.data_region_base,
            c.mmap_base(),
            c.block_count(),
            c.family_id
        );
    }
    Ok(())
}

/// The firmware erases a sector only when a write starts on its first
/// block, so a transfer must begin on a sector boundary.
fn check_uf2_placement(config: &BoardConfig, offset: u32, len: usize) -> Result<()> {
    if offset % SECTOR_SIZE != 0 {
        bail!("Offset 0x{:x} is not a multiple of {} bytes", offset, SECTOR_SIZE);
    }
    let end = offset as u64 + len as u64;
    if end > config.region_len() as u64 {
        bail!(
            "{} bytes at offset 0x{:x} do not fit in the {} KiB data region of {}",
            len,
            offset,
            config.region_len() / 1024,
            config.name
        );
    }
    Ok(())
}

/// Wrap a binary into a UF2 file for the board's data region.
pub fn uf2(file: &Path, output: &Path, board: Board, offset: u32) -> Result<()> {
    let config = board.config();
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    check_uf2_placement(&config, offset, data.len())?;

    let base_addr = config.mmap_base() + offset;
    let encoded = uf2_file::encode(&data, base_addr, config.family_id);
    fs::write(output, &encoded).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Input:  {} ({} bytes, CRC32: 0x{:08x})",
        file.display(),
        data.len(),
        CRC32.checksum(&data)
    );
    println!(
        "Output: {} ({} blocks at 0x{:08x}, family 0x{:08x})",
        output.display(),
        data.len().div_ceil(BLOCK_SIZE as usize),
        base_addr,
        config.family_id
    );
    Ok(())
}

/// Replay a UF2 file through the translator and write the data region image.
pub fn image(file: &Path, output: &Path, board: Board, policy: ErasePolicy, trim: bool) -> Result<()> {
    let config = board.config();
    let input = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let records = uf2_file::records(&input)?;

    let mut flash = vec![ERASED_BYTE; config.flash_size as usize];
    let mut translator = BlockTranslator::new(
        SimFlash::new(&mut flash),
        StepClock::new(0, 1),
        config,
        policy,
    );
    let mut sink = Uf2Sink::new(config.family_id);

    let pb = progress_bar((input.len() / 512) as u64)?;
    let (mut written, mut ignored, mut complete) = (0u32, 0u32, false);
    for (i, record) in records.enumerate() {
        match sink.write_record(&mut translator, record) {
            Ok(Uf2Status::Written { .. }) => written += 1,
            Ok(Uf2Status::Complete { lba }) => {
                if lba.is_some() {
                    written += 1;
                } else {
                    ignored += 1;
                }
                complete = true;
            }
            Ok(Uf2Status::Ignored) => ignored += 1,
            Err(e) => {
                pb.abandon();
                bail!("Record {} rejected: {}", i, e);
            }
        }
        pb.inc(1);
    }
    translator.flush().context("Failed to flush the translator")?;
    pb.finish_and_clear();

    let (erases, programs, violations) = {
        let sim = translator.release();
        (sim.erase_count(), sim.program_count(), sim.violations())
    };
    if violations.total() != 0 {
        bail!("Flash controller misuse during replay: {:?}", violations);
    }

    let region = &flash[config.data_region_base as usize..];
    let region = if trim {
        let used = region.iter().rposition(|&b| b != ERASED_BYTE).map_or(0, |i| i + 1);
        &region[..used]
    } else {
        region
    };

    let mut out = BufWriter::new(
        fs::File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    out.write_all(region)?;
    out.flush()?;

    println!("Board:    {} ({:?})", config.name, policy);
    println!("Records:  {} written, {} ignored", written, ignored);
    if !complete {
        println!("Warning:  transfer did not complete, some blocks are missing");
    }
    println!("Flash:    {} sector erases, {} page programs", erases, programs);
    println!(
        "Image:    {} ({} bytes, CRC32: 0x{:08x})",
        output.display(),
        region.len(),
        CRC32.checksum(region)
    );
    Ok(())
}

/// Write an SVF that programs `file` into the SPI flash at `offset`.
pub fn svf(file: &Path, output: &Path, offset: u32, idcode: Option<u32>) -> Result<()> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if offset % SVF_ERASE_ALIGN != 0 {
        bail!("Offset 0x{:x} is not 64 KiB-aligned", offset);
    }
    let idcode = match idcode.or_else(|| svf::find_idcode(&image)) {
        Some(id) => id,
        None => bail!("No IDCODE found in {}; pass --idcode", file.display()),
    };

    let out = BufWriter::new(
        fs::File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    let mut out = svf::write_svf(out, &image, offset, idcode, FlashParams::default())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    out.flush()?;

    println!(
        "SVF:    {} ({} bytes at 0x{:06x}, IDCODE 0x{:08x}, CRC32: 0x{:08x})",
        output.display(),
        image.len(),
        offset,
        idcode,
        CRC32.checksum(&image)
    );
    Ok(())
}
