// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Whole-file UF2 encoding and decoding.

use anyhow::{bail, Result};
use flashblk_common::uf2::{Uf2Record, UF2_RECORD_SIZE};
use flashblk_common::BLOCK_SIZE;

const PAYLOAD_LEN: usize = BLOCK_SIZE as usize;

/// Encode `data` as UF2 records of one block each, the first aimed at
/// `base_addr`. The last block is padded with 0xFF.
pub fn encode(data: &[u8], base_addr: u32, family_id: u32) -> Vec<u8> {
    let num_blocks = data.len().div_ceil(PAYLOAD_LEN) as u32;
    let mut out = Vec::with_capacity(num_blocks as usize * UF2_RECORD_SIZE);

    for (i, chunk) in data.chunks(PAYLOAD_LEN).enumerate() {
        let mut payload = [0xFFu8; PAYLOAD_LEN];
        payload[..chunk.len()].copy_from_slice(chunk);

        let addr = base_addr + (i * PAYLOAD_LEN) as u32;
        let record = Uf2Record::new(addr, i as u32, num_blocks, family_id, &payload);
        out.extend_from_slice(&record.to_bytes());
    }
    out
}

/// Split a UF2 file into its 512-byte records.
pub fn records(file: &[u8]) -> Result<impl Iterator<Item = &[u8]>> {
    if file.len() % UF2_RECORD_SIZE != 0 {
        bail!(
            "UF2 file is {} bytes, not a multiple of {}",
            file.len(),
            UF2_RECORD_SIZE
        );
    }
    Ok(file.chunks_exact(UF2_RECORD_SIZE))
}
