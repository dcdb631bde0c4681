// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SVF generation for programming the SPI flash through an ECP5.
//!
//! The FPGA is erased and put into background SPI mode, after which each
//! DR scan is one SPI transaction on the configuration flash. JTAG shifts
//! LSB first from the right of the hex string, so every transaction is
//! written byte-reversed with each byte's bits reversed.

use std::fmt::Write as _;
use std::io::{self, Write};

use flashblk_common::spi_nor::opcodes;
use flashblk_common::PAGE_SIZE;

/// Parameters of the SPI flash part and its command set.
#[derive(Clone, Debug)]
pub struct FlashParams {
    pub jedec_id: u32,
    pub write_disable: u8,
    pub read_status: u8,
    pub write_enable: u8,
    pub block_erase: u8,
    pub block_erase_size: u32,
    /// Seconds.
    pub block_erase_time: f64,
    pub page_program: u8,
    pub page_size: usize,
    /// Seconds.
    pub page_program_time: f64,
    pub fast_read: u8,
    pub jedec_id_opcode: u8,
}

impl Default for FlashParams {
    /// Winbond W25Q128JV, as fitted to OrangeCrab and OrangeCart.
    fn default() -> Self {
        Self {
            jedec_id: 0xEF_4018,
            write_disable: opcodes::WRITE_DISABLE,
            read_status: opcodes::READ_STATUS,
            write_enable: opcodes::WRITE_ENABLE,
            block_erase: opcodes::BLOCK_ERASE_64K,
            block_erase_size: 64 * 1024,
            block_erase_time: 2.0,
            page_program: opcodes::PAGE_PROGRAM,
            page_size: PAGE_SIZE as usize,
            page_program_time: 3e-3,
            fast_read: opcodes::FAST_READ,
            jedec_id_opcode: opcodes::JEDEC_ID,
        }
    }
}

const LINE_WIDTH: usize = 79;

/// Hex string of `data` as JTAG shifts it: last byte first, bits reversed.
pub fn reverse_bits(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for b in data.iter().rev() {
        let _ = write!(s, "{:02X}", b.reverse_bits());
    }
    s
}

/// Find the IDCODE in an ECP5 bitstream header (`E2 00 00 00` + IDCODE).
pub fn find_idcode(bitstream: &[u8]) -> Option<u32> {
    let head = &bitstream[..bitstream.len().min(256)];
    let pos = head.windows(4).position(|w| w == [0xE2, 0x00, 0x00, 0x00])?;
    let id = head.get(pos + 4..pos + 8)?;
    Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
}

/// Greedy word wrap with a two-space continuation indent; words longer than
/// a line are split.
fn wrap(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / LINE_WIDTH * 3);
    let mut current = String::new();

    for word in line.split(' ') {
        let mut word = word;
        loop {
            let indent = if out.is_empty() && current.is_empty() { 0 } else { 2 };
            let sep = usize::from(!current.is_empty());
            let room = LINE_WIDTH.saturating_sub(current.len().max(indent) + sep);

            if word.len() <= room {
                if current.is_empty() && !out.is_empty() {
                    current.push_str("  ");
                } else if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                break;
            }
            if current.trim().is_empty() {
                // Word alone does not fit: split it
                if !out.is_empty() {
                    current.push_str("  ");
                }
                let (head, tail) = word.split_at(room);
                current.push_str(head);
                word = tail;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&current);
            current.clear();
        }
    }
    if !current.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&current);
    }
    out
}

/// Writes SVF statements to `out`.
pub struct SvfWriter<W> {
    out: W,
    params: FlashParams,
}

impl<W: Write> SvfWriter<W> {
    pub fn new(out: W, params: FlashParams) -> Self {
        Self { out, params }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One SPI transaction with no expected response.
    fn exchange(&mut self, data: &[u8]) -> io::Result<()> {
        let tdi = reverse_bits(data);
        writeln!(self.out, "{}", wrap(&format!("SDR {} TDI ({});", 4 * tdi.len(), tdi)))
    }

    /// One SPI transaction whose response must match `expect` under `mask`,
    /// skipping the first `ignore` bytes.
    fn exchange_expect(&mut self, data: &[u8], expect: &[u8], mask: Option<&[u8]>, ignore: usize) -> io::Result<()> {
        if expect.len() <= ignore || data.is_empty() {
            return self.exchange(data);
        }

        let mut mask_bytes = vec![0u8; ignore];
        match mask {
            Some(m) => {
                for i in ignore..expect.len() {
                    mask_bytes.push(m.get(i).copied().unwrap_or(0));
                }
            }
            None => mask_bytes.resize(expect.len(), 0xFF),
        }

        let tdi = reverse_bits(data);
        let mut tdo = reverse_bits(expect);
        let mut mask = reverse_bits(&mask_bytes);
        if tdo.len() < tdi.len() {
            let pad = "0".repeat(tdi.len() - tdo.len());
            tdo.insert_str(0, &pad);
            mask.insert_str(0, &pad);
        } else {
            tdo = tdo.split_off(tdo.len() - tdi.len());
            mask = mask.split_off(mask.len() - tdi.len());
        }

        writeln!(
            self.out,
            "{}",
            wrap(&format!(
                "SDR {} TDI ({}) TDO ({}) MASK ({});",
                4 * tdi.len(),
                tdi,
                tdo,
                mask
            ))
        )
    }

    fn check_not_busy(&mut self) -> io::Result<()> {
        let opcode = self.params.read_status;
        self.exchange_expect(&[opcode, 0], &[0, 0], Some(&[0, 1]), 1)
    }

    fn delay(&mut self, seconds: f64) -> io::Result<()> {
        writeln!(self.out, "RUNTEST IDLE {} SEC;", seconds)
    }

    fn address_command(opcode: u8, addr: u32) -> [u8; 4] {
        ((u32::from(opcode) << 24) | (addr & 0x00FF_FFFF)).to_be_bytes()
    }

    /// Reset the FPGA and enter background SPI mode.
    pub fn header(&mut self, idcode: u32) -> io::Result<()> {
        write!(self.out, "{}", HEADER.replace("{IDCODE}", &format!("{:08X}", idcode)))
    }

    pub fn footer(&mut self) -> io::Result<()> {
        write!(self.out, "{}", FOOTER)
    }

    /// Erase, program and then verify `image` at flash offset `offset`.
    pub fn program(&mut self, image: &[u8], offset: u32) -> io::Result<()> {
        let p = self.params.clone();

        let jedec = p.jedec_id.to_be_bytes();
        self.exchange_expect(&[p.jedec_id_opcode, 0, 0, 0], &jedec, None, 1)?;
        self.check_not_busy()?;

        let mut current_block = None;
        let mut addr = offset;
        for page in image.chunks(p.page_size) {
            let block = addr / p.block_erase_size;
            if current_block != Some(block) {
                current_block = Some(block);
                self.exchange(&[p.write_enable])?;
                self.exchange(&Self::address_command(p.block_erase, addr))?;
                self.delay(p.block_erase_time)?;
                self.check_not_busy()?;
            }

            let mut cmd = Self::address_command(p.page_program, addr).to_vec();
            cmd.extend_from_slice(page);
            self.exchange(&[p.write_enable])?;
            self.exchange(&cmd)?;
            self.delay(p.page_program_time)?;
            self.check_not_busy()?;

            addr += page.len() as u32;
        }
        self.exchange(&[p.write_disable])?;

        let mut addr = offset;
        for page in image.chunks(p.page_size) {
            // Opcode, 3 address bytes and one dummy byte, then the data
            let mut cmd = Self::address_command(p.fast_read, addr).to_vec();
            cmd.push(0);
            let mut expect = vec![0u8; cmd.len()];
            cmd.resize(cmd.len() + page.len(), 0);
            expect.extend_from_slice(page);
            self.exchange_expect(&cmd, &expect, None, 5)?;

            addr += page.len() as u32;
        }
        Ok(())
    }
}

/// Write a complete SVF programming `image` at `offset`.
pub fn write_svf<W: Write>(out: W, image: &[u8], offset: u32, idcode: u32, params: FlashParams) -> io::Result<W> {
    let mut svf = SvfWriter::new(out, params);
    svf.header(idcode)?;
    svf.program(image, offset)?;
    svf.footer()?;
    Ok(svf.into_inner())
}

const HEADER: &str = "
STATE RESET;
HDR   0;
HIR   0;
TDR   0;
TIR   0;
ENDDR DRPAUSE;
ENDIR IRPAUSE;
STATE IDLE;

SIR   8   TDI (E0);
SDR   32  TDI (00000000) TDO ({IDCODE}) MASK (FFFFFFFF);
SIR   8   TDI (1C);
SDR   510 TDI (3FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF
      FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF);

// Enter Programming mode
SIR   8   TDI (C6);
SDR   8   TDI (00);
RUNTEST IDLE 2 TCK 1.00E-02 SEC;

// Erase
SIR   8   TDI (0E);
SDR   8   TDI (01);
RUNTEST IDLE 2 TCK 2.0E-1 SEC;

// Read STATUS
SIR   8   TDI (3C);
SDR   32  TDI (00000000) TDO  (00000000) MASK (0000B000);

// Exit Programming mode
SIR   8   TDI (26);
RUNTEST IDLE 2 TCK 1.00E-02 SEC;

// BYPASS
SIR   8   TDI (FF);
STATE IDLE;
RUNTEST 32 TCK;
RUNTEST 2.00E-2 SEC;
// Enter SPI mode
ENDDR IDLE;
SIR   8   TDI (3A);
SDR   16  TDI (68FE);
RUNTEST 32 TCK;
RUNTEST 2.00E-2 SEC;
SDR   64  TDI (FFFFFFFFFFFFFFFF);
SDR   2   TDI (3);
SDR   8   TDI (FF);

";

const FOOTER: &str = "
SIR   8   TDI (79);
RUNTEST IDLE 32 TCK;

";
