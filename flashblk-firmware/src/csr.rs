// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! LiteX CSR bus access.
//!
//! With a 32-bit CSR data width every register is one word, and each
//! peripheral owns a 0x800-byte slot at `CSR_BASE + index * 0x800`.

use flashblk_common::layout::CSR_BASE;

const SLOT_SIZE: u32 = 0x800;

/// Address of register `reg` (word index) of the peripheral in CSR slot `index`.
pub const fn csr_addr(index: u32, reg: u32) -> usize {
    (CSR_BASE + index * SLOT_SIZE + reg * 4) as usize
}

#[inline(always)]
pub fn read(addr: usize) -> u32 {
    // SAFETY: `addr` comes from `csr_addr` and names a mapped CSR.
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
pub fn write(addr: usize, value: u32) {
    // SAFETY: `addr` comes from `csr_addr` and names a mapped CSR.
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

pub mod timer0 {
    use super::csr_addr;

    const INDEX: u32 = 5;

    pub const LOAD: usize = csr_addr(INDEX, 0);
    pub const RELOAD: usize = csr_addr(INDEX, 1);
    pub const EN: usize = csr_addr(INDEX, 2);
    pub const EV_PENDING: usize = csr_addr(INDEX, 6);
    pub const EV_ENABLE: usize = csr_addr(INDEX, 7);
}

pub mod reboot {
    use super::csr_addr;

    pub const CTRL: usize = csr_addr(12, 0);
}

pub mod rgb {
    use super::csr_addr;

    const INDEX: u32 = 13;

    pub const CONFIG: usize = csr_addr(INDEX, 0);
    pub const R: usize = csr_addr(INDEX, 1);
    pub const G: usize = csr_addr(INDEX, 2);
    pub const B: usize = csr_addr(INDEX, 3);
}

pub mod lxspi {
    use super::csr_addr;

    const INDEX: u32 = 15;

    pub const BITBANG: usize = csr_addr(INDEX, 0);
    pub const MISO: usize = csr_addr(INDEX, 1);
    pub const BITBANG_EN: usize = csr_addr(INDEX, 2);

    // BITBANG register fields
    pub const MOSI: u32 = 1 << 0;
    pub const CLK: u32 = 1 << 1;
    pub const CS_N: u32 = 1 << 2;
    pub const DIR: u32 = 1 << 3;
}
