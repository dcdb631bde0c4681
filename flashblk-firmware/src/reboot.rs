// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Warm boot through the ECP5 reboot register.

use flashblk_common::reset::RebootControl;

use crate::csr::{self, reboot};

pub struct LiteXReboot;

impl RebootControl for LiteXReboot {
    fn reboot(&mut self, value: u8) -> ! {
        defmt::info!("rebooting (ctrl={=u8:#x})", value);
        csr::write(reboot::CTRL, u32::from(value));
        loop {
            core::hint::spin_loop();
        }
    }
}
