// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RGB LED PWM channels as on/off output pins.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::csr::{self, rgb};

/// PWM duty written for "on".
const ON_LEVEL: u32 = 250;

pub struct RgbChannel {
    reg: usize,
}

impl ErrorType for RgbChannel {
    type Error = Infallible;
}

impl OutputPin for RgbChannel {
    fn set_low(&mut self) -> Result<(), Infallible> {
        csr::write(self.reg, 0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        csr::write(self.reg, ON_LEVEL);
        Ok(())
    }
}

/// Put the PWM core in direct mode and return the red, green and blue channels.
pub fn init() -> (RgbChannel, RgbChannel, RgbChannel) {
    csr::write(rgb::CONFIG, 0);
    (
        RgbChannel { reg: rgb::R },
        RgbChannel { reg: rgb::G },
        RgbChannel { reg: rgb::B },
    )
}
