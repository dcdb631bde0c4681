// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Deferred reboot into a selected bitstream image.

use crate::ticks::is_past;

/// Magic in the upper bits of the reboot register.
pub const REBOOT_MAGIC: u8 = 0xAC;

/// Value to write to the reboot register to boot `image` (0..=3).
pub const fn reboot_value(image: u8) -> u8 {
    REBOOT_MAGIC | (image & 3)
}

/// The board's reboot register.
pub trait RebootControl {
    fn reboot(&mut self, value: u8) -> !;
}

/// Holds at most one pending reboot request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetScheduler {
    deadline: Option<u32>,
    image: u8,
}

impl ResetScheduler {
    pub const fn new() -> Self {
        Self {
            deadline: None,
            image: 0,
        }
    }

    /// Schedule a reboot into `image` once `delay_ms` have passed. A later
    /// request replaces an earlier one.
    pub fn request(&mut self, now: u32, delay_ms: u32, image: u8) {
        self.deadline = Some(now.wrapping_add(delay_ms));
        self.image = image;
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u32> {
        self.deadline
    }

    /// Reboot register value once `now` is past the deadline.
    pub fn poll(&self, now: u32) -> Option<u8> {
        let deadline = self.deadline?;
        is_past(now, deadline).then(|| reboot_value(self.image))
    }
}
