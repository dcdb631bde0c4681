// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB connection state and the RGB blink task that reports it.
//!
//! The USB stack's mount/unmount/suspend/resume callbacks are folded into a
//! single [`UsbState::on_event`] transition; the indicator only reads the
//! resulting state.

use embedded_hal::digital::OutputPin;

use crate::ticks::elapsed_since;

pub const BLINK_UNMOUNTED_MS: u32 = 250;
pub const BLINK_MOUNTED_MS: u32 = 1000;
pub const BLINK_SUSPENDED_MS: u32 = 2500;
/// Blink interval while a UF2 transfer is in progress.
pub const BLINK_WRITING_MS: u32 = 100;

/// Connection state as seen by the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbState {
    #[default]
    Unmounted,
    Mounted,
    Suspended,
}

/// Events reported by the USB stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    Mount,
    Unmount,
    Suspend { remote_wakeup: bool },
    Resume,
}

impl UsbState {
    /// State after `event`.
    pub fn on_event(self, event: UsbEvent) -> UsbState {
        match event {
            UsbEvent::Mount => UsbState::Mounted,
            UsbEvent::Unmount => UsbState::Unmounted,
            UsbEvent::Suspend { .. } => UsbState::Suspended,
            UsbEvent::Resume => UsbState::Mounted,
        }
    }

    pub fn blink_interval_ms(self) -> u32 {
        match self {
            UsbState::Unmounted => BLINK_UNMOUNTED_MS,
            UsbState::Mounted => BLINK_MOUNTED_MS,
            UsbState::Suspended => BLINK_SUSPENDED_MS,
        }
    }
}

/// Blinks an RGB LED between off and cyan at the state's interval.
pub struct Indicator<R, G, B> {
    red: R,
    green: G,
    blue: B,
    state: UsbState,
    writing: bool,
    start_ms: u32,
    lit: bool,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Indicator<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self {
            red,
            green,
            blue,
            state: UsbState::Unmounted,
            writing: false,
            start_ms: 0,
            lit: false,
        }
    }

    pub fn state(&self) -> UsbState {
        self.state
    }

    pub fn set_state(&mut self, state: UsbState) {
        self.state = state;
    }

    pub fn handle_event(&mut self, event: UsbEvent) {
        self.state = self.state.on_event(event);
    }

    pub fn set_writing(&mut self, writing: bool) {
        self.writing = writing;
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn interval_ms(&self) -> u32 {
        if self.writing {
            BLINK_WRITING_MS
        } else {
            self.state.blink_interval_ms()
        }
    }

    /// Toggle the LED if an interval has passed since the last toggle.
    /// Returns true when it toggled.
    pub fn poll(&mut self, now: u32) -> bool {
        let interval = self.interval_ms();
        if elapsed_since(self.start_ms, now) < interval {
            return false;
        }
        self.start_ms = self.start_ms.wrapping_add(interval);

        self.lit = !self.lit;
        self.show(self.lit);
        true
    }

    fn show(&mut self, lit: bool) {
        self.red.set_low().ok();
        if lit {
            self.green.set_high().ok();
            self.blue.set_high().ok();
        } else {
            self.green.set_low().ok();
            self.blue.set_low().ok();
        }
    }

    pub fn release(self) -> (R, G, B) {
        (self.red, self.green, self.blue)
    }
}
