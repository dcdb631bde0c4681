// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the USB state machine and the RGB blink indicator.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use flashblk_common::indicator::{
    Indicator, UsbEvent, UsbState, BLINK_MOUNTED_MS, BLINK_SUSPENDED_MS, BLINK_UNMOUNTED_MS,
    BLINK_WRITING_MS,
};

/// Pin whose level can be observed after it is moved into the indicator.
#[derive(Clone, Default)]
struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

fn make_indicator() -> (Indicator<MockPin, MockPin, MockPin>, [MockPin; 3]) {
    let pins = [MockPin::default(), MockPin::default(), MockPin::default()];
    let ind = Indicator::new(pins[0].clone(), pins[1].clone(), pins[2].clone());
    (ind, pins)
}

// =============================================================================
// UsbState transitions
// =============================================================================

#[test]
fn test_initial_state_is_unmounted() {
    assert_eq!(UsbState::default(), UsbState::Unmounted);
}

#[test]
fn test_mount_and_unmount() {
    let s = UsbState::Unmounted.on_event(UsbEvent::Mount);
    assert_eq!(s, UsbState::Mounted);
    assert_eq!(s.on_event(UsbEvent::Unmount), UsbState::Unmounted);
}

#[test]
fn test_suspend_and_resume() {
    let s = UsbState::Mounted.on_event(UsbEvent::Suspend {
        remote_wakeup: false,
    });
    assert_eq!(s, UsbState::Suspended);
    assert_eq!(s.on_event(UsbEvent::Resume), UsbState::Mounted);
}

#[test]
fn test_suspend_ignores_remote_wakeup_flag() {
    let a = UsbState::Mounted.on_event(UsbEvent::Suspend {
        remote_wakeup: true,
    });
    let b = UsbState::Mounted.on_event(UsbEvent::Suspend {
        remote_wakeup: false,
    });
    assert_eq!(a, b);
}

#[test]
fn test_blink_intervals_per_state() {
    assert_eq!(UsbState::Unmounted.blink_interval_ms(), BLINK_UNMOUNTED_MS);
    assert_eq!(UsbState::Mounted.blink_interval_ms(), BLINK_MOUNTED_MS);
    assert_eq!(UsbState::Suspended.blink_interval_ms(), BLINK_SUSPENDED_MS);
}

// =============================================================================
// Indicator
// =============================================================================

#[test]
fn test_no_toggle_before_interval() {
    let (mut ind, pins) = make_indicator();

    assert!(!ind.poll(BLINK_UNMOUNTED_MS - 1));
    assert!(!ind.is_lit());
    assert!(!pins[1].is_high());
}

#[test]
fn test_toggle_shows_cyan_then_off() {
    let (mut ind, pins) = make_indicator();

    assert!(ind.poll(BLINK_UNMOUNTED_MS));
    assert!(ind.is_lit());
    assert!(!pins[0].is_high());
    assert!(pins[1].is_high());
    assert!(pins[2].is_high());

    assert!(ind.poll(2 * BLINK_UNMOUNTED_MS));
    assert!(!ind.is_lit());
    assert!(!pins[1].is_high());
    assert!(!pins[2].is_high());
}

#[test]
fn test_late_poll_catches_up_one_interval_at_a_time() {
    let (mut ind, _pins) = make_indicator();

    // Three intervals late: each poll consumes one
    let now = 3 * BLINK_UNMOUNTED_MS;
    assert!(ind.poll(now));
    assert!(ind.poll(now));
    assert!(ind.poll(now));
    assert!(!ind.poll(now));
}

#[test]
fn test_interval_follows_usb_events() {
    let (mut ind, _pins) = make_indicator();

    ind.handle_event(UsbEvent::Mount);
    assert_eq!(ind.state(), UsbState::Mounted);
    assert_eq!(ind.interval_ms(), BLINK_MOUNTED_MS);

    assert!(!ind.poll(BLINK_UNMOUNTED_MS));
    assert!(ind.poll(BLINK_MOUNTED_MS));
}

#[test]
fn test_writing_overrides_state_interval() {
    let (mut ind, _pins) = make_indicator();
    ind.set_state(UsbState::Mounted);

    ind.set_writing(true);
    assert_eq!(ind.interval_ms(), BLINK_WRITING_MS);

    ind.set_writing(false);
    assert_eq!(ind.interval_ms(), BLINK_MOUNTED_MS);
}
