// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the deferred reboot scheduler and the tick helpers.

use flashblk_common::reset::{reboot_value, ResetScheduler, REBOOT_MAGIC};
use flashblk_common::ticks::{elapsed_since, is_past, StepClock, SystemTicks, TickSource};

// =============================================================================
// reboot_value tests
// =============================================================================

#[test]
fn test_reboot_value_carries_magic() {
    assert_eq!(reboot_value(0), 0xAC);
    assert_eq!(reboot_value(0) & 0xFC, REBOOT_MAGIC);
}

#[test]
fn test_reboot_value_masks_image_index() {
    assert_eq!(reboot_value(1), 0xAD);
    assert_eq!(reboot_value(3), 0xAF);
    assert_eq!(reboot_value(5), 0xAD);
}

// =============================================================================
// ResetScheduler tests
// =============================================================================

#[test]
fn test_idle_scheduler_never_fires() {
    let sched = ResetScheduler::new();
    assert!(!sched.is_pending());
    assert_eq!(sched.poll(0), None);
    assert_eq!(sched.poll(u32::MAX), None);
}

#[test]
fn test_fires_only_after_deadline() {
    let mut sched = ResetScheduler::new();
    sched.request(100, 1000, 0);

    assert_eq!(sched.deadline(), Some(1100));
    assert_eq!(sched.poll(1099), None);
    assert_eq!(sched.poll(1100), None);
    assert_eq!(sched.poll(1101), Some(reboot_value(0)));
}

#[test]
fn test_later_request_replaces_earlier() {
    let mut sched = ResetScheduler::new();
    sched.request(0, 10, 0);
    sched.request(5, 100, 2);

    assert_eq!(sched.poll(50), None);
    assert_eq!(sched.poll(200), Some(reboot_value(2)));
}

#[test]
fn test_cancel_clears_request() {
    let mut sched = ResetScheduler::new();
    sched.request(0, 10, 1);
    sched.cancel();

    assert!(!sched.is_pending());
    assert_eq!(sched.poll(1000), None);
}

#[test]
fn test_deadline_across_tick_wrap() {
    let mut sched = ResetScheduler::new();
    sched.request(u32::MAX - 10, 100, 0);

    assert_eq!(sched.poll(u32::MAX), None);
    assert_eq!(sched.poll(50), None);
    assert_eq!(sched.poll(100), Some(reboot_value(0)));
}

// =============================================================================
// Tick helpers
// =============================================================================

#[test]
fn test_elapsed_since_wraps() {
    assert_eq!(elapsed_since(10, 25), 15);
    assert_eq!(elapsed_since(u32::MAX - 4, 5), 10);
}

#[test]
fn test_is_past_is_strict() {
    assert!(!is_past(100, 100));
    assert!(is_past(101, 100));
    assert!(!is_past(99, 100));
    assert!(is_past(3, u32::MAX - 3));
}

#[test]
fn test_step_clock_advances_per_read() {
    let clock = StepClock::new(7, 3);
    assert_eq!(clock.now_ms(), 7);
    assert_eq!(clock.now_ms(), 10);
    assert_eq!(clock.peek(), 13);

    clock.set(0);
    assert_eq!(clock.now_ms(), 0);
}

#[test]
fn test_system_ticks_count_up() {
    let before = SystemTicks::now();
    SystemTicks::tick();
    SystemTicks::tick();
    // Other tests never tick, so the difference is exact
    assert_eq!(elapsed_since(before, SystemTicks.now_ms()), 2);
}
