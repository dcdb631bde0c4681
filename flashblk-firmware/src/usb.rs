// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Binding to the TinyUSB device stack.
//!
//! TinyUSB (with the LiteX eptri driver and the UF2 mass-storage class) is
//! linked in as a static C library. It calls back into the `board_*` and
//! `tud_*_cb` symbols exported here; status words are 0 on success and
//! negative on error.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use flashblk_common::error::status_word;
use flashblk_common::indicator::{UsbEvent, UsbState};
use flashblk_common::layout::{BLOCK_SIZE, RESET_DELAY_MS};
use flashblk_common::reset::ResetScheduler;
use flashblk_common::ticks::SystemTicks;
use flashblk_common::uf2::{Uf2Error, Uf2Status};
use flashblk_common::Error;

use crate::board::CONFIG;
use crate::flash;
use crate::irq::{self, USB_INTERRUPT};

mod ffi {
    extern "C" {
        pub fn tusb_init() -> bool;
        pub fn tud_task_ext(timeout_ms: u32, in_isr: bool);
        pub fn dcd_int_handler(rhport: u8);
    }
}

/// Status word for a record that was valid but not for this board.
const UF2_IGNORED: i32 = 1;

static USB_STATE: Mutex<Cell<UsbState>> = Mutex::new(Cell::new(UsbState::Unmounted));
static RESET: Mutex<Cell<ResetScheduler>> = Mutex::new(Cell::new(ResetScheduler::new()));
static WRITING: AtomicBool = AtomicBool::new(false);

pub fn init() {
    // SAFETY: called once from main before the USB interrupt is unmasked.
    if !unsafe { ffi::tusb_init() } {
        defmt::error!("usb: tusb_init failed");
        return;
    }
    irq::unmask(USB_INTERRUPT);
}

/// Run the device stack until its event queue is empty.
pub fn task() {
    // SAFETY: only called from the main loop.
    unsafe { ffi::tud_task_ext(u32::MAX, false) }
}

/// USB line handler, called from the interrupt router.
pub fn on_interrupt() {
    // SAFETY: TinyUSB's device interrupt handler for root port 0.
    unsafe { ffi::dcd_int_handler(0) }
}

pub fn state() -> UsbState {
    critical_section::with(|cs| USB_STATE.borrow(cs).get())
}

/// True while a UF2 transfer has started and not finished.
pub fn is_writing() -> bool {
    WRITING.load(Ordering::Relaxed)
}

/// Reboot register value once a requested reset is due.
pub fn reset_due(now: u32) -> Option<u8> {
    critical_section::with(|cs| RESET.borrow(cs).get().poll(now))
}

fn on_event(event: UsbEvent) {
    critical_section::with(|cs| {
        let state = USB_STATE.borrow(cs);
        state.set(state.get().on_event(event));
    });
    defmt::debug!("usb: {}", event);
}

fn request_reset() {
    let now = SystemTicks::now();
    critical_section::with(|cs| {
        let reset = RESET.borrow(cs);
        let mut sched = reset.get();
        sched.request(now, RESET_DELAY_MS, CONFIG.boot_image);
        reset.set(sched);
    });
    defmt::info!("uf2: update complete, reboot in {=u32} ms", RESET_DELAY_MS);
}

fn block_len(lba: u32, num_blocks: u32) -> Result<usize, Error> {
    (num_blocks as usize)
        .checked_mul(BLOCK_SIZE as usize)
        .ok_or(Error::OutOfRange {
            lba,
            count: num_blocks,
        })
}

// --- TinyUSB device callbacks ---

#[unsafe(no_mangle)]
extern "C" fn tud_mount_cb() {
    on_event(UsbEvent::Mount);
}

#[unsafe(no_mangle)]
extern "C" fn tud_umount_cb() {
    on_event(UsbEvent::Unmount);
}

#[unsafe(no_mangle)]
extern "C" fn tud_suspend_cb(remote_wakeup_en: bool) {
    on_event(UsbEvent::Suspend {
        remote_wakeup: remote_wakeup_en,
    });
}

#[unsafe(no_mangle)]
extern "C" fn tud_resume_cb() {
    on_event(UsbEvent::Resume);
}

// --- Board hooks used by the UF2 class ---

#[unsafe(no_mangle)]
extern "C" fn board_millis() -> u32 {
    SystemTicks::now()
}

/// # Safety
///
/// `dest` must be valid for writes of `num_blocks * 256` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn board_flash_read_blocks(dest: *mut u8, lba: u32, num_blocks: u32) -> i32 {
    if num_blocks == 0 {
        return 0;
    }
    let len = match block_len(lba, num_blocks) {
        Ok(len) if !dest.is_null() => len,
        Ok(len) => return Error::BufferTooSmall { needed: len, actual: 0 }.status_code(),
        Err(e) => return e.status_code(),
    };
    // SAFETY: non-null, and the caller guarantees `len` writable bytes.
    let dest = unsafe { core::slice::from_raw_parts_mut(dest, len) };

    let result = flash::with_flash(|s| s.translator.read_blocks(dest, lba, num_blocks)).and_then(|r| r);
    if let Err(e) = result {
        defmt::warn!("usb: read {=u32}+{=u32} failed: {}", lba, num_blocks, e);
    }
    status_word(result)
}

/// # Safety
///
/// `src` must be valid for reads of `num_blocks * 256` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn board_flash_write_blocks(src: *const u8, lba: u32, num_blocks: u32) -> i32 {
    if num_blocks == 0 {
        return 0;
    }
    let len = match block_len(lba, num_blocks) {
        Ok(len) if !src.is_null() => len,
        Ok(len) => return Error::BufferTooSmall { needed: len, actual: 0 }.status_code(),
        Err(e) => return e.status_code(),
    };
    // SAFETY: non-null, and the caller guarantees `len` readable bytes.
    let src = unsafe { core::slice::from_raw_parts(src, len) };

    let result = flash::with_flash(|s| s.translator.write_blocks(src, lba, num_blocks)).and_then(|r| r);
    if let Err(e) = result {
        defmt::warn!("usb: write {=u32}+{=u32} failed: {}", lba, num_blocks, e);
    }
    status_word(result)
}

#[unsafe(no_mangle)]
extern "C" fn board_flash_flush() -> i32 {
    status_word(flash::with_flash(|s| s.translator.flush()).and_then(|r| r))
}

/// Decode one 512-byte UF2 record and write it.
///
/// Returns 0 when written, 1 when the record is for another target, and
/// a negative status word on error.
///
/// # Safety
///
/// `data` must be valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn board_uf2_write_record(data: *const u8, len: usize) -> i32 {
    if data.is_null() {
        return Uf2Error::Truncated { len: 0 }.status_code();
    }
    // SAFETY: non-null, and the caller guarantees `len` readable bytes.
    let bytes = unsafe { core::slice::from_raw_parts(data, len) };

    let outcome = flash::with_flash(|s| {
        let was_complete = s.uf2.is_complete();
        let result = s.uf2.write_record(&mut s.translator, bytes);
        WRITING.store(s.uf2.in_progress(), Ordering::Relaxed);
        (result, !was_complete && s.uf2.is_complete())
    });

    let result = match outcome {
        Ok((result, completed)) => {
            if completed {
                request_reset();
            }
            result
        }
        Err(e) => return e.status_code(),
    };

    match result {
        Ok(Uf2Status::Written { .. }) | Ok(Uf2Status::Complete { .. }) => 0,
        Ok(Uf2Status::Ignored) => UF2_IGNORED,
        Err(e) => {
            defmt::warn!("uf2: record rejected: {}", e);
            e.status_code()
        }
    }
}
