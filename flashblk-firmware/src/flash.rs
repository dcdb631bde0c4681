// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The flash translator singleton.
//!
//! The state lives in static storage filled once by `init`; a critical
//! section only moves the `&'static mut` in and out of the slot, so
//! requests run with interrupts enabled. A caller that finds the slot
//! empty gets `Error::Busy`.

use core::cell::RefCell;
use core::ptr::addr_of_mut;

use critical_section::Mutex;
use flashblk_common::spi_nor::SpiNorController;
use flashblk_common::ticks::SystemTicks;
use flashblk_common::uf2::Uf2Sink;
use flashblk_common::{BlockTranslator, Error, FlashController, Result};

use crate::board::{CONFIG, ERASE_POLICY};
use crate::lxspi::{LxSpiBitbang, LxSpiWindow};

pub type Controller = SpiNorController<LxSpiBitbang, LxSpiWindow>;
pub type Translator = BlockTranslator<Controller, SystemTicks>;

pub struct FlashState {
    pub translator: Translator,
    pub uf2: Uf2Sink,
}

/// Backing storage, written once by `init` before the slot is published.
static mut STATE: Option<FlashState> = None;
static FLASH: Mutex<RefCell<Option<&'static mut FlashState>>> = Mutex::new(RefCell::new(None));

/// Probe the flash part and publish the translator. Call once.
pub fn init() -> Result<()> {
    CONFIG.validate()?;

    let mut controller = SpiNorController::new(LxSpiBitbang::new(CONFIG.clock_hz), LxSpiWindow);
    controller.enter_command();
    match controller.read_jedec_id() {
        Some([mfr, ty, cap]) => {
            defmt::info!("flash: jedec id {=u8:02x} {=u8:02x} {=u8:02x}", mfr, ty, cap)
        }
        None => defmt::warn!("flash: no jedec id"),
    }
    controller.enter_memory_mapped();

    let translator = BlockTranslator::new(controller, SystemTicks, CONFIG, ERASE_POLICY);
    let state = FlashState {
        translator,
        uf2: Uf2Sink::new(CONFIG.family_id),
    };
    // SAFETY: single call from main; nothing else references STATE until
    // the slot below is published.
    let state: &'static mut FlashState = unsafe { (*addr_of_mut!(STATE)).insert(state) };

    critical_section::with(|cs| *FLASH.borrow(cs).borrow_mut() = Some(state));
    defmt::info!(
        "flash: {=u32} blocks at {=u32:#x}",
        CONFIG.block_count(),
        CONFIG.data_region_base
    );
    Ok(())
}

/// Run `f` with exclusive access to the flash state. Returns `Error::Busy`
/// when a request is already running or `init` has not been called.
pub fn with_flash<R>(f: impl FnOnce(&mut FlashState) -> R) -> Result<R> {
    let Some(state) = critical_section::with(|cs| FLASH.borrow(cs).borrow_mut().take()) else {
        return Err(Error::Busy);
    };

    let result = f(&mut *state);

    critical_section::with(|cs| *FLASH.borrow(cs).borrow_mut() = Some(state));
    Ok(result)
}
