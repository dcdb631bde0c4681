// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the block translator with the sector-boundary erase policy.

use flashblk_common::layout::{BoardConfig, SPIFLASH_WINDOW_BASE};
use flashblk_common::sim::{FlashOp, SimFlash};
use flashblk_common::ticks::StepClock;
use flashblk_common::{BlockTranslator, ControllerMode, ErasePolicy, Error};

const FLASH_SIZE: usize = 64 * 1024;

/// Board with the data region at offset 0 so flash offsets equal block offsets.
fn test_config() -> BoardConfig {
    BoardConfig {
        name: "test",
        flash_size: FLASH_SIZE as u32,
        data_region_base: 0,
        clock_hz: 12_000_000,
        family_id: 0,
        boot_image: 0,
    }
}

fn make_translator(mem: &mut [u8]) -> BlockTranslator<SimFlash<'_>, StepClock> {
    BlockTranslator::new(
        SimFlash::new(mem).with_busy_polls(3),
        StepClock::new(0, 1),
        test_config(),
        ErasePolicy::SectorBoundary,
    )
}

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

fn commands(t: &BlockTranslator<SimFlash<'_>, StepClock>) -> Vec<FlashOp> {
    t.controller().commands().copied().collect()
}

fn program(offset: u32) -> FlashOp {
    FlashOp::PageProgram { offset, len: 256 }
}

// =============================================================================
// Concrete scenarios
// =============================================================================

#[test]
fn test_single_block_write_erases_then_programs() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let a = [0xAAu8; 256];

    t.write_blocks(&a, 0, 1).unwrap();

    assert_eq!(commands(&t), vec![FlashOp::SectorErase(0), program(0)]);

    let mut out = [0u8; 256];
    t.read_blocks(&mut out, 0, 1).unwrap();
    assert_eq!(out, a);
}

#[test]
fn test_two_sector_write_sequence() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let b = ramp(8192);

    t.write_blocks(&b, 0, 32).unwrap();

    let mut expected = vec![FlashOp::SectorErase(0)];
    expected.extend((0..16).map(|i| program(i * 256)));
    expected.push(FlashOp::SectorErase(0x1000));
    expected.extend((16..32).map(|i| program(i * 256)));
    assert_eq!(commands(&t), expected);

    let mut out = vec![0u8; 8192];
    t.read_blocks(&mut out, 0, 32).unwrap();
    assert_eq!(out, b);
}

#[test]
fn test_write_straddling_sector_boundary() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let c: Vec<u8> = (0..1024).map(|i| (i / 256 + 1) as u8).collect();

    t.write_blocks(&c, 14, 4).unwrap();

    assert_eq!(
        commands(&t),
        vec![
            program(14 * 256),
            program(15 * 256),
            FlashOp::SectorErase(0x1000),
            program(16 * 256),
            program(17 * 256),
        ]
    );

    let mut out = vec![0u8; 32 * 256];
    t.read_blocks(&mut out, 0, 32).unwrap();
    assert!(out[..14 * 256].iter().all(|&b| b == 0xFF));
    assert_eq!(&out[14 * 256..16 * 256], &c[..512]);
    assert_eq!(&out[16 * 256..18 * 256], &c[512..]);
    assert!(out[18 * 256..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_read_of_erased_sector_returns_ff() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);

    let mut out = vec![0u8; 4096];
    t.read_blocks(&mut out, 16, 16).unwrap();
    assert!(out.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_zero_length_write_is_noop() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);

    t.write_blocks(&[], 0, 0).unwrap();

    assert!(t.controller().ops().is_empty());
    assert_eq!(t.mode(), ControllerMode::MemoryMapped);
}

#[test]
fn test_zero_length_read_is_noop() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&[0u8; 256], 0, 1).unwrap();
    t.controller_mut().clear_ops();

    t.read_blocks(&mut [], 0, 0).unwrap();

    assert!(t.controller().ops().is_empty());
    assert_eq!(t.mode(), ControllerMode::Command);
}

#[test]
fn test_read_after_write_restores_memory_mapped_first() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&[0x11u8; 256], 3, 1).unwrap();
    assert_eq!(t.mode(), ControllerMode::Command);
    t.controller_mut().clear_ops();

    let mut out = [0u8; 256];
    t.read_blocks(&mut out, 3, 1).unwrap();

    assert_eq!(
        t.controller().ops(),
        &[
            FlashOp::EnterMemoryMapped,
            FlashOp::MappedRead {
                addr: SPIFLASH_WINDOW_BASE + 3 * 256,
                len: 256
            },
        ]
    );
    assert_eq!(t.mode(), ControllerMode::MemoryMapped);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_read_after_write_returns_last_written_data() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);

    let first = vec![0x5Au8; 4096];
    let second = ramp(8192);
    let third = vec![0xC3u8; 4096];
    t.write_blocks(&first, 0, 16).unwrap();
    t.write_blocks(&second, 16, 32).unwrap();
    t.write_blocks(&third, 16, 16).unwrap();

    let mut out = vec![0u8; 48 * 256];
    t.read_blocks(&mut out, 0, 48).unwrap();
    assert_eq!(&out[..4096], &first[..]);
    assert_eq!(&out[4096..8192], &third[..]);
    assert_eq!(&out[8192..], &second[4096..]);
}

#[test]
fn test_repeated_reads_are_identical() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&ramp(4096), 16, 16).unwrap();

    let mut a = vec![0u8; 4096];
    let mut b = vec![0u8; 4096];
    t.read_blocks(&mut a, 16, 16).unwrap();
    t.write_blocks(&[0u8; 256], 48, 1).unwrap();
    t.read_blocks(&mut b, 16, 16).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_erase_confined_to_covered_sectors() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&vec![0x01u8; 64 * 256], 0, 64).unwrap();
    t.controller_mut().clear_ops();

    t.write_blocks(&vec![0x02u8; 20 * 256], 16, 20).unwrap();

    let erases: Vec<FlashOp> = t
        .controller()
        .commands()
        .filter(|op| matches!(op, FlashOp::SectorErase(_)))
        .copied()
        .collect();
    assert_eq!(
        erases,
        vec![FlashOp::SectorErase(0x1000), FlashOp::SectorErase(0x2000)]
    );

    let mem = t.controller().memory();
    assert!(mem[..0x1000].iter().all(|&b| b == 0x01));
    assert!(mem[0x1000..0x1000 + 20 * 256].iter().all(|&b| b == 0x02));
    // Rest of sector 2 was erased by the second run and not reprogrammed
    assert!(mem[0x1000 + 20 * 256..0x3000].iter().all(|&b| b == 0xFF));
    assert!(mem[0x3000..0x4000].iter().all(|&b| b == 0x01));
}

#[test]
fn test_mid_sector_write_does_not_erase() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&[0x77u8; 256], 0, 1).unwrap();
    t.controller_mut().clear_ops();

    t.write_blocks(&[0x66u8; 512], 5, 2).unwrap();

    assert_eq!(commands(&t), vec![program(5 * 256), program(6 * 256)]);
    let mem = t.controller().memory();
    assert!(mem[..256].iter().all(|&b| b == 0x77));
    assert!(mem[256..5 * 256].iter().all(|&b| b == 0xFF));
    assert!(mem[7 * 256..4096].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_mid_sector_rewrite_without_erase_ands_bits() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    t.write_blocks(&vec![0xF0u8; 4096], 0, 16).unwrap();

    // Same block again, not from the sector start: NOR programming ANDs
    t.write_blocks(&[0x3Cu8; 256], 4, 1).unwrap();

    let mut out = [0u8; 256];
    t.read_blocks(&mut out, 4, 1).unwrap();
    assert!(out.iter().all(|&b| b == 0x30));
}

#[test]
fn test_no_mode_violations_across_mixed_traffic() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let mut out = vec![0u8; 4096];

    t.write_blocks(&ramp(4096), 0, 16).unwrap();
    t.read_blocks(&mut out, 0, 16).unwrap();
    t.write_blocks(&ramp(1024), 30, 4).unwrap();
    t.write_blocks(&ramp(256), 40, 1).unwrap();
    t.read_blocks(&mut out[..1024], 30, 4).unwrap();
    t.read_blocks(&mut out, 0, 16).unwrap();

    assert_eq!(t.controller().violations().total(), 0);
}

#[test]
fn test_same_call_sequence_gives_identical_flash() {
    fn run(mem: &mut [u8]) {
        let mut t = make_translator(mem);
        t.write_blocks(&ramp(8192), 0, 32).unwrap();
        t.write_blocks(&[0x42u8; 768], 37, 3).unwrap();
        t.write_blocks(&[0x24u8; 512], 48, 2).unwrap();
    }

    let mut a = vec![0u8; FLASH_SIZE];
    let mut b = vec![0u8; FLASH_SIZE];
    run(&mut a);
    run(&mut b);
    assert_eq!(a, b);
}

// =============================================================================
// Addressing
// =============================================================================

#[test]
fn test_offsets_include_data_region_base() {
    let config = BoardConfig {
        data_region_base: 0x8000,
        ..test_config()
    };
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = BlockTranslator::new(
        SimFlash::new(&mut mem),
        StepClock::new(0, 1),
        config,
        ErasePolicy::SectorBoundary,
    );

    t.write_blocks(&[0xA5u8; 256], 17, 1).unwrap();
    assert_eq!(
        t.controller().commands().copied().collect::<Vec<_>>(),
        vec![program(0x8000 + 17 * 256)]
    );

    let mut out = [0u8; 256];
    t.read_blocks(&mut out, 17, 1).unwrap();
    assert_eq!(
        t.controller().ops().last(),
        Some(&FlashOp::MappedRead {
            addr: SPIFLASH_WINDOW_BASE + 0x8000 + 17 * 256,
            len: 256
        })
    );
    assert_eq!(out, [0xA5u8; 256]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_write_past_region_is_rejected_before_any_command() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let blocks = (FLASH_SIZE / 256) as u32;

    let err = t.write_blocks(&[0u8; 512], blocks - 1, 2).unwrap_err();
    assert_eq!(
        err,
        Error::OutOfRange {
            lba: blocks - 1,
            count: 2
        }
    );
    assert!(t.controller().ops().is_empty());
    assert_eq!(t.mode(), ControllerMode::MemoryMapped);
}

#[test]
fn test_lba_overflow_is_out_of_range() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);
    let mut out = [0u8; 256];

    assert!(matches!(
        t.read_blocks(&mut out, u32::MAX, 1),
        Err(Error::OutOfRange { .. })
    ));
}

#[test]
fn test_short_buffer_is_rejected() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut t = make_translator(&mut mem);

    let err = t.write_blocks(&[0u8; 300], 0, 2).unwrap_err();
    assert_eq!(
        err,
        Error::BufferTooSmall {
            needed: 512,
            actual: 300
        }
    );

    let mut out = [0u8; 100];
    assert!(matches!(
        t.read_blocks(&mut out, 0, 1),
        Err(Error::BufferTooSmall { .. })
    ));
}

#[test]
fn test_stuck_busy_flag_reports_hardware_stall() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut sim = SimFlash::new(&mut mem);
    sim.set_stalled(true);
    let mut t = BlockTranslator::new(
        sim,
        StepClock::new(0, 10),
        test_config(),
        ErasePolicy::SectorBoundary,
    )
    .with_busy_timeout(100);

    let err = t.write_blocks(&[0u8; 256], 16, 1).unwrap_err();
    assert_eq!(err, Error::HardwareStall { offset: 0x1000 });
    assert_eq!(t.controller().erase_count(), 0);
}

#[test]
fn test_stall_clears_and_next_write_succeeds() {
    let mut mem = vec![0u8; FLASH_SIZE];
    let mut sim = SimFlash::new(&mut mem);
    sim.set_stalled(true);
    let mut t = BlockTranslator::new(
        sim,
        StepClock::new(0, 10),
        test_config(),
        ErasePolicy::SectorBoundary,
    )
    .with_busy_timeout(50);

    assert!(t.write_blocks(&[0u8; 256], 0, 1).is_err());
    t.controller_mut().set_stalled(false);
    t.write_blocks(&[0x12u8; 256], 0, 1).unwrap();

    let mut out = [0u8; 256];
    t.read_blocks(&mut out, 0, 1).unwrap();
    assert_eq!(out, [0x12u8; 256]);
    assert_eq!(t.controller().violations().total(), 0);
}

#[test]
fn test_error_status_codes_are_negative_and_distinct() {
    let errors = [
        Error::OutOfRange { lba: 0, count: 0 },
        Error::BufferTooSmall {
            needed: 0,
            actual: 0,
        },
        Error::HardwareStall { offset: 0 },
        Error::Busy,
        Error::Misaligned { offset: 0 },
    ];
    let codes: Vec<i32> = errors.iter().map(|e| e.status_code()).collect();
    assert!(codes.iter().all(|&c| c < 0));
    for (i, a) in codes.iter().enumerate() {
        assert!(!codes[i + 1..].contains(a));
    }
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "invalid board config")]
fn test_new_rejects_region_past_end_of_flash() {
    let mut mem = vec![0u8; 0x1000];
    let config = BoardConfig {
        flash_size: 0x1000,
        data_region_base: 0x8000,
        ..test_config()
    };
    let _ = BlockTranslator::new(
        SimFlash::new(&mut mem),
        StepClock::new(0, 1),
        config,
        ErasePolicy::SectorBoundary,
    );
}
