// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash writer semantics: erase rounding, page batching, tail padding.

use keel_common::mem::MemFlash;
use keel_common::writer::{FlashWriter, WriteError, ERASED_BYTE};

const FLASH_SIZE: usize = 16 * 4096;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn test_misaligned_offset_is_rejected_before_any_erase() {
    let mut flash = MemFlash::<FLASH_SIZE>::new();
    let err = FlashWriter::new(&mut flash).write(100, &[1, 2, 3]).unwrap_err();

    assert_eq!(err, WriteError::NotAligned);
    assert_eq!(flash.erase_count, 0);
    assert_eq!(flash.write_count, 0);
}

#[test]
fn test_erase_region_is_rounded_to_sector_boundaries() {
    let mut flash = MemFlash::<FLASH_SIZE>::new();
    // Pretend the surrounding sectors already hold data.
    flash.data.fill(0xAB);

    let data = pattern(100);
    FlashWriter::new(&mut flash).write(4096 + 256, &data).unwrap();

    // Sector 0 and sector 2 are untouched.
    assert!(flash.data[..4096].iter().all(|&b| b == 0xAB));
    assert!(flash.data[8192..].iter().all(|&b| b == 0xAB));

    // Sector 1 is erased except for the programmed page.
    assert!(flash.data[4096..4352].iter().all(|&b| b == ERASED_BYTE));
    assert_eq!(&flash.data[4352..4452], &data[..]);
    assert!(flash.data[4452..8192].iter().all(|&b| b == ERASED_BYTE));

    assert_eq!(flash.erase_count, 1);
    assert_eq!(flash.write_count, 1);
}

#[test]
fn test_write_spanning_two_sectors_erases_both() {
    let mut flash = MemFlash::<FLASH_SIZE>::new();
    flash.data.fill(0x00);

    let data = pattern(5000);
    FlashWriter::new(&mut flash).write(0, &data).unwrap();

    assert_eq!(&flash.data[..5000], &data[..]);
    // The rest of sector 1 was erased, sector 2 kept.
    assert!(flash.data[5120..8192].iter().all(|&b| b == ERASED_BYTE));
    assert!(flash.data[8192..].iter().all(|&b| b == 0x00));
}

#[test]
fn test_trailing_partial_page_is_padded_with_erased_byte() {
    let mut flash = MemFlash::<FLASH_SIZE>::new();

    let data = pattern(300);
    FlashWriter::new(&mut flash).write(0, &data).unwrap();

    assert_eq!(&flash.data[..300], &data[..]);
    assert!(flash.data[300..512].iter().all(|&b| b == ERASED_BYTE));
    // One batch for the full page, one for the padded tail.
    assert_eq!(flash.write_count, 2);
}

#[test]
fn test_empty_write_is_a_no_op() {
    let mut flash = MemFlash::<FLASH_SIZE>::new();
    FlashWriter::new(&mut flash).write(0, &[]).unwrap();

    assert_eq!(flash.erase_count, 0);
    assert_eq!(flash.write_count, 0);
}
