// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the BootMetadata record and its wire codec.

use keel_common::layout::{BANK_A_ADDR, BANK_B_ADDR};
use keel_common::metadata::{Bank, BootMetadata, METADATA_MAGIC};

#[test]
fn test_manufactured_defaults() {
    let meta = BootMetadata::manufactured();

    assert_eq!(meta.magic, METADATA_MAGIC);
    assert_eq!(meta.active(), Bank::A);
    assert!(!meta.pending());
    assert_eq!(meta.confirmed, 1);
    assert_eq!(meta.boot_attempts, 0);
    assert_eq!(meta.version, 0);
    assert_eq!(meta.app_size, 0);
    assert_eq!(meta.app_crc, 0);
    assert!(meta.is_valid());
}

#[test]
fn test_recovered_points_at_the_surviving_bank() {
    let meta = BootMetadata::recovered(Bank::B);

    assert_eq!(meta.active(), Bank::B);
    assert_eq!(meta.version, 0);
    assert_eq!(meta.boot_attempts, 0);
    assert_eq!(meta.confirmed, 1);
    assert!(!meta.pending());
}

#[test]
fn test_record_size_is_20_bytes() {
    assert_eq!(std::mem::size_of::<BootMetadata>(), 20);
    assert_eq!(BootMetadata::SIZE, 20);
}

#[test]
fn test_to_bytes_magic_is_little_endian() {
    let bytes = BootMetadata::manufactured().to_bytes();

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    assert_eq!(magic, METADATA_MAGIC);
}

#[test]
fn test_codec_round_trip() {
    let mut meta = BootMetadata::manufactured();
    meta.set_active(Bank::B);
    meta.update_pending = 1;
    meta.confirmed = 0;
    meta.boot_attempts = 2;
    meta.version = 41;
    meta.app_size = 364492;
    meta.app_crc = 0xDEAD_BEEF;

    let decoded = BootMetadata::from_bytes(&meta.to_bytes()).unwrap();
    assert_eq!(decoded, meta);
}

#[test]
fn test_bad_magic_is_rejected() {
    let mut bytes = BootMetadata::manufactured().to_bytes();
    bytes[0] ^= 0xFF;
    assert_eq!(BootMetadata::from_bytes(&bytes), None);

    // Erased sector reads as all-ones.
    assert_eq!(BootMetadata::from_bytes(&[0xFF; BootMetadata::SIZE]), None);
}

#[test]
fn test_short_buffer_is_rejected() {
    let bytes = BootMetadata::manufactured().to_bytes();
    assert_eq!(BootMetadata::from_bytes(&bytes[..19]), None);
}

#[test]
fn test_bank_addresses() {
    assert_eq!(Bank::A.addr(), BANK_A_ADDR);
    assert_eq!(Bank::B.addr(), BANK_B_ADDR);
    assert_eq!(Bank::A.other(), Bank::B);
    assert_eq!(Bank::B.other(), Bank::A);
}
