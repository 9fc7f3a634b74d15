// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash map for the Keel dual-bank firmware.
//!
//! All regions are build-time constants. Both firmware banks start on 64KB
//! boundaries so either image can execute in place, and the metadata record
//! owns a whole sector so rewriting it never touches an image.

// --- Flash geometry ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 0x0020_0000; // 2MB external flash

pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

// --- Region layout (XIP addresses) ---

pub const BOOTLOADER_ADDR: u32 = 0x1000_0000;
pub const BANK_A_ADDR: u32 = 0x1001_0000;
pub const BANK_B_ADDR: u32 = 0x100D_0000;
pub const METADATA_ADDR: u32 = 0x1019_0000;

pub const BANK_SIZE: u32 = 768 * 1024; // 768KB per bank

/// Largest image an OTA download may carry.
pub const MAX_IMAGE_SIZE: u32 = BANK_SIZE;

// --- Address ranges used by the vector-table probe ---

pub const SRAM_START: u32 = 0x2000_0000;
pub const SRAM_END: u32 = 0x2004_2000;

// Banks must sit on 64KB boundaries; the metadata sector must satisfy both
// the erase and the program granularity and fit inside flash.
const _: () = assert!(BANK_A_ADDR % 0x1_0000 == 0);
const _: () = assert!(BANK_B_ADDR % 0x1_0000 == 0);
const _: () = assert!(BANK_A_ADDR + BANK_SIZE <= BANK_B_ADDR);
const _: () = assert!(BANK_B_ADDR + BANK_SIZE <= METADATA_ADDR);
const _: () = assert!(METADATA_ADDR % FLASH_SECTOR_SIZE == 0);
const _: () = assert!(METADATA_ADDR % FLASH_PAGE_SIZE == 0);
const _: () = assert!(METADATA_ADDR + FLASH_SECTOR_SIZE <= FLASH_BASE + FLASH_SIZE);

/// Convert an absolute XIP flash address to a flash-relative offset.
pub const fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// `true` if `addr` lies inside SRAM.
pub const fn is_in_sram(addr: u32) -> bool {
    addr >= SRAM_START && addr < SRAM_END
}

/// `true` if `addr` lies inside XIP flash.
pub const fn is_in_flash(addr: u32) -> bool {
    addr >= FLASH_BASE && addr < FLASH_BASE + FLASH_SIZE
}
