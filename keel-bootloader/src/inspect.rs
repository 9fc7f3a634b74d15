// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! XIP-backed bank inspection.
//!
//! Banks are memory-mapped, so probing is plain volatile reads; no flash
//! driver involvement and no erase/program exclusion needed.

use keel_common::boot::{BankInspector, VectorTable};
use keel_common::metadata::Bank;
use keel_common::xip;

pub struct XipBanks;

impl BankInspector for XipBanks {
    fn vector_table(&self, bank: Bank) -> VectorTable {
        let addr = bank.addr();
        // SAFETY: bank addresses point into always-mapped XIP flash.
        unsafe {
            VectorTable {
                initial_sp: (addr as *const u32).read_volatile(),
                reset_vector: (addr as *const u32).offset(1).read_volatile(),
            }
        }
    }

    fn image_crc32(&self, bank: Bank, len: u32) -> u32 {
        xip::crc32_xip(bank.addr(), len)
    }
}
