// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and flash plumbing for the Keel dual-bank firmware.
//!
//! Everything in this crate is `no_std` and hardware-free except the RP2040
//! XIP flash driver, which is gated behind the `embedded` feature so the
//! record codecs, the flash writer and the bank-selection planner can be
//! exercised by host tests against [`mem::MemFlash`].

#![no_std]

pub mod boot;
pub mod layout;
pub mod mem;
pub mod metadata;
pub mod store;
pub mod writer;

// RP2040 flash driver (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod xip;

// Re-export commonly used types
pub use boot::{plan_boot, BankInspector, BootAction, BootPlan, VectorTable};
pub use metadata::{Bank, BootMetadata, MAX_BOOT_ATTEMPTS, METADATA_MAGIC};
pub use store::{read_metadata, write_metadata, StoreError};
pub use writer::{FlashWriter, WriteError, ERASED_BYTE};
