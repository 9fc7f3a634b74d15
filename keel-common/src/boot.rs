// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bank selection at reset.
//!
//! The planner is pure: it looks at the metadata record (or its absence) and
//! a read-only view of the banks, and decides what to persist and where to
//! jump. Volatile flash reads and the actual control transfer stay in the
//! bootloader binary.

use crate::layout::{is_in_flash, is_in_sram, MAX_IMAGE_SIZE};
use crate::metadata::{Bank, BootMetadata, MAX_BOOT_ATTEMPTS};

/// First two words of a firmware image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    /// A bank is accepted iff its initial stack pointer lies in SRAM and its
    /// reset vector lies in XIP flash.
    pub const fn is_bootable(&self) -> bool {
        is_in_sram(self.initial_sp) && is_in_flash(self.reset_vector)
    }
}

/// Read-only view of the firmware banks used by the planner.
pub trait BankInspector {
    fn vector_table(&self, bank: Bank) -> VectorTable;

    /// CRC-32 (ISO HDLC) over the first `len` bytes of the bank image.
    fn image_crc32(&self, bank: Bank, len: u32) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootAction {
    Jump(Bank),
    /// No bank holds a bootable image; spin and wait for rescue.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootPlan {
    /// Record to persist before transferring control, if anything changed.
    pub persist: Option<BootMetadata>,
    pub action: BootAction,
}

/// Decide which bank to boot.
///
/// 1. Without valid metadata, probe both banks and synthesize a fresh record
///    for the first bootable one; no bank means [`BootAction::Halt`].
/// 2. With an update pending, validate the inactive bank and either flip to
///    it or discard the update; the pending flag is cleared either way.
/// 3. While the active image is unconfirmed, count boot attempts and fall
///    back to the other bank once the budget is exhausted.
pub fn plan_boot<I: BankInspector>(meta: Option<BootMetadata>, inspector: &I) -> BootPlan {
    let (mut meta, mut dirty) = match meta {
        Some(meta) => (meta, false),
        None => match recover(inspector) {
            Some(meta) => (meta, true),
            None => {
                return BootPlan {
                    persist: None,
                    action: BootAction::Halt,
                }
            }
        },
    };

    if meta.pending() {
        let target = meta.active().other();
        if pending_image_ok(&meta, target, inspector) {
            meta.set_active(target);
            meta.confirmed = 0;
            meta.boot_attempts = 0;
        }
        // Cleared even when the update is discarded, so a bad image is
        // offered exactly once.
        meta.update_pending = 0;
        dirty = true;
    }

    if meta.confirmed == 0 {
        if meta.boot_attempts >= MAX_BOOT_ATTEMPTS {
            let fallback = meta.active().other();
            if inspector.vector_table(fallback).is_bootable() {
                meta.set_active(fallback);
                // The fallback bank is the last known good image.
                meta.confirmed = 1;
                meta.boot_attempts = 0;
            } else {
                meta.boot_attempts = meta.boot_attempts.saturating_add(1);
            }
        } else {
            meta.boot_attempts += 1;
        }
        dirty = true;
    }

    let action = BootAction::Jump(meta.active());
    BootPlan {
        persist: dirty.then_some(meta),
        action,
    }
}

fn recover<I: BankInspector>(inspector: &I) -> Option<BootMetadata> {
    [Bank::A, Bank::B]
        .into_iter()
        .find(|&bank| inspector.vector_table(bank).is_bootable())
        .map(BootMetadata::recovered)
}

fn pending_image_ok<I: BankInspector>(meta: &BootMetadata, target: Bank, inspector: &I) -> bool {
    if !inspector.vector_table(target).is_bootable() {
        return false;
    }
    if meta.app_size == 0 {
        // No integrity record; the vector-table probe has to do.
        return true;
    }
    if meta.app_size > MAX_IMAGE_SIZE {
        return false;
    }
    inspector.image_crc32(target, meta.app_size) == meta.app_crc
}
