// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Persisted metadata record access.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::layout::{addr_to_offset, METADATA_ADDR};
use crate::metadata::BootMetadata;
use crate::writer::{FlashWriter, WriteError, ERASED_BYTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError<E> {
    /// Target offset violates an alignment precondition.
    Misaligned,
    /// The underlying flash operation failed.
    Flash(E),
}

impl<E> From<WriteError<E>> for StoreError<E> {
    fn from(e: WriteError<E>) -> Self {
        match e {
            WriteError::NotAligned => StoreError::Misaligned,
            WriteError::Flash(e) => StoreError::Flash(e),
        }
    }
}

/// Read the metadata record from its fixed sector.
///
/// Returns `Ok(None)` when the magic does not match (erased sector, torn
/// write, factory-fresh flash).
pub fn read_metadata<F: ReadNorFlash>(flash: &mut F) -> Result<Option<BootMetadata>, F::Error> {
    read_metadata_at(flash, addr_to_offset(METADATA_ADDR))
}

pub fn read_metadata_at<F: ReadNorFlash>(
    flash: &mut F,
    offset: u32,
) -> Result<Option<BootMetadata>, F::Error> {
    let mut buf = [0u8; BootMetadata::SIZE];
    flash.read(offset, &mut buf)?;
    Ok(BootMetadata::from_bytes(&buf))
}

/// Write the metadata record to its fixed sector.
pub fn write_metadata<F: NorFlash>(
    flash: &mut F,
    record: &BootMetadata,
) -> Result<(), StoreError<F::Error>> {
    write_metadata_at(flash, addr_to_offset(METADATA_ADDR), record)
}

/// Write a metadata record at `offset` (erase sector, then program one page).
///
/// Both alignment preconditions are checked before any hardware call; a bad
/// offset is rejected, never rounded.
pub fn write_metadata_at<F: NorFlash>(
    flash: &mut F,
    offset: u32,
    record: &BootMetadata,
) -> Result<(), StoreError<F::Error>> {
    if offset % F::ERASE_SIZE as u32 != 0 {
        return Err(StoreError::Misaligned);
    }
    if offset % F::WRITE_SIZE as u32 != 0 {
        return Err(StoreError::Misaligned);
    }

    // Pad to a full program page so no stale bytes follow the record.
    debug_assert!(F::WRITE_SIZE <= 256 && BootMetadata::SIZE <= F::WRITE_SIZE);
    let mut page = [ERASED_BYTE; 256];
    page[..BootMetadata::SIZE].copy_from_slice(&record.to_bytes());

    FlashWriter::new(flash).write(offset, &page[..F::WRITE_SIZE])?;
    Ok(())
}

/// Mark the active image healthy: set `confirmed` and reset the attempt
/// counter. Called by the application once it considers itself up.
///
/// Returns `Ok(true)` when a write was performed.
pub fn confirm_active<F: NorFlash>(flash: &mut F) -> Result<bool, StoreError<F::Error>> {
    let meta = read_metadata(flash).map_err(StoreError::Flash)?;
    let Some(mut meta) = meta else {
        return Ok(false);
    };

    if meta.confirmed != 0 && meta.boot_attempts == 0 {
        return Ok(false);
    }

    meta.confirmed = 1;
    meta.boot_attempts = 0;
    write_metadata(flash, &meta)?;
    Ok(true)
}
