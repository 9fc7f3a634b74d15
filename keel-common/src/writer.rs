// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sector-erase + page-program primitive.
//!
//! NOR flash only clears bits when programmed, so every write first erases
//! the sectors it overlaps. The erase region is rounded outward to sector
//! boundaries; anything else sharing those sectors is destroyed, which is
//! why the metadata record and the firmware banks each own whole sectors.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

/// Value of an erased flash byte.
pub const ERASED_BYTE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError<E> {
    /// Target offset is not program-page aligned.
    NotAligned,
    /// The underlying flash driver rejected the operation.
    Flash(E),
}

impl<E> From<E> for WriteError<E> {
    fn from(e: E) -> Self {
        WriteError::Flash(e)
    }
}

impl<E: NorFlashError> WriteError<E> {
    pub fn kind(&self) -> NorFlashErrorKind {
        match self {
            WriteError::NotAligned => NorFlashErrorKind::NotAligned,
            WriteError::Flash(e) => e.kind(),
        }
    }
}

/// Erase-then-program access to a NOR flash device.
pub struct FlashWriter<'a, F: NorFlash> {
    flash: &'a mut F,
}

impl<'a, F: NorFlash> FlashWriter<'a, F> {
    pub fn new(flash: &'a mut F) -> Self {
        Self { flash }
    }

    /// Erase every sector overlapping `[offset, offset + data.len())`, then
    /// program `data` at `offset`.
    ///
    /// `offset` must be page-aligned. Full pages are programmed in one batch;
    /// a trailing partial page is padded with [`ERASED_BYTE`] so no stale
    /// buffer bytes reach flash.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), WriteError<F::Error>> {
        if data.is_empty() {
            return Ok(());
        }

        let page = F::WRITE_SIZE as u32;
        let sector = F::ERASE_SIZE as u32;
        if offset % page != 0 {
            return Err(WriteError::NotAligned);
        }

        let end = offset + data.len() as u32;
        let erase_from = offset - (offset % sector);
        let erase_to = end.div_ceil(sector) * sector;
        self.flash.erase(erase_from, erase_to)?;

        let full_page_bytes = (data.len() / F::WRITE_SIZE) * F::WRITE_SIZE;
        if full_page_bytes > 0 {
            self.flash.write(offset, &data[..full_page_bytes])?;
        }

        let trailing = &data[full_page_bytes..];
        if !trailing.is_empty() {
            debug_assert!(F::WRITE_SIZE <= 256);
            let mut last_page = [ERASED_BYTE; 256];
            last_page[..trailing.len()].copy_from_slice(trailing);
            self.flash
                .write(offset + full_page_bytes as u32, &last_page[..F::WRITE_SIZE])?;
        }

        Ok(())
    }
}
