// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RAM-backed NOR flash with real erase/program granularity.
//!
//! Used by host tests in place of the XIP driver. The backing array covers
//! a window `[base, base + SIZE)` of the flash offset space, so a test can
//! model just the metadata sector or a single firmware bank without paying
//! for the whole chip. Programming honors NOR semantics (bits can only be
//! cleared), so a write into a non-erased region corrupts data exactly like
//! hardware would.

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::writer::ERASED_BYTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemFlashError(pub NorFlashErrorKind);

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        self.0
    }
}

pub struct MemFlash<const SIZE: usize> {
    pub base: u32,
    pub data: [u8; SIZE],
    pub erase_count: u32,
    pub write_count: u32,
}

impl<const SIZE: usize> MemFlash<SIZE> {
    /// Flash window starting at offset zero.
    pub const fn new() -> Self {
        Self::with_base(0)
    }

    /// Flash window covering `[base, base + SIZE)`; `base` must be
    /// sector-aligned.
    pub const fn with_base(base: u32) -> Self {
        assert!(base % 4096 == 0);
        Self {
            base,
            data: [ERASED_BYTE; SIZE],
            erase_count: 0,
            write_count: 0,
        }
    }

    /// Map an absolute flash offset range into the backing array.
    fn index(&self, offset: u32, len: usize) -> Result<usize, MemFlashError> {
        let start = (offset as usize)
            .checked_sub(self.base as usize)
            .ok_or(MemFlashError(NorFlashErrorKind::OutOfBounds))?;
        match start.checked_add(len) {
            Some(end) if end <= SIZE => Ok(start),
            _ => Err(MemFlashError(NorFlashErrorKind::OutOfBounds)),
        }
    }
}

impl<const SIZE: usize> Default for MemFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> ErrorType for MemFlash<SIZE> {
    type Error = MemFlashError;
}

impl<const SIZE: usize> ReadNorFlash for MemFlash<SIZE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = self.index(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.base as usize + SIZE
    }
}

impl<const SIZE: usize> NorFlash for MemFlash<SIZE> {
    const WRITE_SIZE: usize = 256;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from % Self::ERASE_SIZE as u32 != 0 || to % Self::ERASE_SIZE as u32 != 0 || from > to {
            return Err(MemFlashError(NorFlashErrorKind::NotAligned));
        }
        let len = (to - from) as usize;
        let start = self.index(from, len)?;
        self.data[start..start + len].fill(ERASED_BYTE);
        self.erase_count += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset % Self::WRITE_SIZE as u32 != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(MemFlashError(NorFlashErrorKind::NotAligned));
        }
        let start = self.index(offset, bytes.len())?;
        for (dst, src) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            // NOR programming can only clear bits.
            *dst &= *src;
        }
        self.write_count += 1;
        Ok(())
    }
}
