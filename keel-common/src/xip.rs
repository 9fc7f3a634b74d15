// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RP2040 XIP flash driver using the boot-ROM routines.
//!
//! Erasing or programming requires XIP to be suspended, so every operation
//! runs the full ROM sequence:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! Nothing may fetch from flash while steps 1-5 run, so the routines driving
//! them live in `.data` (RAM) and the ROM function pointers are resolved once
//! at construction time, while XIP is still up.
//!
//! While steps 1-5 run, no code on *either* core may fetch from flash. This
//! is a hardware exclusion, not a cooperative lock: the second core must be
//! parked in SRAM (or not started) for the duration of every operation.

use core::sync::atomic::{AtomicBool, Ordering};
use crc::{Crc, CRC_32_ISO_HDLC};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::layout::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

// ROM table locations, RP2040 datasheet section 2.8.3. Both hold 16-bit
// pointers.
const ROM_FUNC_TABLE_PTR: *const u16 = 0x0000_0014 as *const u16;
const ROM_TABLE_LOOKUP_PTR: *const u16 = 0x0000_0018 as *const u16;

/// Command byte for a 4KB sector erase.
const SECTOR_ERASE_CMD: u8 = 0x20;

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// Resolve a boot-ROM function from its two-character tag.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *ROM_FUNC_TABLE_PTR as *const u16;

    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *ROM_TABLE_LOOKUP_PTR as usize,
        );

    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

static FLASH_GATE_TAKEN: AtomicBool = AtomicBool::new(false);

/// Exclusive right to erase or program flash.
///
/// Handed out at most once per reset, so exactly one flash-affecting handle
/// can exist system-wide. Whoever holds it owns the erase/program window on
/// both cores.
pub struct FlashGate(());

impl FlashGate {
    pub fn take() -> Option<FlashGate> {
        cortex_m::interrupt::free(|_| {
            if FLASH_GATE_TAKEN.load(Ordering::Relaxed) {
                None
            } else {
                FLASH_GATE_TAKEN.store(true, Ordering::Relaxed);
                Some(FlashGate(()))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XipFlashError(NorFlashErrorKind);

impl NorFlashError for XipFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        self.0
    }
}

/// NOR flash access over the whole external flash, offsets relative to
/// [`FLASH_BASE`].
pub struct XipFlash {
    connect: RomFnVoid,
    exit_xip: RomFnVoid,
    erase: RomFnErase,
    program: RomFnProgram,
    flush: RomFnVoid,
    enter_xip: RomFnVoid,
}

impl XipFlash {
    /// Resolve the ROM function pointers. Requires XIP to still be active,
    /// i.e. must be called before the first erase/program.
    pub fn new(gate: FlashGate) -> Self {
        // The gate is consumed; this driver is now the only writer.
        let _ = gate;
        unsafe {
            Self {
                connect: core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF")),
                exit_xip: core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX")),
                erase: core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE")),
                program: core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP")),
                flush: core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC")),
                enter_xip: core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX")),
            }
        }
    }

    /// Erase with XIP suspended. Runs entirely from RAM.
    #[link_section = ".data"]
    #[inline(never)]
    unsafe fn erase_raw(&self, offset: u32, len: usize) {
        cortex_m::interrupt::disable();
        (self.connect)();
        (self.exit_xip)();
        (self.erase)(offset, len, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
        (self.flush)();
        (self.enter_xip)();
        cortex_m::interrupt::enable();
    }

    /// Program with XIP suspended. Runs entirely from RAM.
    #[link_section = ".data"]
    #[inline(never)]
    unsafe fn program_raw(&self, offset: u32, data: *const u8, len: usize) {
        cortex_m::interrupt::disable();
        (self.connect)();
        (self.exit_xip)();
        (self.program)(offset, data, len);
        (self.flush)();
        (self.enter_xip)();
        cortex_m::interrupt::enable();
    }
}

impl ErrorType for XipFlash {
    type Error = XipFlashError;
}

impl ReadNorFlash for XipFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if offset as usize + bytes.len() > FLASH_SIZE as usize {
            return Err(XipFlashError(NorFlashErrorKind::OutOfBounds));
        }
        read_xip(FLASH_BASE + offset, bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE as usize
    }
}

impl NorFlash for XipFlash {
    const WRITE_SIZE: usize = FLASH_PAGE_SIZE as usize;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from % FLASH_SECTOR_SIZE != 0 || to % FLASH_SECTOR_SIZE != 0 || from > to {
            return Err(XipFlashError(NorFlashErrorKind::NotAligned));
        }
        if to > FLASH_SIZE {
            return Err(XipFlashError(NorFlashErrorKind::OutOfBounds));
        }
        unsafe { self.erase_raw(from, (to - from) as usize) };
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset % FLASH_PAGE_SIZE != 0 || bytes.len() % FLASH_PAGE_SIZE as usize != 0 {
            return Err(XipFlashError(NorFlashErrorKind::NotAligned));
        }
        if offset as usize + bytes.len() > FLASH_SIZE as usize {
            return Err(XipFlashError(NorFlashErrorKind::OutOfBounds));
        }
        unsafe { self.program_raw(offset, bytes.as_ptr(), bytes.len()) };
        Ok(())
    }
}

/// Volatile byte-wise read from an absolute XIP flash address.
pub fn read_xip(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

/// CRC-32 (ISO HDLC) over `size` bytes of flash starting at `abs_addr`.
pub fn crc32_xip(abs_addr: u32, size: u32) -> u32 {
    let mut digest = CRC32.digest();
    let mut remaining = size as usize;
    let mut addr = abs_addr;
    let mut chunk = [0u8; 256];

    while remaining > 0 {
        let n = remaining.min(chunk.len());
        read_xip(addr, &mut chunk[..n]);
        digest.update(&chunk[..n]);
        addr += n as u32;
        remaining -= n;
    }

    digest.finalize()
}
