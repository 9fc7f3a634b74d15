// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Orchestrator behavior: staging, discarding, and the reset that follows
//! either way.

use keel_common::layout::{addr_to_offset, METADATA_ADDR};
use keel_common::mem::MemFlash;
use keel_common::metadata::BootMetadata;
use keel_common::store::{read_metadata, write_metadata};
use keel_ota::download::DownloadOutcome;
use keel_ota::error::{DownloadError, TimeoutKind};
use keel_ota::orchestrator::{apply_download, ResetControl, UpdateVerdict};

const SECTOR: usize = 4096;

fn metadata_sector() -> MemFlash<SECTOR> {
    MemFlash::with_base(addr_to_offset(METADATA_ADDR))
}

struct FakeReset {
    requests: u32,
}

impl FakeReset {
    fn new() -> Self {
        Self { requests: 0 }
    }
}

impl ResetControl for FakeReset {
    fn request_reset(&mut self) {
        self.requests += 1;
    }
}

fn complete_outcome() -> DownloadOutcome {
    DownloadOutcome {
        received: 364492,
        expected: 364492,
        image_crc: 0xCAFE_F00D,
    }
}

#[test]
fn test_complete_download_is_staged_and_reset_requested() {
    let mut flash = metadata_sector();
    let mut reset = FakeReset::new();

    let mut meta = BootMetadata::manufactured();
    meta.version = 7;
    write_metadata(&mut flash, &meta).unwrap();

    let verdict = apply_download(&mut flash, &mut reset, Ok(complete_outcome()));

    assert_eq!(verdict, UpdateVerdict::Staged { version: 8 });
    assert_eq!(reset.requests, 1);

    let staged = read_metadata(&mut flash).unwrap().unwrap();
    assert!(staged.pending());
    assert_eq!(staged.version, 8);
    assert_eq!(staged.app_size, 364492);
    assert_eq!(staged.app_crc, 0xCAFE_F00D);
    assert_eq!(staged.confirmed, 0);
    assert_eq!(staged.boot_attempts, 0);
    // The active bank is flipped by the bootloader, not here.
    assert_eq!(staged.active(), meta.active());
}

#[test]
fn test_staging_without_a_record_starts_from_scratch() {
    let mut flash = metadata_sector();
    let mut reset = FakeReset::new();

    let verdict = apply_download(&mut flash, &mut reset, Ok(complete_outcome()));

    assert_eq!(verdict, UpdateVerdict::Staged { version: 1 });
    assert!(read_metadata(&mut flash).unwrap().unwrap().pending());
}

#[test]
fn test_short_download_is_discarded_but_still_resets() {
    let mut flash = metadata_sector();
    let mut reset = FakeReset::new();

    let short = DownloadOutcome {
        received: 1000,
        expected: 364492,
        image_crc: 0,
    };
    let verdict = apply_download(&mut flash, &mut reset, Ok(short));

    assert_eq!(verdict, UpdateVerdict::Discarded);
    assert_eq!(reset.requests, 1);
    // Nothing was staged, so the bootloader can never select the partial
    // image.
    assert_eq!(read_metadata(&mut flash).unwrap(), None);
}

#[test]
fn test_failed_download_leaves_metadata_untouched() {
    let mut flash = metadata_sector();
    let mut reset = FakeReset::new();

    let mut meta = BootMetadata::manufactured();
    meta.version = 3;
    write_metadata(&mut flash, &meta).unwrap();
    let writes_before = flash.write_count;

    let verdict = apply_download(
        &mut flash,
        &mut reset,
        Err(DownloadError::Timeout(TimeoutKind::Overall)),
    );

    assert_eq!(verdict, UpdateVerdict::Discarded);
    assert_eq!(reset.requests, 1);
    assert_eq!(flash.write_count, writes_before);
    assert_eq!(read_metadata(&mut flash).unwrap(), Some(meta));
}
