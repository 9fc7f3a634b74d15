// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bridges a finished download to metadata mutation and a controlled reset.

use embedded_storage::nor_flash::NorFlash;

use keel_common::metadata::BootMetadata;
use keel_common::store;

use crate::download::DownloadOutcome;
use crate::error::DownloadError;
use crate::{ota_log, ota_warn};

/// Reset collaborator. Typically implemented by letting the watchdog lapse.
pub trait ResetControl {
    fn request_reset(&mut self);
}

/// What the orchestrator did with the download result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateVerdict {
    /// Metadata now points the bootloader at the new image.
    Staged { version: u32 },
    /// Nothing was staged; the inactive bank may hold garbage, which the
    /// bootloader will never select because `update_pending` stays clear.
    Discarded,
}

/// Apply a download result and request a reset either way.
///
/// A complete image is staged by marking the update pending and bumping the
/// version; anything else (terminal failure, short download) is discarded.
/// Control then returns to the bootloader via reset.
pub fn apply_download<F, R>(
    flash: &mut F,
    reset: &mut R,
    result: Result<DownloadOutcome, DownloadError>,
) -> UpdateVerdict
where
    F: NorFlash,
    R: ResetControl,
{
    let verdict = match result {
        Ok(outcome) if outcome.received == outcome.expected => stage(flash, &outcome),
        Ok(_short) => {
            ota_warn!(
                "ota: short download discarded ({}/{} bytes)",
                _short.received,
                _short.expected
            );
            UpdateVerdict::Discarded
        }
        Err(_e) => {
            ota_warn!("ota: download failed: {}", _e);
            UpdateVerdict::Discarded
        }
    };

    reset.request_reset();
    verdict
}

fn stage<F: NorFlash>(flash: &mut F, outcome: &DownloadOutcome) -> UpdateVerdict {
    let mut meta = match store::read_metadata(flash) {
        Ok(Some(meta)) => meta,
        // A device that lost its record still deserves the update; the
        // bootloader recovered (or will recover) the active bank.
        _ => BootMetadata::manufactured(),
    };

    meta.update_pending = 1;
    meta.version = meta.version.wrapping_add(1);
    meta.app_size = outcome.received;
    meta.app_crc = outcome.image_crc;
    meta.confirmed = 0;
    meta.boot_attempts = 0;

    match store::write_metadata(flash, &meta) {
        Ok(()) => {
            ota_log!("ota: update staged as version {}", meta.version);
            UpdateVerdict::Staged {
                version: meta.version,
            }
        }
        Err(_) => {
            // A torn metadata write fails the magic check at boot and the
            // bootloader re-synthesizes a record from the active bank.
            ota_warn!("ota: metadata write failed, update discarded");
            UpdateVerdict::Discarded
        }
    }
}
