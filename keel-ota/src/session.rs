// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Per-attempt download accounting.

/// Counters for one OTA attempt.
///
/// Never persisted: a power loss or task restart discards the attempt.
/// Bytes already flushed stay in the inactive bank but are simply
/// re-downloaded next time; only applied metadata and bank contents
/// survive a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DownloadSession {
    /// Image size announced by the response header.
    pub expected_size: u32,
    /// Bytes durably flushed to flash.
    pub total_received: u32,
    /// Bytes buffered but not yet flushed.
    pub flash_buf_pos: usize,
    /// A response header has been accepted for this attempt.
    pub headers_processed: bool,
}

impl DownloadSession {
    pub const fn new() -> Self {
        Self {
            expected_size: 0,
            total_received: 0,
            flash_buf_pos: 0,
            headers_processed: false,
        }
    }

    /// Bytes of the image still owed by the server.
    pub fn remaining(&self) -> u32 {
        self.expected_size
            .saturating_sub(self.total_received)
            .saturating_sub(self.flash_buf_pos as u32)
    }

    /// Completion condition, checked after every chunk and on graceful
    /// closure.
    pub fn complete(&self) -> bool {
        self.headers_processed && self.remaining() == 0
    }
}
