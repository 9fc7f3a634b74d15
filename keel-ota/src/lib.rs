// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Over-the-air firmware update path.
//!
//! The downloader streams an image over an already-authenticated transport
//! into the inactive flash bank:
//!
//! ```text
//! INIT -> HANDSHAKE -> REQUEST_SENT -> HEADER_PARSE -> BODY_STREAM -> DONE
//!              ^                                           |
//!              +--------------- RECONNECTING <-------------+
//! ```
//!
//! On success the orchestrator stamps the metadata record with a pending
//! update and requests a reset; the bootloader picks the new bank up on the
//! next boot. On any terminal failure the device resets without marking
//! anything, so the partial image in the inactive bank can never be
//! selected.

#![cfg_attr(not(test), no_std)]

// Diagnostics go to the defmt channel when enabled; the state machine never
// depends on them.
#[cfg(feature = "defmt")]
macro_rules! ota_log {
    ($($arg:tt)*) => { defmt::println!($($arg)*) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! ota_log {
    ($($arg:tt)*) => {};
}
#[cfg(feature = "defmt")]
macro_rules! ota_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! ota_warn {
    ($($arg:tt)*) => {};
}

pub(crate) use ota_log;
pub(crate) use ota_warn;

pub mod download;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod session;
pub mod transport;

pub use download::{DownloadConfig, DownloadOutcome, Downloader};
pub use error::{DownloadError, FlashFault, ProtocolError, TimeoutKind, TransportError};
pub use orchestrator::{apply_download, ResetControl, UpdateVerdict};
pub use session::DownloadSession;
pub use transport::{Monotonic, Transport};
