// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error taxonomy for the OTA path.
//!
//! Transport failures are retried by reconnect-and-resume up to a budget;
//! protocol failures are terminal for the attempt (a malformed server is
//! not assumed transient); flash failures are terminal and surface the
//! driver's error kind.

use embedded_storage::nor_flash::NorFlashErrorKind;

/// Errors surfaced by the secure transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No progress possible right now; poll again after a short sleep.
    WouldBlock,
    /// The peer reset or dropped the connection.
    ConnectionReset,
    /// (Re)establishing the connection failed.
    ConnectFailed,
    /// The TLS handshake was rejected.
    HandshakeFailed,
    /// Any other transport failure.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Status other than 200 (fresh) or 206 (resume).
    BadStatus(u16),
    /// A 200 response without a Content-Length header.
    MissingContentLength,
    /// Content-Length of zero.
    EmptyBody,
    /// Announced image exceeds the bank size.
    ImageTooLarge,
    /// A 206 response without a Content-Range header.
    MissingContentRange,
    /// Content-Range inconsistent with the requested range.
    BadContentRange,
    /// Header block exceeded the parse buffer.
    HeaderTooLarge,
    /// Anything else that fails to parse.
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutKind {
    /// The TLS handshake did not complete in time.
    Handshake,
    /// No bytes arrived within the per-read window.
    Read,
    /// The whole download exceeded its overall budget.
    Overall,
}

/// Flash failure classification, mirrored from the driver error kind so
/// download errors stay plain `Copy` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashFault {
    NotAligned,
    OutOfBounds,
    Other,
}

impl From<NorFlashErrorKind> for FlashFault {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashFault::NotAligned,
            NorFlashErrorKind::OutOfBounds => FlashFault::OutOfBounds,
            _ => FlashFault::Other,
        }
    }
}

/// Terminal download failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DownloadError {
    Transport(TransportError),
    Protocol(ProtocolError),
    Timeout(TimeoutKind),
    Flash(FlashFault),
    /// The reconnect budget is spent.
    AttemptsExhausted,
}
