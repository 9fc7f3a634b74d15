// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Secure transport contract.
//!
//! The downloader drives an already-configured encrypted channel and never
//! touches key material itself. All calls are non-blocking: instead of
//! stalling, they return [`TransportError::WouldBlock`] and the state
//! machine sleeps briefly and polls again.

use crate::error::TransportError;

pub trait Transport {
    /// Drive the TLS handshake one step.
    fn handshake(&mut self) -> Result<(), TransportError>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Read into `buf`. `Ok(0)` means the peer closed the connection
    /// cleanly.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Drop per-connection session state while keeping configuration and
    /// trust material, so a later [`reconnect`](Transport::reconnect) can
    /// redo the handshake from a clean slate.
    fn reset_session(&mut self);

    /// Tear down and re-establish the underlying connection.
    fn reconnect(&mut self) -> Result<(), TransportError>;
}

/// Monotonic millisecond clock backing the downloader's three timeouts.
pub trait Monotonic {
    fn now_ms(&self) -> u64;
}
