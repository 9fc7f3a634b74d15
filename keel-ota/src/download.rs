// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resumable OTA download into the inactive firmware bank.
//!
//! The downloader runs cooperatively in one task: every transport call
//! either makes progress or reports `WouldBlock`, in which case the machine
//! sleeps for one poll interval and tries again. Payload accumulates in a
//! caller-supplied buffer sized to a multiple of the erase granularity;
//! a full buffer is flushed to `bank_offset + total_received` and only then
//! is `total_received` advanced, so an interruption loses at most one
//! unflushed chunk and never corrupts bytes already counted.
//!
//! A connection reset or premature close mid-body triggers reconnection:
//! the TLS session object is reset (configuration and trust material are
//! retained), the link is re-established, the handshake redone and the
//! request re-issued with a `Range` header starting at the flush watermark.
//! Buffered-but-unflushed bytes are dropped first, so no byte range is ever
//! written twice.

use crc::{Crc, CRC_32_ISO_HDLC};
use embedded_hal::delay::DelayNs;
use embedded_storage::nor_flash::NorFlash;

use keel_common::layout::MAX_IMAGE_SIZE;
use keel_common::writer::{FlashWriter, WriteError};

use crate::error::{DownloadError, ProtocolError, TimeoutKind, TransportError};
use crate::http::{self, ByteRange, MAX_HEADER_LEN};
use crate::session::DownloadSession;
use crate::transport::{Monotonic, Transport};
use crate::{ota_log, ota_warn};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub const USER_AGENT: &str = concat!("keel-ota/", env!("CARGO_PKG_VERSION"));

/// Tuning knobs for one download. `new` fills in the stock values.
#[derive(Debug, Clone, Copy)]
pub struct DownloadConfig<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub handshake_timeout_ms: u32,
    pub read_timeout_ms: u32,
    pub total_timeout_ms: u32,
    pub max_reconnects: u8,
    pub poll_delay_ms: u32,
    pub max_image_size: u32,
}

impl<'a> DownloadConfig<'a> {
    pub const fn new(host: &'a str, path: &'a str) -> Self {
        Self {
            host,
            path,
            handshake_timeout_ms: 15_000,
            read_timeout_ms: 10_000,
            total_timeout_ms: 300_000,
            max_reconnects: 5,
            poll_delay_ms: 10,
            max_image_size: MAX_IMAGE_SIZE,
        }
    }
}

/// Result of a completed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DownloadOutcome {
    /// Bytes flushed to the inactive bank.
    pub received: u32,
    /// Size announced by the server.
    pub expected: u32,
    /// CRC-32 over exactly the flushed bytes.
    pub image_crc: u32,
}

/// Why the body stream stopped before completion.
enum Interrupt {
    /// Connection reset or closed early; eligible for reconnect-and-resume.
    Lost,
    /// Terminal failure.
    Fatal(DownloadError),
}

pub struct Downloader<'a, T, F, C, D>
where
    T: Transport,
    F: NorFlash,
    C: Monotonic,
    D: DelayNs,
{
    transport: &'a mut T,
    flash: &'a mut F,
    clock: &'a C,
    delay: D,
    cfg: DownloadConfig<'a>,
    /// Flash-relative offset of the inactive bank being written.
    bank_offset: u32,
    /// Flush buffer; length must be a nonzero multiple of the erase size.
    buf: &'a mut [u8],
    session: DownloadSession,
    digest: crc::Digest<'static, u32>,
}

impl<'a, T, F, C, D> Downloader<'a, T, F, C, D>
where
    T: Transport,
    F: NorFlash,
    C: Monotonic,
    D: DelayNs,
{
    pub fn new(
        transport: &'a mut T,
        flash: &'a mut F,
        clock: &'a C,
        delay: D,
        cfg: DownloadConfig<'a>,
        bank_offset: u32,
        buf: &'a mut [u8],
    ) -> Self {
        assert!(!buf.is_empty() && buf.len() % F::ERASE_SIZE == 0);
        assert!(bank_offset % F::ERASE_SIZE as u32 == 0);

        Self {
            transport,
            flash,
            clock,
            delay,
            cfg,
            bank_offset,
            buf,
            session: DownloadSession::new(),
            digest: CRC32.digest(),
        }
    }

    /// Drive the download to completion or terminal failure.
    pub fn run(mut self) -> Result<DownloadOutcome, DownloadError> {
        let deadline = self.clock.now_ms() + u64::from(self.cfg.total_timeout_ms);
        let mut attempts: u8 = 0;

        ota_log!("ota: requesting {}{}", self.cfg.host, self.cfg.path);
        self.handshake(deadline)?;
        self.send_request(deadline, false)?;
        self.read_header(deadline, false)?;

        loop {
            match self.stream_body(deadline) {
                Ok(()) => break,
                Err(Interrupt::Lost) => {
                    if attempts >= self.cfg.max_reconnects {
                        ota_warn!("ota: reconnect budget spent at {} bytes", self.session.total_received);
                        return Err(DownloadError::AttemptsExhausted);
                    }
                    attempts += 1;
                    ota_log!(
                        "ota: connection lost, resume {}/{} from byte {}",
                        attempts,
                        self.cfg.max_reconnects,
                        self.session.total_received
                    );

                    // Unflushed bytes are re-requested, never re-written.
                    self.session.flash_buf_pos = 0;
                    self.transport.reset_session();
                    self.transport
                        .reconnect()
                        .map_err(DownloadError::Transport)?;
                    self.handshake(deadline)?;
                    self.send_request(deadline, true)?;
                    self.read_header(deadline, true)?;
                }
                Err(Interrupt::Fatal(e)) => return Err(e),
            }
        }

        // Remaining buffered bytes form the final partial chunk.
        self.flush()?;

        let received = self.session.total_received;
        ota_log!("ota: download complete, {} bytes", received);
        Ok(DownloadOutcome {
            received,
            expected: self.session.expected_size,
            image_crc: self.digest.finalize(),
        })
    }

    /// Drive the TLS handshake, tolerating `WouldBlock`.
    fn handshake(&mut self, deadline: u64) -> Result<(), DownloadError> {
        let started = self.clock.now_ms();
        loop {
            match self.transport.handshake() {
                Ok(()) => return Ok(()),
                Err(TransportError::WouldBlock) => {
                    let now = self.clock.now_ms();
                    if now >= deadline {
                        return Err(DownloadError::Timeout(TimeoutKind::Overall));
                    }
                    if now - started >= u64::from(self.cfg.handshake_timeout_ms) {
                        return Err(DownloadError::Timeout(TimeoutKind::Handshake));
                    }
                    self.delay.delay_ms(self.cfg.poll_delay_ms);
                }
                Err(e) => return Err(DownloadError::Transport(e)),
            }
        }
    }

    fn send_request(&mut self, deadline: u64, resume: bool) -> Result<(), DownloadError> {
        let range = resume.then(|| ByteRange {
            first: self.session.total_received,
            last: self.session.expected_size - 1,
        });
        let req = http::format_request(self.cfg.host, self.cfg.path, USER_AGENT, range)
            .map_err(|_| DownloadError::Protocol(ProtocolError::Malformed))?;
        self.write_all(deadline, req.as_bytes())
    }

    /// Write all bytes, polling through `WouldBlock`.
    fn write_all(&mut self, deadline: u64, mut data: &[u8]) -> Result<(), DownloadError> {
        while !data.is_empty() {
            match self.transport.write(data) {
                Ok(0) | Err(TransportError::WouldBlock) => {
                    if self.clock.now_ms() >= deadline {
                        return Err(DownloadError::Timeout(TimeoutKind::Overall));
                    }
                    self.delay.delay_ms(self.cfg.poll_delay_ms);
                }
                Ok(n) => data = &data[n..],
                Err(e) => return Err(DownloadError::Transport(e)),
            }
        }
        Ok(())
    }

    /// Accumulate and validate the response head. Body bytes that arrive
    /// behind the terminator are fed straight into the body path.
    fn read_header(&mut self, deadline: u64, resume: bool) -> Result<(), DownloadError> {
        let mut head = [0u8; MAX_HEADER_LEN];
        let mut len = 0usize;
        let mut last_read = self.clock.now_ms();

        let body_start = loop {
            if let Some(end) = http::find_header_end(&head[..len]) {
                break end;
            }
            if len == head.len() {
                return Err(DownloadError::Protocol(ProtocolError::HeaderTooLarge));
            }
            match self.transport.read(&mut head[len..]) {
                // Closure mid-header is not resumable; only body progress is.
                Ok(0) => {
                    return Err(DownloadError::Transport(TransportError::ConnectionReset))
                }
                Ok(n) => {
                    len += n;
                    last_read = self.clock.now_ms();
                }
                Err(TransportError::WouldBlock) => {
                    let now = self.clock.now_ms();
                    if now >= deadline {
                        return Err(DownloadError::Timeout(TimeoutKind::Overall));
                    }
                    if now - last_read >= u64::from(self.cfg.read_timeout_ms) {
                        return Err(DownloadError::Timeout(TimeoutKind::Read));
                    }
                    self.delay.delay_ms(self.cfg.poll_delay_ms);
                }
                Err(e) => return Err(DownloadError::Transport(e)),
            }
        };

        let parsed =
            http::parse_response_head(&head[..body_start]).map_err(DownloadError::Protocol)?;
        if resume {
            http::check_resume(&parsed, self.session.total_received, self.session.expected_size)
                .map_err(DownloadError::Protocol)?;
        } else {
            let size = http::check_fresh(&parsed, self.cfg.max_image_size)
                .map_err(DownloadError::Protocol)?;
            self.session.expected_size = size;
            ota_log!("ota: image size {} bytes", size);
        }
        self.session.headers_processed = true;

        self.accept_body(&head[body_start..len])
    }

    /// Copy payload into the flush buffer, flushing as it fills. Bytes
    /// beyond the announced size are ignored.
    fn accept_body(&mut self, mut data: &[u8]) -> Result<(), DownloadError> {
        while !data.is_empty() {
            let owed = self.session.remaining() as usize;
            if owed == 0 {
                break;
            }
            let pos = self.session.flash_buf_pos;
            let n = data.len().min(self.buf.len() - pos).min(owed);
            self.buf[pos..pos + n].copy_from_slice(&data[..n]);
            self.session.flash_buf_pos += n;
            data = &data[n..];
            if self.session.flash_buf_pos == self.buf.len() {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Stream body bytes until the completion condition holds.
    fn stream_body(&mut self, deadline: u64) -> Result<(), Interrupt> {
        let mut last_read = self.clock.now_ms();
        loop {
            if self.session.complete() {
                return Ok(());
            }
            if self.clock.now_ms() >= deadline {
                return Err(Interrupt::Fatal(DownloadError::Timeout(TimeoutKind::Overall)));
            }

            let pos = self.session.flash_buf_pos;
            let space = (self.buf.len() - pos).min(self.session.remaining() as usize);
            match self.transport.read(&mut self.buf[pos..pos + space]) {
                Ok(0) => {
                    // Graceful close: fine if the server already sent
                    // everything, otherwise resume on a fresh connection.
                    return if self.session.complete() {
                        Ok(())
                    } else {
                        Err(Interrupt::Lost)
                    };
                }
                Ok(n) => {
                    last_read = self.clock.now_ms();
                    self.session.flash_buf_pos += n;
                    if self.session.flash_buf_pos == self.buf.len() {
                        self.flush().map_err(Interrupt::Fatal)?;
                    }
                }
                Err(TransportError::WouldBlock) => {
                    if self.clock.now_ms() - last_read >= u64::from(self.cfg.read_timeout_ms) {
                        return Err(Interrupt::Fatal(DownloadError::Timeout(TimeoutKind::Read)));
                    }
                    self.delay.delay_ms(self.cfg.poll_delay_ms);
                }
                Err(TransportError::ConnectionReset) => return Err(Interrupt::Lost),
                Err(e) => return Err(Interrupt::Fatal(DownloadError::Transport(e))),
            }
        }
    }

    /// Flush buffered bytes to the inactive bank and advance the watermark.
    fn flush(&mut self) -> Result<(), DownloadError> {
        let pos = self.session.flash_buf_pos;
        if pos == 0 {
            return Ok(());
        }

        let offset = self.bank_offset + self.session.total_received;
        FlashWriter::new(self.flash)
            .write(offset, &self.buf[..pos])
            .map_err(|e: WriteError<F::Error>| DownloadError::Flash(e.kind().into()))?;

        self.digest.update(&self.buf[..pos]);
        // Counted only once durably in flash.
        self.session.total_received += pos as u32;
        self.session.flash_buf_pos = 0;
        Ok(())
    }
}
