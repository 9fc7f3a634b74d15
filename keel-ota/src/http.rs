// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Minimal HTTP/1.1 codec for firmware downloads.
//!
//! Only what the update server speaks: a GET request with an optional byte
//! range, and a response head carrying a status plus `Content-Length` /
//! `Content-Range`. Everything is parsed out of fixed buffers; nothing
//! allocates.

use core::fmt::Write as _;

use heapless::String;

use crate::error::ProtocolError;

/// Request assembly buffer. Host and path are short, so 512 bytes is ample.
pub const MAX_REQUEST_LEN: usize = 512;

/// Upper bound for a response header block.
pub const MAX_HEADER_LEN: usize = 1024;

/// Inclusive byte range for a resumed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ByteRange {
    pub first: u32,
    pub last: u32,
}

/// Format a GET request for `path` on `host`.
///
/// A fresh request keeps the connection open; a resumed one carries a
/// `Range` header and asks the server to close afterwards.
pub fn format_request(
    host: &str,
    path: &str,
    user_agent: &str,
    range: Option<ByteRange>,
) -> Result<String<MAX_REQUEST_LEN>, core::fmt::Error> {
    let mut req: String<MAX_REQUEST_LEN> = String::new();
    write!(req, "GET {} HTTP/1.1\r\n", path)?;
    write!(req, "Host: {}\r\n", host)?;
    write!(req, "User-Agent: {}\r\n", user_agent)?;
    write!(req, "Cache-Control: no-cache\r\n")?;
    match range {
        Some(range) => {
            write!(req, "Range: bytes={}-{}\r\n", range.first, range.last)?;
            write!(req, "Connection: close\r\n")?;
        }
        None => write!(req, "Connection: keep-alive\r\n")?,
    }
    write!(req, "\r\n")?;
    Ok(req)
}

/// Parsed `Content-Range: bytes <first>-<last>/<total>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContentRange {
    pub first: u32,
    pub last: u32,
    pub total: u32,
}

/// Parsed response head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponseHead {
    pub status: u16,
    pub content_length: Option<u32>,
    pub content_range: Option<ContentRange>,
}

/// Locate the end of the header block. Returns the offset just past the
/// `\r\n\r\n` terminator.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Parse a complete header block (status line + headers).
pub fn parse_response_head(head: &[u8]) -> Result<ResponseHead, ProtocolError> {
    let text = core::str::from_utf8(head).map_err(|_| ProtocolError::Malformed)?;
    let mut lines = text.split("\r\n");

    let status = parse_status_line(lines.next().ok_or(ProtocolError::Malformed)?)?;

    let mut content_length = None;
    let mut content_range = None;
    for line in lines {
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse().map_err(|_| ProtocolError::Malformed)?);
        } else if name.eq_ignore_ascii_case("content-range") {
            content_range = Some(parse_content_range(value)?);
        }
    }

    Ok(ResponseHead {
        status,
        content_length,
        content_range,
    })
}

fn parse_status_line(line: &str) -> Result<u16, ProtocolError> {
    let mut parts = line.split_whitespace();
    let proto = parts.next().ok_or(ProtocolError::Malformed)?;
    if !proto.starts_with("HTTP/1.") {
        return Err(ProtocolError::Malformed);
    }
    parts
        .next()
        .ok_or(ProtocolError::Malformed)?
        .parse()
        .map_err(|_| ProtocolError::Malformed)
}

fn parse_content_range(value: &str) -> Result<ContentRange, ProtocolError> {
    let rest = value
        .strip_prefix("bytes ")
        .ok_or(ProtocolError::BadContentRange)?;
    let (range, total) = rest.split_once('/').ok_or(ProtocolError::BadContentRange)?;
    let (first, last) = range.split_once('-').ok_or(ProtocolError::BadContentRange)?;
    Ok(ContentRange {
        first: first.parse().map_err(|_| ProtocolError::BadContentRange)?,
        last: last.parse().map_err(|_| ProtocolError::BadContentRange)?,
        total: total.parse().map_err(|_| ProtocolError::BadContentRange)?,
    })
}

/// Validate the head of a fresh download and return the image size.
pub fn check_fresh(head: &ResponseHead, max_image: u32) -> Result<u32, ProtocolError> {
    match head.status {
        200 => {
            let len = head
                .content_length
                .ok_or(ProtocolError::MissingContentLength)?;
            if len == 0 {
                Err(ProtocolError::EmptyBody)
            } else if len > max_image {
                Err(ProtocolError::ImageTooLarge)
            } else {
                Ok(len)
            }
        }
        status => Err(ProtocolError::BadStatus(status)),
    }
}

/// Validate the head of a resumed download against the requested range.
pub fn check_resume(
    head: &ResponseHead,
    resume_from: u32,
    expected_size: u32,
) -> Result<(), ProtocolError> {
    match head.status {
        206 => {
            let range = head
                .content_range
                .ok_or(ProtocolError::MissingContentRange)?;
            if range.first != resume_from
                || range.total != expected_size
                || range.last + 1 != expected_size
            {
                Err(ProtocolError::BadContentRange)
            } else {
                Ok(())
            }
        }
        status => Err(ProtocolError::BadStatus(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_request_has_no_range() {
        let req = format_request("updates.example.com", "/fw/keel.bin", "keel-ota/0.1.0", None)
            .unwrap();
        let text = req.as_str();
        assert!(text.starts_with("GET /fw/keel.bin HTTP/1.1\r\n"));
        assert!(text.contains("Host: updates.example.com\r\n"));
        assert!(text.contains("User-Agent: keel-ota/0.1.0\r\n"));
        assert!(text.contains("Cache-Control: no-cache\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(!text.contains("Range:"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn resumed_request_carries_range_and_close() {
        let range = ByteRange {
            first: 131072,
            last: 199999,
        };
        let req = format_request("updates.example.com", "/fw/keel.bin", "keel-ota/0.1.0", Some(range))
            .unwrap();
        assert!(req.as_str().contains("Range: bytes=131072-199999\r\n"));
        assert!(req.as_str().contains("Connection: close\r\n"));
        assert!(!req.as_str().contains("keep-alive"));
    }

    #[test]
    fn header_end_is_found_only_after_terminator() {
        assert_eq!(find_header_end(b"HTTP/1.1 200 OK\r\nContent-Length: 5"), None);
        assert_eq!(
            find_header_end(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nxx"),
            Some(38)
        );
    }

    #[test]
    fn parses_200_with_content_length() {
        let head =
            parse_response_head(b"HTTP/1.1 200 OK\r\nContent-Length: 364492\r\n\r\n").unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(364492));
        assert_eq!(check_fresh(&head, 768 * 1024).unwrap(), 364492);
    }

    #[test]
    fn parses_206_with_content_range() {
        let head = parse_response_head(
            b"HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 131072-199999/200000\r\n\r\n",
        )
        .unwrap();
        assert_eq!(head.status, 206);
        assert_eq!(
            head.content_range,
            Some(ContentRange {
                first: 131072,
                last: 199999,
                total: 200000
            })
        );
        assert!(check_resume(&head, 131072, 200000).is_ok());
    }

    #[test]
    fn missing_content_length_is_rejected() {
        let head = parse_response_head(b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\n").unwrap();
        assert_eq!(
            check_fresh(&head, 768 * 1024),
            Err(ProtocolError::MissingContentLength)
        );
    }

    #[test]
    fn zero_and_oversized_lengths_are_rejected() {
        let head = parse_response_head(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(check_fresh(&head, 1024), Err(ProtocolError::EmptyBody));

        let head = parse_response_head(b"HTTP/1.1 200 OK\r\nContent-Length: 2048\r\n\r\n").unwrap();
        assert_eq!(check_fresh(&head, 1024), Err(ProtocolError::ImageTooLarge));
    }

    #[test]
    fn missing_content_range_on_resume_is_rejected() {
        let head = parse_response_head(b"HTTP/1.1 206 Partial Content\r\n\r\n").unwrap();
        assert_eq!(
            check_resume(&head, 100, 200),
            Err(ProtocolError::MissingContentRange)
        );
    }

    #[test]
    fn inconsistent_content_range_is_rejected() {
        let head = parse_response_head(
            b"HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 50-199/200\r\n\r\n",
        )
        .unwrap();
        assert_eq!(
            check_resume(&head, 100, 200),
            Err(ProtocolError::BadContentRange)
        );
    }

    #[test]
    fn other_statuses_are_rejected() {
        let head = parse_response_head(b"HTTP/1.1 404 Not Found\r\n\r\n").unwrap();
        assert_eq!(check_fresh(&head, 1024), Err(ProtocolError::BadStatus(404)));
        assert_eq!(
            check_resume(&head, 0, 1),
            Err(ProtocolError::BadStatus(404))
        );
    }

    #[test]
    fn garbage_status_line_is_malformed() {
        assert_eq!(
            parse_response_head(b"ICY 200 OK\r\n\r\n"),
            Err(ProtocolError::Malformed)
        );
        assert_eq!(
            parse_response_head(b"HTTP/1.1 abc\r\n\r\n"),
            Err(ProtocolError::Malformed)
        );
    }
}
