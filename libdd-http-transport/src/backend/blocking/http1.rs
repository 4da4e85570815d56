// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP/1.1 framing used by the TLS stack.
//!
//! Requests are always sent with `Connection: close`, so a body without
//! `Content-Length` or chunked encoding is delimited by the end of the stream.

use std::io::{self, BufRead, Write};

/// Upper bound on the size of a response header block.
const MAX_HEAD_LEN: usize = 64 * 1024;

/// Upper bound on a chunk-size or trailer line.
const MAX_LINE_LEN: usize = 4 * 1024;

/// Message framing fields set by the writer. The body is always sent with
/// `Content-Length`, so caller-supplied values are dropped.
const FRAMING_HEADERS: [&str; 3] = ["content-length", "transfer-encoding", "connection"];

/// Write the request line, the framing headers, the caller's rendered header
/// block and the body.
pub(crate) fn write_request<W: Write>(
    out: &mut W,
    method: &str,
    path: &str,
    host: &str,
    user_agent: &str,
    headers: &str,
    body: &[u8],
) -> io::Result<()> {
    let path = if path.is_empty() { "/" } else { path };
    let mut head = String::with_capacity(128 + path.len() + host.len() + headers.len());
    head.push_str(method);
    head.push(' ');
    head.push_str(path);
    head.push_str(" HTTP/1.1\r\n");
    if !has_header(headers, "host") {
        head.push_str("Host: ");
        head.push_str(host);
        head.push_str("\r\n");
    }
    if !has_header(headers, "user-agent") {
        head.push_str("User-Agent: ");
        head.push_str(user_agent);
        head.push_str("\r\n");
    }
    if !body.is_empty() || method != "GET" {
        head.push_str("Content-Length: ");
        head.push_str(&body.len().to_string());
        head.push_str("\r\n");
    }
    head.push_str("Connection: close\r\n");
    for line in headers.split_inclusive("\r\n") {
        if !is_framing_header(line) {
            head.push_str(line);
        }
    }
    head.push_str("\r\n");

    out.write_all(head.as_bytes())?;
    out.write_all(body)?;
    out.flush()
}

fn field_name(line: &str) -> Option<&str> {
    line.split_once(':').map(|(name, _)| name.trim())
}

/// Returns true if the rendered header block has a field named `name`.
fn has_header(rendered: &str, name: &str) -> bool {
    rendered
        .split("\r\n")
        .any(|line| field_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name)))
}

fn is_framing_header(line: &str) -> bool {
    field_name(line).is_some_and(|name| {
        FRAMING_HEADERS
            .iter()
            .any(|framing| name.eq_ignore_ascii_case(framing))
    })
}

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    Empty,
    Length(u64),
    Chunked,
    UntilClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub(crate) status: u16,
    pub(crate) framing: Framing,
}

/// Read the final response header block, skipping interim 1xx responses.
pub(crate) fn read_head<R: BufRead>(reader: &mut R) -> io::Result<ResponseHead> {
    loop {
        let head = read_one_head(reader)?;
        match head.status {
            100..=199 if head.status != 101 => continue,
            204 | 304 => {
                return Ok(ResponseHead {
                    framing: Framing::Empty,
                    ..head
                })
            }
            _ => return Ok(head),
        }
    }
}

fn read_one_head<R: BufRead>(reader: &mut R) -> io::Result<ResponseHead> {
    let mut total = 0;
    let status_line = read_line(reader, MAX_HEAD_LEN, &mut total)?;
    let status = parse_status_line(&status_line)?;

    let mut content_length = None;
    let mut chunked = false;
    loop {
        let line = read_line(reader, MAX_HEAD_LEN, &mut total)?;
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(invalid_data(format!("malformed header line: {line}")));
        };
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            let len = value
                .parse::<u64>()
                .map_err(|_| invalid_data(format!("invalid content-length: {value}")))?;
            content_length = Some(len);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value
                .rsplit(',')
                .next()
                .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        }
    }

    let framing = match (chunked, content_length) {
        (true, _) => Framing::Chunked,
        (false, Some(0)) => Framing::Empty,
        (false, Some(len)) => Framing::Length(len),
        (false, None) => Framing::UntilClose,
    };
    Ok(ResponseHead { status, framing })
}

fn parse_status_line(line: &str) -> io::Result<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") || code.len() != 3 {
        return Err(invalid_data(format!("malformed status line: {line}")));
    }
    match code.parse::<u16>() {
        Ok(status) if status >= 100 => Ok(status),
        _ => Err(invalid_data(format!("malformed status line: {line}"))),
    }
}

/// Read one line without its CRLF (or bare LF), counting bytes into `total`.
fn read_line<R: BufRead>(reader: &mut R, max: usize, total: &mut usize) -> io::Result<String> {
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line)?;
    *total += read;
    if *total > max {
        return Err(invalid_data("response header block too large".to_owned()));
    }
    if line.last() != Some(&b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before end of line",
        ));
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| invalid_data("non UTF-8 header line".to_owned()))
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    Done,
    Length { remaining: u64 },
    Chunked { remaining: u64, first: bool },
    UntilClose,
}

/// Incremental body decoder with "bytes available" / "read" semantics.
#[derive(Debug)]
pub(crate) struct BodyDecoder {
    state: BodyState,
}

impl BodyDecoder {
    pub(crate) fn new(framing: Framing) -> Self {
        let state = match framing {
            Framing::Empty => BodyState::Done,
            Framing::Length(remaining) => BodyState::Length { remaining },
            Framing::Chunked => BodyState::Chunked {
                remaining: 0,
                first: true,
            },
            Framing::UntilClose => BodyState::UntilClose,
        };
        Self { state }
    }

    /// Number of body bytes readable right now. Zero once the body is complete.
    pub(crate) fn available<R: BufRead>(&mut self, reader: &mut R) -> io::Result<usize> {
        loop {
            match self.state {
                BodyState::Done => return Ok(0),
                BodyState::Length { remaining: 0 } => {
                    self.state = BodyState::Done;
                }
                BodyState::Length { remaining }
                | BodyState::Chunked {
                    remaining: remaining @ 1..,
                    ..
                } => {
                    let buffered = reader.fill_buf()?.len();
                    if buffered == 0 {
                        return Err(truncated());
                    }
                    return Ok(clamp(buffered, remaining));
                }
                BodyState::Chunked { first, .. } => {
                    let mut total = 0;
                    if !first && !read_line(reader, MAX_LINE_LEN, &mut total)?.is_empty() {
                        return Err(invalid_data("missing CRLF after chunk".to_owned()));
                    }
                    let size = parse_chunk_size(&read_line(reader, MAX_LINE_LEN, &mut total)?)?;
                    if size == 0 {
                        skip_trailers(reader)?;
                        self.state = BodyState::Done;
                    } else {
                        self.state = BodyState::Chunked {
                            remaining: size,
                            first: false,
                        };
                    }
                }
                BodyState::UntilClose => {
                    let buffered = fill_until_close(reader)?;
                    if buffered == 0 {
                        self.state = BodyState::Done;
                    }
                    return Ok(buffered);
                }
            }
        }
    }

    /// Read body bytes into `buf`. Never reads past the end of the body.
    pub(crate) fn read<R: BufRead>(&mut self, reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
        let limit = match self.state {
            BodyState::Done => return Ok(0),
            BodyState::Length { remaining } | BodyState::Chunked { remaining, .. } => {
                clamp(buf.len(), remaining)
            }
            BodyState::UntilClose => buf.len(),
        };
        if limit == 0 {
            return Ok(0);
        }
        let until_close = self.state == BodyState::UntilClose;
        let read = match reader.read(&mut buf[..limit]) {
            Err(e) if until_close && e.kind() == io::ErrorKind::UnexpectedEof => 0,
            other => other?,
        };
        if let BodyState::Length { remaining } | BodyState::Chunked { remaining, .. } =
            &mut self.state
        {
            if read == 0 {
                return Err(truncated());
            }
            *remaining -= read as u64;
        } else if until_close && read == 0 {
            self.state = BodyState::Done;
        }
        Ok(read)
    }
}

fn clamp(len: usize, remaining: u64) -> usize {
    usize::try_from(remaining).map_or(len, |remaining| len.min(remaining))
}

/// A TLS peer closing the socket without close_notify surfaces as
/// `UnexpectedEof`; for a close-delimited body that is the end of the body.
fn fill_until_close<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    match reader.fill_buf() {
        Ok(buf) => Ok(buf.len()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
        Err(e) => Err(e),
    }
}

fn parse_chunk_size(line: &str) -> io::Result<u64> {
    let size = line.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(size, 16).map_err(|_| invalid_data(format!("invalid chunk size: {line}")))
}

fn skip_trailers<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut total = 0;
    while !read_line(reader, MAX_HEAD_LEN, &mut total)?.is_empty() {}
    Ok(())
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "response body truncated")
}
