//! `TimedReader` and the four-phase request-line/header `Parser`.
//!
//! Generic over any `Read` the same way the teacher's `parse_request`
//! took a generic `BufReader<T: Read>`, so tests can drive the parser
//! off a plain byte slice without a real socket; a `TcpStream` satisfies
//! the same bound in production and additionally gets the timeout
//! behaviour via `set_read_timeout`.

use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

use crate::byte_scanner::find_carriage_return;
use crate::error::ParseError;
use crate::request_state::RequestState;
use crate::url::Url;

/// The accepted request methods (spec.md §4.3 / §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
    Patch,
    Delete,
    Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http10,
    Http11,
}

/// A socket a `Parser` can set a read deadline on before issuing a read.
/// Implemented for `TcpStream` in production; tests use `NoTimeout` to
/// wrap a plain byte slice (or any other `Read`) that has no deadline
/// concept.
pub trait Timeoutable {
    fn set_read_deadline(&mut self, timeout_ms: Option<u64>) -> std::io::Result<()>;
}

impl Timeoutable for TcpStream {
    fn set_read_deadline(&mut self, timeout_ms: Option<u64>) -> std::io::Result<()> {
        self.set_read_timeout(timeout_ms.map(Duration::from_millis))
    }
}

/// Wraps a socket that reads bytes and (optionally) can be given a read
/// deadline. Exactly one poll-for-readability (realized here as
/// `set_read_deadline`) and one `read` happen per call to
/// [`TimedReader::read_for_header`]; callers compose multiple calls.
pub struct TimedReader<'a, S> {
    socket: &'a mut S,
}

impl<'a, S> TimedReader<'a, S>
where
    S: Read + Timeoutable,
{
    pub fn new(socket: &'a mut S) -> Self {
        TimedReader { socket }
    }

    /// Read into `buf`, honoring `timeout_ms` as a per-call read deadline.
    /// A `0`-length `buf` with no bytes available signals `HeaderTooBig`
    /// (the caller has no space left); any other zero-length read signals
    /// `ConnectionClosed`. A timed-out read surfaces as `ParseError::Timeout`.
    pub fn read_for_header(
        &mut self,
        buf: &mut [u8],
        timeout_ms: Option<u64>,
    ) -> Result<usize, ParseError> {
        if buf.is_empty() {
            return Err(ParseError::HeaderTooBig);
        }
        self.socket.set_read_deadline(timeout_ms)?;
        match self.socket.read(buf) {
            Ok(0) => Err(ParseError::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(err) if is_timeout(&err) => Err(ParseError::Timeout),
            Err(err) => Err(ParseError::Io(err)),
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// A `Timeoutable` no-op wrapper for sockets that have no deadline concept
/// (used by tests driving the parser off byte slices).
pub struct NoTimeout<R>(pub R);

impl<R: Read> Read for NoTimeout<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> Timeoutable for NoTimeout<R> {
    fn set_read_deadline(&mut self, _timeout_ms: Option<u64>) -> std::io::Result<()> {
        Ok(())
    }
}

/// The result of the request-line and header parse: everything a
/// [`crate::request::Request`] needs to be constructed, borrowing from the
/// caller's `RequestState`.
pub struct ParsedHead {
    pub method: Method,
    pub protocol: Protocol,
    /// Byte range of the raw request-target within `state.buf`.
    pub target: (usize, usize),
    /// Offset immediately after the final header terminator.
    pub pos: usize,
    /// Bytes drawn from the socket beyond `pos` (over-read body prefix).
    pub header_overread: usize,
}

/// Drives the four sequential phases described in spec.md §4.3 against a
/// single `RequestState`'s buffer, pulling more bytes from `socket` as
/// each phase needs them.
pub struct Parser<'s, S> {
    reader: TimedReader<'s, S>,
}

impl<'s, S> Parser<'s, S>
where
    S: Read + Timeoutable,
{
    pub fn new(socket: &'s mut S) -> Self {
        Parser {
            reader: TimedReader::new(socket),
        }
    }

    /// Ensure at least `want` bytes are present in `state.buf[..]`,
    /// starting from `have` already-valid bytes, reading more from the
    /// socket as needed. Returns the new total byte count.
    fn fill(
        &mut self,
        state: &mut RequestState,
        have: usize,
        want: usize,
        timeout_ms: Option<u64>,
    ) -> Result<usize, ParseError> {
        let mut total = have;
        while total < want {
            if total >= state.buf.len() {
                return Err(ParseError::HeaderTooBig);
            }
            let n = self
                .reader
                .read_for_header(&mut state.buf[total..], timeout_ms)?;
            total += n;
        }
        Ok(total)
    }

    pub fn parse(&mut self, state: &mut RequestState) -> Result<ParsedHead, ParseError> {
        let timeout_ms = state.read_header_timeout;
        let mut total = 0usize;

        // --- Method phase ---
        // spec.md describes this as a little-endian u32 key comparison;
        // matching the 4-byte array directly is equivalent and avoids an
        // unnecessary int round-trip.
        total = self.fill(state, total, 4, timeout_ms)?;
        let method_key: [u8; 4] = state.buf[0..4].try_into().unwrap();
        let (method, method_len) = match &method_key {
            b"GET " => (Method::Get, 4),
            b"PUT " => (Method::Put, 4),
            b"POST" => {
                total = self.fill(state, total, 5, timeout_ms)?;
                if state.buf[4] != b' ' {
                    return Err(ParseError::UnknownMethod);
                }
                (Method::Post, 5)
            }
            b"HEAD" => {
                total = self.fill(state, total, 5, timeout_ms)?;
                if state.buf[4] != b' ' {
                    return Err(ParseError::UnknownMethod);
                }
                (Method::Head, 5)
            }
            b"PATC" => {
                total = self.fill(state, total, 6, timeout_ms)?;
                if &state.buf[4..6] != b"H " {
                    return Err(ParseError::UnknownMethod);
                }
                (Method::Patch, 6)
            }
            b"DELE" => {
                total = self.fill(state, total, 7, timeout_ms)?;
                if &state.buf[4..7] != b"TE " {
                    return Err(ParseError::UnknownMethod);
                }
                (Method::Delete, 7)
            }
            b"OPTI" => {
                total = self.fill(state, total, 8, timeout_ms)?;
                if &state.buf[4..8] != b"ONS " {
                    return Err(ParseError::UnknownMethod);
                }
                (Method::Options, 8)
            }
            _ => return Err(ParseError::UnknownMethod),
        };
        let mut cursor = method_len;

        // --- Target phase ---
        total = self.fill(state, total, cursor + 1, timeout_ms)?;
        let target_start;
        let target_end;
        if state.buf[cursor] == b'*' {
            total = self.fill(state, total, cursor + 2, timeout_ms)?;
            if state.buf[cursor + 1] != b' ' {
                return Err(ParseError::InvalidRequestTarget);
            }
            target_start = cursor;
            target_end = cursor + 1;
            cursor += 2;
        } else if state.buf[cursor] == b'/' {
            let raw_start = cursor;
            loop {
                if let Some(rel) = state.buf[cursor..total].iter().position(|&b| b == b' ') {
                    target_start = raw_start;
                    target_end = cursor + rel;
                    cursor += rel + 1;
                    break;
                }
                total = self.fill(state, total, total + 1, timeout_ms)?;
            }
        } else {
            return Err(ParseError::InvalidRequestTarget);
        }

        // --- Protocol phase ---
        total = self.fill(state, total, cursor + 10, timeout_ms)?;
        if &state.buf[cursor..cursor + 4] != b"HTTP" {
            return Err(ParseError::UnknownProtocol);
        }
        let protocol = match &state.buf[cursor + 4..cursor + 8] {
            b"/1.1" => Protocol::Http11,
            b"/1.0" => Protocol::Http10,
            _ => return Err(ParseError::UnsupportedProtocol),
        };
        if &state.buf[cursor + 8..cursor + 10] != b"\r\n" {
            return Err(ParseError::UnknownProtocol);
        }
        cursor += 10;

        // --- Header phase ---
        loop {
            let cr_offset = loop {
                if let Some(rel) = find_carriage_return(&state.buf[cursor..total]) {
                    break rel;
                }
                total = self.fill(state, total, total + 1, timeout_ms)?;
            };
            let cr_abs = cursor + cr_offset;
            total = self.fill(state, total, cr_abs + 2, timeout_ms)?;
            if state.buf[cr_abs + 1] != b'\n' {
                return Err(ParseError::InvalidHeaderLine);
            }

            if cr_offset == 0 {
                cursor = cr_abs + 2;
                let head = ParsedHead {
                    method,
                    protocol,
                    target: (target_start, target_end),
                    pos: cursor,
                    header_overread: total - cursor,
                };
                return Ok(head);
            }

            let line_start = cursor;
            let line_end = cr_abs;
            let colon = match state.buf[line_start..line_end].iter().position(|&b| b == b':') {
                Some(rel) => line_start + rel,
                None => return Err(ParseError::InvalidHeaderLine),
            };
            for b in &mut state.buf[line_start..colon] {
                b.make_ascii_lowercase();
            }
            let mut value_start = colon + 1;
            while value_start < line_end && state.buf[value_start] == b' ' {
                value_start += 1;
            }
            state
                .headers
                .try_push(
                    crate::store::Loc::Buf(line_start, colon),
                    crate::store::Loc::Buf(value_start, line_end),
                )
                .map_err(|_| ParseError::TooManyHeaders)?;

            cursor = cr_abs + 2;
        }
    }
}

/// Build the [`Url`] for a parsed target range, handling the `*` sentinel.
pub fn url_from_target<'a>(buf: &'a [u8], target: (usize, usize)) -> Url<'a> {
    if &buf[target.0..target.1] == b"*" {
        Url::Asterisk
    } else {
        Url::parse_origin(&buf[target.0..target.1])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ParserConfig;

    fn parse(input: &[u8], cfg: &ParserConfig) -> Result<(ParsedHead, RequestState), ParseError> {
        let mut state = RequestState::new(cfg);
        let mut socket = NoTimeout(input);
        let mut parser = Parser::new(&mut socket);
        let head = parser.parse(&mut state)?;
        Ok((head, state))
    }

    #[test]
    fn test_simple_get() {
        let cfg = ParserConfig::default();
        let (head, state) = parse(b"GET / HTTP/1.1\r\n\r\n", &cfg).unwrap();
        assert_eq!(head.method, Method::Get);
        assert_eq!(head.protocol, Protocol::Http11);
        assert_eq!(&state.buf[head.target.0..head.target.1], b"/");
        assert_eq!(state.headers.len(), 0);
    }

    #[test]
    fn test_headers_lowercased_and_trimmed() {
        let cfg = ParserConfig::default();
        let (head, state) = parse(
            b"GET / HTTP/1.1\r\nHost:    example.com\r\nX-Foo: Bar\r\n\r\n",
            &cfg,
        )
        .unwrap();
        assert_eq!(state.headers.len(), 2);
        assert_eq!(
            state.headers.get(&state.buf, &state.arena, b"host"),
            Some(&b"example.com"[..])
        );
        assert_eq!(
            state.headers.get(&state.buf, &state.arena, b"x-foo"),
            Some(&b"Bar"[..])
        );
        let _ = head;
    }

    #[test]
    fn test_header_overread_accounts_for_body_prefix() {
        let cfg = ParserConfig::default();
        let input = b"POST / HTTP/1.0\r\nContent-Length: 10\r\n\r\nOver 9000!";
        let (head, _state) = parse(input, &cfg).unwrap();
        assert_eq!(head.header_overread, 10);
    }

    #[test]
    fn test_unknown_method_fails() {
        let cfg = ParserConfig::default();
        let err = parse(b"GETT / HTTP/1.1\r\n\r\n", &cfg).unwrap_err();
        assert!(matches!(err, ParseError::UnknownMethod));
    }

    #[test]
    fn test_lowercase_protocol_fails_unknown() {
        let cfg = ParserConfig::default();
        let err = parse(b"GET / http/1.1\r\n\r\n", &cfg).unwrap_err();
        assert!(matches!(err, ParseError::UnknownProtocol));
    }

    #[test]
    fn test_unsupported_protocol_version() {
        let cfg = ParserConfig::default();
        let err = parse(b"GET / HTTP/2.0\r\n\r\n", &cfg).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedProtocol));
    }

    #[test]
    fn test_header_too_big_when_buffer_too_small() {
        let cfg = ParserConfig {
            buffer_size: 17,
            ..ParserConfig::default()
        };
        let err = parse(b"GET / HTTP/1.1\r\n\r\n", &cfg).unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooBig));
    }

    #[test]
    fn test_asterisk_target() {
        let cfg = ParserConfig::default();
        let (head, state) = parse(b"OPTIONS * HTTP/1.1\r\n\r\n", &cfg).unwrap();
        assert_eq!(head.method, Method::Options);
        let url = url_from_target(&state.buf, head.target);
        assert!(matches!(url, Url::Asterisk));
    }

    #[test]
    fn test_fragmented_reads_match_whole_buffer_parse() {
        let input: &[u8] = b"DELETE /API/v2?hack=true&over=9000 HTTP/1.1\r\nHost: x\r\n\r\n";

        /// A reader that yields at most one byte per call, forcing the
        /// parser through its most granular incremental path.
        struct OneByteAtATime<'a>(&'a [u8]);
        impl<'a> Read for OneByteAtATime<'a> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let cfg = ParserConfig::default();
        let mut whole_state = RequestState::new(&cfg);
        let mut whole_socket = NoTimeout(input);
        let whole_head = Parser::new(&mut whole_socket).parse(&mut whole_state).unwrap();

        let mut frag_state = RequestState::new(&cfg);
        let mut frag_socket = NoTimeout(OneByteAtATime(input));
        let frag_head = Parser::new(&mut frag_socket).parse(&mut frag_state).unwrap();

        assert_eq!(whole_head.method, frag_head.method);
        assert_eq!(whole_head.protocol, frag_head.protocol);
        assert_eq!(
            &whole_state.buf[whole_head.target.0..whole_head.target.1],
            &frag_state.buf[frag_head.target.0..frag_head.target.1]
        );
        assert_eq!(whole_state.headers.len(), frag_state.headers.len());
    }

    #[test]
    fn test_large_random_header_value_round_trips() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut value = vec![0u8; 4096];
        for b in value.iter_mut() {
            *b = rng.gen_range(b'a'..=b'z');
        }

        let mut input = Vec::new();
        input.extend_from_slice(b"GET / HTTP/1.1\r\nX-Test: ");
        input.extend_from_slice(&value);
        input.extend_from_slice(b"\r\n\r\n");

        let cfg = ParserConfig {
            buffer_size: 8192,
            ..ParserConfig::default()
        };
        let (_head, state) = parse(&input, &cfg).unwrap();
        assert_eq!(
            state.headers.get(&state.buf, &state.arena, b"x-test"),
            Some(&value[..])
        );
    }
}
