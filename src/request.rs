//! The parsed-request surface handed to the application handler.
//!
//! Owns lazy body ingestion and lazy query-string decoding against the
//! tripartite static buffer (spec.md §3 invariant 3), keep-alive policy,
//! and the drain operation that resynchronizes a connection before its
//! `RequestState` goes back to the pool.

use std::io::Read;
use std::net::SocketAddr;

use crate::atoi::atoi;
use crate::error::BodyError;
use crate::parser::{url_from_target, Method, ParsedHead, Protocol};
use crate::percent::unescape;
use crate::request_state::RequestState;
use crate::store::Loc;
use crate::url::Url;

/// Memoized result of a `body()` call: computed once, then returned
/// verbatim on every further call without touching the socket again.
#[derive(Clone, Copy)]
enum BodyCache {
    NotComputed,
    None,
    Some(Loc),
}

/// A fully parsed HTTP/1.x request, borrowing its header/target bytes from
/// the caller's [`RequestState`] and able to pull further body bytes from
/// `socket` on demand.
pub struct Request<'a, S> {
    socket: &'a mut S,
    state: &'a mut RequestState,
    method: Method,
    protocol: Protocol,
    target: (usize, usize),
    /// Offset immediately after the final header terminator.
    pos: usize,
    /// Bytes already drawn from the socket beyond `pos`.
    header_overread: usize,
    /// Start of the free-scratch region of `state.buf`, per the tripartite
    /// invariant (spec.md §3.3). Fixed at `pos + header_overread` until
    /// `body()` runs; `body()` advances it past the body when the body
    /// ends up occupying more of `state.buf` (it is left unchanged when
    /// the body is instead diverted to the arena, since nothing new is
    /// then written into `state.buf`).
    scratch_start: usize,
    body: BodyCache,
    query_decoded: bool,
    keepalive: bool,
    peer_addr: Option<SocketAddr>,
}

impl<'a, S> Request<'a, S>
where
    S: Read,
{
    pub fn new(
        head: ParsedHead,
        socket: &'a mut S,
        state: &'a mut RequestState,
        peer_addr: Option<SocketAddr>,
    ) -> Self {
        Request {
            socket,
            state,
            method: head.method,
            protocol: head.protocol,
            target: head.target,
            pos: head.pos,
            header_overread: head.header_overread,
            scratch_start: head.pos + head.header_overread,
            body: BodyCache::NotComputed,
            query_decoded: false,
            keepalive: true,
            peer_addr,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn url(&self) -> Url<'_> {
        url_from_target(&self.state.buf, self.target)
    }

    /// Look up a header by (already-lowercased) name.
    pub fn header(&self, name: &[u8]) -> Option<&[u8]> {
        self.state.headers.get(&self.state.buf, &self.state.arena, name)
    }

    /// Look up a path parameter populated by an external router.
    pub fn param(&self, name: &str) -> Option<&[u8]> {
        self.state.params.get(&self.state.buf, &self.state.arena, name)
    }

    fn content_length(&self) -> Result<Option<usize>, BodyError> {
        match self.header(b"content-length") {
            None => Ok(None),
            Some(raw) => atoi(raw).map(Some).ok_or(BodyError::InvalidContentLength),
        }
    }

    /// Idempotent, memoized body read. Returns `None` when there is no
    /// `content-length` or it is `0`; otherwise blocks until the declared
    /// number of bytes has been read (from the already-over-read prefix,
    /// the rest of the static buffer's tail, or a fresh arena allocation),
    /// per the partitioning rule in spec.md §4.4.
    pub fn body(&mut self) -> Result<Option<&[u8]>, BodyError> {
        if let BodyCache::NotComputed = self.body {
            self.body = BodyCache::None;
            let length = match self.content_length()? {
                None => None,
                Some(0) => None,
                Some(length) => Some(length),
            };
            if let Some(length) = length {
                if length > self.state.max_body_size {
                    return Err(BodyError::BodyTooBig);
                }
                let loc = self.read_body_into_place(length)?;
                self.body = BodyCache::Some(loc);
            }
        }
        Ok(match self.body {
            BodyCache::Some(loc) => Some(loc.resolve(&self.state.buf, &self.state.arena)),
            _ => None,
        })
    }

    fn read_body_into_place(&mut self, length: usize) -> Result<Loc, BodyError> {
        let pos = self.pos;
        if self.header_overread == length {
            self.scratch_start = pos + length;
            return Ok(Loc::Buf(pos, pos + length));
        }

        let tail_len = self.state.buf.len() - pos;
        if tail_len >= length {
            self.fill_socket_reads(pos + self.header_overread, pos + length)?;
            self.scratch_start = pos + length;
            return Ok(Loc::Buf(pos, pos + length));
        }

        let idx = self.state.arena.alloc(length);
        {
            let dest = self.state.arena.get_mut(idx);
            dest[..self.header_overread].copy_from_slice(&self.state.buf[pos..pos + self.header_overread]);
        }
        let mut filled = self.header_overread;
        while filled < length {
            let n = self
                .socket
                .read(&mut self.state.arena.get_mut(idx)[filled..])?;
            if n == 0 {
                return Err(BodyError::ConnectionClosed);
            }
            filled += n;
        }
        Ok(Loc::Arena(idx, 0, length))
    }

    /// Read into `state.buf[from..until]`, starting at `from` bytes already
    /// valid, until `until` is reached.
    fn fill_socket_reads(&mut self, from: usize, until: usize) -> Result<(), BodyError> {
        let mut filled = from;
        while filled < until {
            let n = self.socket.read(&mut self.state.buf[filled..until])?;
            if n == 0 {
                return Err(BodyError::ConnectionClosed);
            }
            filled += n;
        }
        Ok(())
    }

    /// Idempotent, memoized query-string decode. Forces `body()` first so
    /// any body occupying the static buffer's tail has been moved aside or
    /// fully drained, per spec.md §4.4 step 1.
    pub fn query(&mut self) -> Result<(), BodyError> {
        if self.query_decoded {
            return Ok(());
        }
        self.body()?;
        self.query_decoded = true;

        let query_range = match self.url() {
            Url::Asterisk => return Ok(()),
            Url::Origin { query, raw } => {
                if query.is_empty() {
                    return Ok(());
                }
                // `query` borrows `self.state.buf`; translate it back to an
                // absolute range before the borrow ends, since we're about
                // to mutate that same buffer.
                let raw_ptr = raw.as_ptr() as usize;
                let query_ptr = query.as_ptr() as usize;
                let start = self.target.0 + (query_ptr - raw_ptr);
                (start, start + query.len())
            }
        };

        // Find the `&`-separated piece boundaries via an immutable scan
        // that ends before any write, so the offsets below can be fed
        // straight to `unescape` against the very same buffer: the query
        // text (before `pos`) and the scratch tail (from `scratch_start`
        // on) never overlap, by the tripartite buffer invariant.
        let pieces = {
            let buf = &self.state.buf;
            split_ranges(buf, query_range.0, query_range.1, b'&')
        };

        let mut scratch_cursor = self.scratch_start;
        let scratch_end = self.state.buf.len();

        for (start, end) in pieces {
            let eq = self.state.buf[start..end].iter().position(|&b| b == b'=');
            let (key_range, value_range) = match eq {
                Some(rel) => ((start, start + rel), (start + rel + 1, end)),
                None => ((start, end), (end, end)),
            };

            let key = unescape(
                &mut self.state.arena,
                &mut self.state.buf,
                key_range.0,
                key_range.1,
                &mut scratch_cursor,
                scratch_end,
            );
            let value = unescape(
                &mut self.state.arena,
                &mut self.state.buf,
                value_range.0,
                value_range.1,
                &mut scratch_cursor,
                scratch_end,
            );

            // Query overflow is capped silently rather than erroring; see
            // DESIGN.md for why this differs from the header container.
            let _ = self.state.query.try_push(key.loc, value.loc);
        }
        Ok(())
    }

    pub fn query_get(&self, name: &[u8]) -> Option<&[u8]> {
        self.state.query.get(&self.state.buf, &self.state.arena, name)
    }

    /// Whether the connection should be kept open for another request.
    pub fn can_keep_alive(&self) -> bool {
        if !self.keepalive {
            return false;
        }
        match self.protocol {
            Protocol::Http10 => false,
            Protocol::Http11 => self.header(b"connection") != Some(b"close"),
        }
    }

    /// Advance the socket past any unread body before the `RequestState`
    /// is reset and returned to the pool. A no-op if `body()` has already
    /// run. Fails with `TooMuchData` if more bytes were already over-read
    /// than `content-length` allows for (spec.md §4.4, §9).
    pub fn drain(&mut self) -> Result<(), BodyError> {
        if !matches!(self.body, BodyCache::NotComputed) {
            return Ok(());
        }
        let length = match self.content_length()? {
            None | Some(0) => return Ok(()),
            Some(length) => length,
        };
        if self.header_overread > length {
            return Err(BodyError::TooMuchData);
        }
        let mut remaining = length - self.header_overread;
        let buf = &mut self.state.buf;
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            let n = self.socket.read(&mut buf[..chunk])?;
            if n == 0 {
                return Err(BodyError::ConnectionClosed);
            }
            remaining -= n;
        }
        Ok(())
    }
}

/// Split `buf[start..end]` on every occurrence of `sep`, returning the
/// piece boundaries as absolute `(start, end)` ranges into `buf` rather
/// than copied-out slices.
fn split_ranges(buf: &[u8], start: usize, end: usize, sep: u8) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut piece_start = start;
    for i in start..end {
        if buf[i] == sep {
            ranges.push((piece_start, i));
            piece_start = i + 1;
        }
    }
    ranges.push((piece_start, end));
    ranges
}
