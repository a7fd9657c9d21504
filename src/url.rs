//! The parsed request-target.
//!
//! Given a full contract in spec.md §6 despite being named as an external
//! routine ("URL parser contract (external)"): `raw`, `path`, `query`
//! attributes, with the server-wide wildcard `*` represented by a sentinel.
//! Implemented here as a small enum rather than a struct with a boolean
//! wildcard flag, following this codebase's preference for enums over
//! sentinel-value-plus-flag pairs.

/// A parsed request-target. Borrows from the request's static buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Url<'a> {
    /// The server-wide wildcard `*` (used by `OPTIONS *`).
    Asterisk,
    /// An origin-form target: `raw` is the full `path[?query]` text,
    /// `path` and `query` are the pieces either side of the first `?`
    /// (`query` is empty when there was no `?`).
    Origin {
        raw: &'a [u8],
        path: &'a [u8],
        query: &'a [u8],
    },
}

impl<'a> Url<'a> {
    /// Parse a raw origin-form target (the slice between the leading `/`
    /// and the space before the protocol token). Does not handle `*`; the
    /// parser constructs [`Url::Asterisk`] directly for that case since it
    /// never has a raw byte range to borrow.
    pub fn parse_origin(raw: &'a [u8]) -> Url<'a> {
        match raw.iter().position(|&b| b == b'?') {
            Some(idx) => Url::Origin {
                raw,
                path: &raw[..idx],
                query: &raw[idx + 1..],
            },
            None => Url::Origin {
                raw,
                path: raw,
                query: &raw[raw.len()..],
            },
        }
    }

    pub fn raw(&self) -> &'a [u8] {
        match self {
            Url::Asterisk => b"*",
            Url::Origin { raw, .. } => raw,
        }
    }

    pub fn path(&self) -> &'a [u8] {
        match self {
            Url::Asterisk => b"*",
            Url::Origin { path, .. } => path,
        }
    }

    pub fn query(&self) -> &'a [u8] {
        match self {
            Url::Asterisk => b"",
            Url::Origin { query, .. } => query,
        }
    }
}
