//! Error taxonomy for the parsing and connection-state core.
//!
//! Mirrors the way the rest of this codebase represents errors: a plain enum
//! per failure domain implementing `Display` and `std::error::Error` by hand,
//! rather than a single catch-all boxed error. Parse errors are fatal to the
//! current request (the connection is closed by the caller); body/query
//! errors are returned to the application handler, which decides how to
//! respond.

use std::fmt;

/// Errors that can occur while parsing the request line and headers.
///
/// All of these are fatal to the current request: the caller MUST close the
/// connection rather than attempt to recover and read a further request.
#[derive(Debug)]
pub enum ParseError {
    /// The header block (up to and including the final `\r\n\r\n`) did not
    /// fit in the static buffer.
    HeaderTooBig,
    /// The remote end closed the connection before the expected bytes arrived.
    ConnectionClosed,
    /// `read_header_timeout` elapsed while waiting for header bytes.
    Timeout,
    /// The method token was not one of GET/PUT/POST/HEAD/PATCH/DELETE/OPTIONS.
    UnknownMethod,
    /// The request-target was neither origin-form (`/...`) nor `*`.
    InvalidRequestTarget,
    /// The protocol token was not `HTTP/`.
    UnknownProtocol,
    /// The protocol token was `HTTP/` but not version 1.0 or 1.1.
    UnsupportedProtocol,
    /// A header line had no `:` or a malformed line terminator.
    InvalidHeaderLine,
    /// More header lines arrived than the header container has room for
    /// (`max_header_count`). Not named in the wire-level taxonomy but
    /// required once header storage is itself capacity-bounded; see
    /// DESIGN.md for the reasoning.
    TooManyHeaders,
    /// An I/O error occurred while reading from the socket.
    Io(std::io::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::HeaderTooBig => write!(f, "header block exceeds buffer capacity"),
            ParseError::ConnectionClosed => write!(f, "connection closed before headers arrived"),
            ParseError::Timeout => write!(f, "timed out waiting for header bytes"),
            ParseError::UnknownMethod => write!(f, "unknown request method"),
            ParseError::InvalidRequestTarget => write!(f, "invalid request target"),
            ParseError::UnknownProtocol => write!(f, "unknown protocol in request line"),
            ParseError::UnsupportedProtocol => write!(f, "unsupported HTTP version"),
            ParseError::InvalidHeaderLine => write!(f, "malformed header line"),
            ParseError::TooManyHeaders => write!(f, "too many header lines for configured capacity"),
            ParseError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::Io(err)
    }
}

/// Errors that can occur while lazily reading the body or draining a
/// connection before it is reused. These are reported to the application
/// handler rather than treated as fatal by the library itself.
#[derive(Debug)]
pub enum BodyError {
    /// `content-length` was present but not a valid non-negative decimal
    /// integer (or was empty).
    InvalidContentLength,
    /// The declared `content-length` exceeded `max_body_size`.
    BodyTooBig,
    /// The remote end closed the connection before the declared body
    /// length was fully read.
    ConnectionClosed,
    /// `drain` observed more over-read bytes than `content-length` allowed
    /// for: a pipelined next request has started arriving.
    TooMuchData,
    /// An I/O error occurred while reading from the socket.
    Io(std::io::Error),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::InvalidContentLength => write!(f, "invalid content-length header"),
            BodyError::BodyTooBig => write!(f, "declared body length exceeds max_body_size"),
            BodyError::ConnectionClosed => write!(f, "connection closed before body fully read"),
            BodyError::TooMuchData => write!(f, "more bytes arrived than content-length allowed"),
            BodyError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for BodyError {}

impl From<std::io::Error> for BodyError {
    fn from(err: std::io::Error) -> Self {
        BodyError::Io(err)
    }
}

/// Error raised when a fixed-capacity container (headers, query, or path
/// params) has no room left for another entry. The containers are sized by
/// [`crate::config::ParserConfig`] at construction; this signals a
/// misconfigured limit rather than attacker-controlled input on its own,
/// since the caller chooses the capacity.
#[derive(Debug)]
pub struct CapacityError;

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container at capacity")
    }
}

impl std::error::Error for CapacityError {}
