//! Configuration surface for the parser and its pre-allocated per-request
//! state. One struct collecting the knobs named in the wire-protocol
//! contract, rather than loose constants scattered across modules.

/// Tunable limits for request parsing and body handling.
///
/// Passed by reference to [`crate::pool::Pool::new`] (to size each
/// [`crate::request_state::RequestState`]) and consulted by the parser and
/// by [`crate::request::Request::body`].
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Size of the per-request static buffer. Caps the maximum header-block
    /// size: a request whose header block (through the final `\r\n\r\n`)
    /// doesn't fit fails with `ParseError::HeaderTooBig`.
    pub buffer_size: usize,
    /// Rejects a `content-length` declaring more than this many bytes.
    pub max_body_size: usize,
    /// Capacity of the header container.
    pub max_header_count: usize,
    /// Capacity of the query-string container.
    pub max_query_count: usize,
    /// Capacity of the path-params container.
    pub max_param_count: usize,
    /// Milliseconds to wait for header bytes before failing with
    /// `ParseError::Timeout`. `None` means wait indefinitely.
    pub read_header_timeout: Option<u64>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            buffer_size: 32_768,
            max_body_size: 1_048_576,
            max_header_count: 32,
            max_query_count: 32,
            max_param_count: 10,
            read_header_timeout: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = ParserConfig::default();
        assert_eq!(cfg.buffer_size, 32_768);
        assert_eq!(cfg.max_body_size, 1_048_576);
        assert_eq!(cfg.max_header_count, 32);
        assert_eq!(cfg.max_query_count, 32);
        assert_eq!(cfg.max_param_count, 10);
        assert_eq!(cfg.read_header_timeout, None);
    }
}
