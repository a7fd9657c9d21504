//! The reusable per-request scratch state drawn from the [`crate::pool::Pool`].
//!
//! One `RequestState` is allocated per pool slot (or per overflow element)
//! and reused across many requests on the lifetime of a connection slot.
//! It owns the single static buffer the parser, the header/query/body
//! partition, and percent-decode scratch all share, plus the three
//! pre-allocated containers and the per-request arena.

use crate::arena::Arena;
use crate::config::ParserConfig;
use crate::store::{KeyValueStore, PathParams};

/// Per-request scratch: a static buffer plus the containers and arena that
/// borrow from it. Reset between requests rather than reallocated.
pub struct RequestState {
    /// The single shared buffer: header text, over-read body prefix, and
    /// free scratch, per the tripartite region discipline (spec.md §3.3).
    pub buf: Box<[u8]>,
    pub headers: KeyValueStore,
    pub query: KeyValueStore,
    pub params: PathParams,
    pub arena: Arena,
    pub max_body_size: usize,
    pub read_header_timeout: Option<u64>,
}

impl RequestState {
    pub fn new(cfg: &ParserConfig) -> Self {
        RequestState {
            buf: vec![0u8; cfg.buffer_size].into_boxed_slice(),
            headers: KeyValueStore::new(cfg.max_header_count),
            query: KeyValueStore::new(cfg.max_query_count),
            params: PathParams::new(cfg.max_param_count),
            arena: Arena::new(),
            max_body_size: cfg.max_body_size,
            read_header_timeout: cfg.read_header_timeout,
        }
    }

    /// Restore this state to a fresh, empty condition so it can be handed
    /// to the parser for the next request on the connection (or the next
    /// connection, once released back to the pool). The buffer's bytes are
    /// left as-is; only the cursors held by containers/arena are cleared,
    /// since the parser always writes before it reads.
    pub fn reset(&mut self) {
        self.headers.clear();
        self.query.clear();
        self.params.clear();
        self.arena.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_sizes_buffer_and_containers_from_config() {
        let cfg = ParserConfig {
            buffer_size: 256,
            max_header_count: 4,
            max_query_count: 5,
            max_param_count: 6,
            ..ParserConfig::default()
        };
        let state = RequestState::new(&cfg);
        assert_eq!(state.buf.len(), 256);
        assert_eq!(state.headers.capacity(), 4);
        assert_eq!(state.query.capacity(), 5);
        assert!(state.params.is_empty());
    }

    #[test]
    fn test_reset_clears_containers_and_arena() {
        let cfg = ParserConfig::default();
        let mut state = RequestState::new(&cfg);
        state
            .headers
            .try_push(crate::store::Loc::Buf(0, 1), crate::store::Loc::Buf(1, 2))
            .unwrap();
        state.arena.alloc(8);
        state.reset();
        assert_eq!(state.headers.len(), 0);
        assert_eq!(state.query.len(), 0);
        assert!(state.params.is_empty());
    }
}
