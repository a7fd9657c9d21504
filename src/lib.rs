//! Streaming HTTP/1.x request-parsing and connection-state core.
//!
//! This crate is the parser and connection-state layer only: it turns
//! bytes off a socket into a [`Request`], lazily exposes its body and
//! query string, and recycles the scratch state that backs all of this
//! via a lock-free [`Pool`]. Routing, middleware, response writing, the
//! TCP accept loop, TLS, configuration loading, and logging are all left
//! to the application embedding this crate (see `DESIGN.md`).
//!
//! A typical connection loop looks like:
//!
//! ```ignore
//! let pool = Pool::new(64, || RequestState::new(&cfg));
//! loop {
//!     let mut state = pool.acquire();
//!     let head = Parser::new(&mut socket).parse(&mut state)?;
//!     let mut request = Request::new(head, &mut socket, &mut state, peer_addr);
//!     handle(&mut request);
//!     request.drain().ok();
//!     state.reset();
//!     pool.release(state);
//! }
//! ```

pub mod arena;
pub mod atoi;
pub mod byte_scanner;
pub mod config;
pub mod error;
pub mod parser;
pub mod percent;
pub mod pool;
pub mod request;
pub mod request_state;
pub mod store;
pub mod url;

pub use config::ParserConfig;
pub use error::{BodyError, CapacityError, ParseError};
pub use parser::{Method, NoTimeout, ParsedHead, Parser, Protocol, Timeoutable};
pub use pool::Pool;
pub use request::Request;
pub use request_state::RequestState;
pub use url::Url;
