//! # Dispatcher Module
//!
//! Turns an [`IncomingRequest`] into a [`HandlerResponse`]: route lookup
//! (through the [`ResolvedRouteCache`]), the middleware chain, the handler,
//! and the rendering of every outcome.
//!
//! ## Responses
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | Handler returned a value | handler-set or 200 | the value |
//! | Middleware ended the chain | middleware-set or 200 | what it sent |
//! | No route for the path | 404 | `{"message": "GET: '/x' was not found!"}` |
//! | Path exists, method does not | 405 + `Allow` | `{"message": ...}` |
//! | `OPTIONS` on such a path | 200 + `Allow` | `{"allow": [...]}` |
//! | Middleware or handler error | 500 | `{"message": <error>}` |
//!
//! Handler panics are caught and reported as 500s.

mod cache;
mod context;
mod core;
mod response;

pub use self::core::Dispatcher;
pub use cache::{CachedRoute, ResolvedRouteCache};
pub use context::{
    parse_query, split_target, Context, IncomingRequest, RawRequest, ResponseHandle, UploadedFile,
};
pub use response::{find_header, upsert_header, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS};
