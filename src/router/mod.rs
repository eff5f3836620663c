//! # Router Module
//!
//! Path matching and route resolution. Routes are stored in a segment trie
//! built once at startup by the module graph walker.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling route paths such as `users/:id` into [`PathPattern`]s
//! - Storing one [`RouteEntry`] per `(pattern, method)` pair
//! - Matching incoming request paths, extracting path parameters
//! - Reporting the allowed methods when a path matches but the method does not
//!
//! ## Matching rules
//!
//! - A literal segment always wins over a parametric one at the same depth
//! - Among parametric siblings the first registered wins
//! - A branch that fails deeper in the path is abandoned and the next sibling
//!   is tried, so `/files/static/raw` still reaches `/files/:name/raw` when
//!   `/files/static` exists
//!
//! ## Example
//!
//! ```rust,ignore
//! use modrouter::router::{Lookup, Router};
//! use modrouter::HttpMethod;
//!
//! match router.find(HttpMethod::Get, "/users/42") {
//!     Lookup::Matched(m) => println!("id = {:?}", m.get_path_param("id")),
//!     Lookup::MethodNotAllowed { allowed } => println!("allowed: {allowed:?}"),
//!     Lookup::NotFound => println!("404"),
//! }
//! ```

mod core;
mod pattern;
mod trie;
#[cfg(test)]
mod tests;

pub use self::core::{
    Lookup, ParamVec, RouteEntry, RouteHandler, RouteMatch, Router, MAX_INLINE_PARAMS,
};
pub use pattern::{join_paths, split_path, PathPattern, Segment, PARAM_MARKER};
pub use trie::{RouteNode, TrieMatch};
