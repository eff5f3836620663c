//! Route path compilation.
//!
//! A registered path such as `users/:id/posts` is compiled once into a list of
//! [`Segment`]s. Leading, trailing and repeated slashes carry no meaning.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{ConfigError, ConfigResult};

/// Prefix marking a parametric segment.
pub const PARAM_MARKER: char = ':';

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Static(Arc<str>),
    /// Matches any single segment and binds it under this name.
    Param(Arc<str>),
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a route path.
    ///
    /// Fails when a parametric segment has no name (`/users/:`) or a segment
    /// contains a query or fragment delimiter.
    pub fn parse(path: &str) -> ConfigResult<Self> {
        let mut segments = Vec::new();
        for raw in split_path(path) {
            if raw.contains(['?', '#']) {
                return Err(ConfigError::InvalidRoutePath {
                    path: path.to_string(),
                    reason: format!("segment '{raw}' contains a query or fragment delimiter"),
                });
            }
            match raw.strip_prefix(PARAM_MARKER) {
                Some("") => {
                    return Err(ConfigError::InvalidRoutePath {
                        path: path.to_string(),
                        reason: "parametric segment without a name".to_string(),
                    })
                }
                Some(name) => segments.push(Segment::Param(Arc::from(name))),
                None => segments.push(Segment::Static(Arc::from(raw))),
            }
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Names of the parametric segments, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_ref()),
            Segment::Static(_) => None,
        })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => write!(f, "/{s}")?,
                Segment::Param(name) => write!(f, "/{PARAM_MARKER}{name}")?,
            }
        }
        Ok(())
    }
}

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> SmallVec<[&str; 8]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join two path fragments with exactly one slash between them and none at
/// either end.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}
