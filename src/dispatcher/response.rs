//! Dispatch results.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::method::HttpMethod;

/// Maximum inline headers before heap allocation.
/// Most requests and responses carry ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names use `Arc<str>` because they repeat across requests
/// (`content-type`, `x-request-id`, ...) and `Arc::clone()` is O(1).
/// Values remain `String` as they're per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Case-insensitive header lookup (RFC 7230).
#[inline]
#[must_use]
pub fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Insert or replace a header, matching names case-insensitively.
pub fn upsert_header(headers: &mut HeaderVec, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((Arc::from(name), value));
}

/// Response produced by [`Dispatcher::dispatch`](super::Dispatcher::dispatch)
///
/// Contains the HTTP status code, headers, and JSON body the transport layer
/// should write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with the content-type header set
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response with a `{"message": ...}` body
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "message": message }))
    }

    /// 404 for a path no route matches.
    #[must_use]
    pub fn not_found(method: HttpMethod, path: &str) -> Self {
        Self::error(404, &format!("{method}: '{path}' was not found!"))
    }

    /// 405 for a path that exists with other methods. Carries an `Allow`
    /// header listing them.
    #[must_use]
    pub fn method_not_allowed(method: HttpMethod, path: &str, allowed: &[HttpMethod]) -> Self {
        let mut resp = Self::error(405, &format!("{method}: '{path}' is not allowed!"));
        resp.set_header("allow", allow_header(allowed));
        resp
    }

    /// Synthesized `OPTIONS` reply for a path whose routes do not register
    /// `OPTIONS` themselves.
    #[must_use]
    pub fn options(allowed: &[HttpMethod]) -> Self {
        let mut resp = Self::json(200, serde_json::json!({ "allow": allowed }));
        resp.set_header("allow", allow_header(allowed));
        resp
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        upsert_header(&mut self.headers, name, value);
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn allow_header(allowed: &[HttpMethod]) -> String {
    allowed
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let resp = HandlerResponse::not_found(HttpMethod::Get, "/missing");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["message"], "GET: '/missing' was not found!");
        assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn allow_header_lists_methods() {
        let resp = HandlerResponse::method_not_allowed(
            HttpMethod::Delete,
            "/items",
            &[HttpMethod::Get, HttpMethod::Post],
        );
        assert_eq!(resp.status, 405);
        assert_eq!(resp.get_header("allow"), Some("GET, POST"));

        let resp = HandlerResponse::options(&[HttpMethod::Get]);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, serde_json::json!({ "allow": ["GET"] }));
    }

    #[test]
    fn serializes_without_headers() {
        let mut resp = HandlerResponse::json(201, serde_json::json!({ "id": 7 }));
        resp.set_header("x-request-id", "abc".into());
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, serde_json::json!({ "status": 201, "body": { "id": 7 } }));
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut resp = HandlerResponse::json(200, Value::Null);
        resp.set_header("X-Thing", "a".into());
        resp.set_header("x-thing", "b".into());
        assert_eq!(resp.get_header("X-THING"), Some("b"));
        assert_eq!(resp.headers.len(), 2);
        assert!(resp.is_success());
    }
}
