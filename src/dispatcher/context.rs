//! Request context handed to middlewares and handlers.

use std::collections::HashMap;

use serde_json::Value;

use crate::ids::RequestId;
use crate::method::HttpMethod;
use crate::router::ParamVec;

use super::response::{find_header, upsert_header, HeaderVec};

/// A file received with the request, already parsed by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A request as handed to [`Application::dispatch`](crate::Application::dispatch)
/// by the transport layer.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: http::Method,
    /// Request target, possibly with a query string
    pub path: String,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    pub file: Option<UploadedFile>,
}

impl IncomingRequest {
    #[must_use]
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderVec::new(),
            body: None,
            file: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(http::Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(http::Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        upsert_header(&mut self.headers, name, value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.file = Some(file);
        self
    }
}

/// The request half of a [`Context`]. This is the `req` argument foreign
/// middlewares receive.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub request_id: RequestId,
    pub method: HttpMethod,
    /// Normalized path: no query string, no leading or trailing slash
    pub path: String,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    pub file: Option<UploadedFile>,
    /// Values foreign middlewares attach for later middlewares and handlers
    pub locals: HashMap<String, Value>,
}

impl RawRequest {
    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The response half of a [`Context`]. This is the `res` argument foreign
/// middlewares receive.
///
/// Handlers normally just return a body and leave this alone. A middleware
/// that ends the chain without calling `next` uses [`ResponseHandle::send`] to
/// decide what the client gets.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    status: Option<u16>,
    headers: HeaderVec,
    body: Option<Value>,
}

impl ResponseHandle {
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        upsert_header(&mut self.headers, name, value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set the response body.
    pub fn send(&mut self, body: Value) {
        self.body = Some(body);
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn into_parts(self) -> (Option<u16>, HeaderVec, Option<Value>) {
        (self.status, self.headers, self.body)
    }
}

/// Everything a middleware or handler sees about the current request.
#[derive(Debug, Clone)]
pub struct Context {
    pub request: RawRequest,
    pub response: ResponseHandle,
    /// Path parameters bound by the matched route
    pub params: ParamVec,
    /// Query string parameters
    pub query: HashMap<String, String>,
}

impl Context {
    #[must_use]
    pub fn new(request: RawRequest, params: ParamVec, query: HashMap<String, String>) -> Self {
        Self {
            request,
            response: ResponseHandle::default(),
            params,
            query,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.request.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Get a path parameter by name; last binding wins for repeated names.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.request.body.as_ref()
    }

    #[must_use]
    pub fn file(&self) -> Option<&UploadedFile> {
        self.request.file.as_ref()
    }

    /// Status the response will carry when the handler completes.
    pub fn set_status(&mut self, status: u16) {
        self.response.set_status(status);
    }

    /// Attach a value for later middlewares and the handler.
    pub fn insert_local(&mut self, key: impl Into<String>, value: Value) {
        self.request.locals.insert(key.into(), value);
    }

    #[must_use]
    pub fn local(&self, key: &str) -> Option<&Value> {
        self.request.locals.get(key)
    }
}

/// Parse a query string with `application/x-www-form-urlencoded` rules.
/// Repeated keys keep the last value.
#[must_use]
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Split a request target into its normalized path and optional query.
#[must_use]
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    let path = path.split_once('#').map_or(path, |(p, _)| p);
    (path.trim_matches('/'), query)
}
