//! Response construction and serialization.
//!
//! # Responsibilities
//! - Status codes and reason phrases
//! - Named constructors for common bodies (text, HTML, JSON, files)
//! - Serialize the status line, headers and body for the wire
//!
//! # Design Decisions
//! - The response echoes the request's protocol version
//! - Handler headers win over configured default headers
//! - `Connection: close` on every HTTP/1.x response, since connections
//!   are never reused

use std::fmt;

use serde::Serialize;

use crate::http::headers::Headers;
use crate::http::request::Version;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(u16);

impl Status {
    pub const OK: Status = Status(200);
    pub const CREATED: Status = Status(201);
    pub const NO_CONTENT: Status = Status(204);
    pub const MOVED_PERMANENTLY: Status = Status(301);
    pub const FOUND: Status = Status(302);
    pub const BAD_REQUEST: Status = Status(400);
    pub const FORBIDDEN: Status = Status(403);
    pub const NOT_FOUND: Status = Status(404);
    pub const METHOD_NOT_ALLOWED: Status = Status(405);
    pub const REQUEST_TIMEOUT: Status = Status(408);
    pub const PAYLOAD_TOO_LARGE: Status = Status(413);
    pub const IM_A_TEAPOT: Status = Status(418);
    pub const REQUEST_HEADER_FIELDS_TOO_LARGE: Status = Status(431);
    pub const INTERNAL_SERVER_ERROR: Status = Status(500);
    pub const NOT_IMPLEMENTED: Status = Status(501);
    pub const SERVICE_UNAVAILABLE: Status = Status(503);

    /// Any three-digit code; codes without a known reason are sent bare.
    pub fn from_code(code: u16) -> Option<Self> {
        (100..=999).contains(&code).then_some(Status(code))
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn reason(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            418 => "I'm a teapot",
            431 => "Request Header Fields Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            _ => "",
        }
    }

}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            "" => write!(f, "{}", self.0),
            reason => write!(f, "{} {}", self.0, reason),
        }
    }
}

/// Error a handler returns to answer with a bare status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}")]
pub struct HttpError {
    pub status: Status,
}

impl HttpError {
    pub fn new(status: Status) -> Self {
        Self { status }
    }
}

impl From<HttpError> for HttpResponse {
    fn from(err: HttpError) -> Self {
        HttpResponse::new(err.status)
    }
}

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: Status,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub headers: Headers,
}

impl HttpResponse {
    /// Bodyless response.
    pub fn new(status: Status) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
            headers: Headers::new(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::file(TEXT_PLAIN, body.into().into_bytes())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::file(TEXT_HTML, body.into().into_bytes())
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::file(APPLICATION_JSON, serde_json::to_vec(value)?))
    }

    pub fn octet_stream(body: Vec<u8>) -> Self {
        Self::file(OCTET_STREAM, body)
    }

    /// 200 with an explicit content type.
    pub fn file(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: Status::OK,
            content_type: Some(content_type.to_string()),
            body,
            headers: Headers::new(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self::new(Status::MOVED_PERMANENTLY).with_header("Location", location)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Status line, headers and the blank line.
    pub fn head_bytes(&self, version: &Version, defaults: &Headers) -> Vec<u8> {
        let mut headers = self.headers.clone();
        for (name, value) in defaults.iter() {
            if !headers.contains(name) {
                headers.insert(name, value);
            }
        }

        if let Some(content_type) = &self.content_type {
            headers.insert("Content-Type", content_type.as_str());
        }
        if self.content_type.is_some() || !self.body.is_empty() {
            headers.insert("Content-Length", self.body.len().to_string());
        }
        if version.is_http1() {
            headers.insert("Connection", "close");
        }

        format!(
            "{} {} {}\r\n{}\r\n",
            version,
            self.status.code(),
            self.status.reason(),
            headers
        )
        .into_bytes()
    }

    /// Complete wire form.
    pub fn to_bytes(&self, version: &Version, defaults: &Headers) -> Vec<u8> {
        let mut bytes = self.head_bytes(version, defaults);
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
