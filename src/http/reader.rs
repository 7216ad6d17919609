//! Reading one request off a byte stream.
//!
//! # Responsibilities
//! - Buffer until the blank line that ends the head
//! - Enforce header and body size limits before allocating for them
//! - Read exactly `Content-Length` body bytes
//!
//! # Design Decisions
//! - One request per connection: bytes after the body are ignored
//! - Chunked transfer encoding is rejected rather than decoded

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::http::request::{ParseError, Request};
use crate::http::response::Status;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 1024;

/// Size limits applied while reading a request.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl From<&LimitsConfig> for ReadLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The peer closed the connection before a full request arrived.
    #[error("connection closed before the request was complete ({received} bytes received)")]
    Incomplete { received: usize },
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("request body of {length} bytes exceeds {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("transfer-encoding {0:?} is not supported")]
    UnsupportedTransferEncoding(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Status to answer with, or `None` when the peer cannot be answered.
    pub fn status(&self) -> Option<Status> {
        match self {
            ReadError::Incomplete { .. } | ReadError::Io(_) => None,
            ReadError::HeadTooLarge { .. } => Some(Status::REQUEST_HEADER_FIELDS_TOO_LARGE),
            ReadError::BodyTooLarge { .. } => Some(Status::PAYLOAD_TOO_LARGE),
            ReadError::UnsupportedTransferEncoding(_) => Some(Status::NOT_IMPLEMENTED),
            ReadError::Parse(_) => Some(Status::BAD_REQUEST),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReadError::Incomplete { .. } => "incomplete",
            ReadError::HeadTooLarge { .. } => "head_too_large",
            ReadError::BodyTooLarge { .. } => "body_too_large",
            ReadError::UnsupportedTransferEncoding(_) => "unsupported_encoding",
            ReadError::Parse(_) => "parse",
            ReadError::Io(_) => "io",
        }
    }
}

/// Read and parse a single request from `reader`.
pub async fn read_request<R>(reader: &mut R, limits: ReadLimits) -> Result<Request, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    let mut scanned = 0;

    let head_end = loop {
        if let Some(pos) = find_terminator(&buffer, scanned) {
            break pos;
        }
        // terminator may straddle the next read
        scanned = buffer.len().saturating_sub(HEAD_TERMINATOR.len() - 1);

        if buffer.len() > limits.max_header_bytes {
            return Err(ReadError::HeadTooLarge {
                limit: limits.max_header_bytes,
            });
        }

        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ReadError::Incomplete {
                received: buffer.len(),
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    if head_end > limits.max_header_bytes {
        return Err(ReadError::HeadTooLarge {
            limit: limits.max_header_bytes,
        });
    }

    let mut request = Request::parse(&buffer[..head_end])?;

    if let Some(encoding) = request.headers.get("transfer-encoding") {
        if !encoding.eq_ignore_ascii_case("identity") {
            return Err(ReadError::UnsupportedTransferEncoding(encoding.to_string()));
        }
    }

    let length = request.content_length()?;
    if length > limits.max_body_bytes {
        return Err(ReadError::BodyTooLarge {
            length,
            limit: limits.max_body_bytes,
        });
    }

    let mut body = buffer.split_off(head_end + HEAD_TERMINATOR.len());
    if body.len() >= length {
        body.truncate(length);
    } else {
        let already = body.len();
        body.resize(length, 0);
        reader
            .read_exact(&mut body[already..])
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ReadError::Incomplete {
                    received: head_end + HEAD_TERMINATOR.len() + already,
                },
                _ => ReadError::Io(e),
            })?;
    }

    request.body = body;
    Ok(request)
}

fn find_terminator(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| from + pos)
}
