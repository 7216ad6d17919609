//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (per-connection task, timeouts, request ID)
//!     → reader.rs (buffer head, enforce limits, read body)
//!     → request.rs (parse request line, headers, target)
//!     → service.rs (Router or StaticFiles produces the response)
//!     → response.rs (status line, default headers, body)
//!     → Send to client, close
//! ```

pub mod headers;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod service;

pub use headers::Headers;
pub use reader::{read_request, ReadError, ReadLimits};
pub use request::{Method, ParseError, Request, Target, Version};
pub use response::{HttpError, HttpResponse, Status};
pub use server::{HttpServer, ServerError, X_REQUEST_ID};
pub use service::Service;
