//! Async request handlers.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::http::{HttpError, HttpResponse, Request};

/// Failure returned by a handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Answer with this status and no body.
    #[error(transparent)]
    Http(#[from] HttpError),
    /// Anything else; answered with 500 and logged.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Internal(err.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::internal(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::internal(err)
    }
}

pub type HandlerResult = Result<HttpResponse, HandlerError>;

/// What a handler sees of the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Path remainder below the matched route, without a leading `/`.
    /// Empty when the route matched exactly.
    pub subdir: String,
    pub request: Request,
}

impl RequestContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.param(name)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.request.target.params
    }

    pub fn body(&self) -> &[u8] {
        &self.request.body
    }
}

/// An async function from request context to response.
///
/// Implemented for every `Fn(RequestContext) -> impl Future<Output = HandlerResult>`,
/// so plain `async fn`s and closures returning `async move` blocks both work.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx))
    }
}
