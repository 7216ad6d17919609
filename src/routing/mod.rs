//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed Request (method, path, params)
//!     → router.rs (method table, then longest registered ancestor path)
//!     → handler.rs (RequestContext with subdir remainder)
//!     → HttpResponse, or a status for HandlerError / panic
//! ```
//!
//! # Design Decisions
//! - Routes are registered with a builder at startup, immutable at runtime
//! - No regex, no path parameters: exact path or ancestor prefix only
//! - A method with no table at all is 405, a miss in a table is 404

pub mod handler;
pub mod router;

pub use handler::{Handler, HandlerError, HandlerResult, RequestContext};
pub use router::{Resolution, Router};
