//! # Typed Module
//!
//! Strongly typed handlers on top of the raw [`HandlerRequest`](crate::dispatcher::HandlerRequest)
//! channel protocol.
//!
//! A [`Handler`] names its input and output types. The input is built from the
//! raw request with `TryFrom`, and the output is serialized to JSON with a 200
//! status. Either step, or the handler itself, can fail with an
//! [`ApiError`](crate::error::ApiError), which is turned into the matching
//! error response.
//!
//! ```rust,ignore
//! struct HealthController;
//!
//! impl Handler for HealthController {
//!     type Request = health::Request;
//!     type Response = health::Response;
//!
//!     fn handle(&self, _req: TypedHandlerRequest<Self::Request>) -> Result<Self::Response, ApiError> {
//!         Ok(health::Response::ok())
//!     }
//! }
//!
//! unsafe { dispatcher.register_typed("health", HealthController)? };
//! ```

mod core;

pub use core::{Handler, TypedHandlerRequest};
