//! # Spec Module
//!
//! Loads the OpenAPI 3.1 document that declares the service contract and turns
//! every operation into a [`RouteMeta`]. The router, the request validator and
//! the handler registry are all driven from these route records.
//!
//! The document is either read from disk ([`load_spec`]) or taken from the copy
//! compiled into the binary ([`load_embedded_spec`]).

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
