//! Request and response types for each operation, with the conversion from a
//! raw [`HandlerRequest`](crate::dispatcher::HandlerRequest) into the typed input.

pub mod create_item;
pub mod get_item;
pub mod health;
pub mod types;
