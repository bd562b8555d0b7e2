//! # Dispatcher Module
//!
//! Hands matched requests to handler coroutines and waits for their replies.
//!
//! Every registered handler runs in its own `may` coroutine and owns the
//! receiving end of a channel. [`Dispatcher::dispatch`] wraps the request in a
//! [`HandlerRequest`] with a fresh reply channel, runs middleware `before`
//! hooks, sends it, blocks on the reply and then runs the `after` hooks.
//!
//! A panicking handler is caught inside its coroutine and answered with a 500;
//! the coroutine keeps serving. If the coroutine is gone the caller gets a 503.

mod core;

pub use core::{Dispatcher, HandlerRequest, HandlerResponse, HandlerSender};
