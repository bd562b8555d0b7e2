//! # Items API
//!
//! A small contract-first HTTP service for creating and fetching items, driven
//! by an [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document and
//! served on the `may` coroutine runtime through `may_minihttp`.
//!
//! ## Endpoints
//!
//! | Method | Path               | Success                               |
//! |--------|--------------------|---------------------------------------|
//! | GET    | `/health`          | `{"status":"ok"}`                     |
//! | POST   | `/items`           | the submitted item with `id: 1`       |
//! | GET    | `/items/{item_id}` | the sample item when `item_id` is 1   |
//! | GET    | `/openapi.yaml`    | the served OpenAPI document           |
//! | GET    | `/metrics`         | Prometheus text (when enabled)        |
//!
//! Nothing is persisted. `POST /items` always answers with id 1 and
//! `GET /items/{item_id}` only knows the fixed sample item.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loads the OpenAPI document and builds route metadata
//! - **[`router`]** - Matches method and path, extracting path parameters
//! - **[`validator`]** - Parameter and body validation producing field issues
//! - **[`dispatcher`]** - Coroutine-per-handler dispatch over channels
//! - **[`typed`]** - Typed request conversion on top of the dispatcher
//! - **[`handlers`]** / **[`controllers`]** - Request types and business rules
//! - **[`server`]** - `may_minihttp` service, request parsing and response writing
//! - **[`middleware`]** - Request tracing and Prometheus metrics
//! - **[`config`]**, **[`runtime_config`]**, **[`telemetry`]** - Startup configuration
//!
//! ## Request Flow
//!
//! ```text
//! may_minihttp -> parse_request -> AppService::handle
//!     -> Router::route           (404 / 405)
//!     -> validate                (422)
//!     -> Dispatcher::dispatch    -> handler coroutine -> controller (200 / 400 / 404)
//!     -> write_response
//! ```
//!
//! ## Error Bodies
//!
//! Business errors answer `{"detail": "<message>"}`. Malformed input answers 422
//! with `{"detail": [{"type", "loc", "msg"}, ...]}`, one entry per problem.

pub mod cli;
pub mod config;
pub mod controllers;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod telemetry;
pub mod typed;
pub mod validator;

pub use error::ApiError;
pub use spec::{load_spec, load_spec_or_embedded, LoadedSpec, RouteMeta};
