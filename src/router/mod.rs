//! # Router Module
//!
//! Matches an incoming method and path against the operations declared in the
//! OpenAPI document.
//!
//! At startup each path template (e.g. `/items/{item_id}`) is compiled into an
//! anchored regex with one capture group per placeholder. At request time the
//! router walks the compiled table and reports one of three outcomes:
//!
//! - [`RouteOutcome::Matched`] with the route and its extracted path parameters
//! - [`RouteOutcome::MethodNotAllowed`] when the path exists under other verbs
//! - [`RouteOutcome::NotFound`] when no template matches the path
//!
//! ## Example
//!
//! ```rust,ignore
//! use items_api::router::{Router, RouteOutcome};
//! use items_api::spec::load_embedded_spec;
//!
//! let spec = load_embedded_spec()?;
//! let router = Router::new(spec.routes)?;
//! if let RouteOutcome::Matched(m) = router.route(&http::Method::GET, "/items/1") {
//!     assert_eq!(m.get_path_param("item_id"), Some("1"));
//! }
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, RouteOutcome, Router, MAX_INLINE_PARAMS};
