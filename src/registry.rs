//! Binds operation ids from the OpenAPI document to controllers.

use crate::controllers::{CreateItemController, GetItemController, HealthController};
use crate::dispatcher::Dispatcher;
use crate::spec::RouteMeta;
use tracing::warn;

/// Operation ids this binary has a controller for.
pub const KNOWN_HANDLERS: [&str; 3] = ["health", "create_item", "get_item"];

/// Spawn one handler coroutine per route whose operation id is known.
///
/// Returns the handler names that have no controller; those routes answer 500.
///
/// # Safety
///
/// Spawns `may` coroutines, see [`Dispatcher::register_handler`].
pub unsafe fn register_from_spec(
    dispatcher: &mut Dispatcher,
    routes: &[RouteMeta],
) -> std::io::Result<Vec<String>> {
    let mut missing = Vec::new();
    for route in routes {
        let name = route.handler_name.as_ref();
        unsafe {
            match name {
                "health" => dispatcher.register_typed(name, HealthController)?,
                "create_item" => dispatcher.register_typed(name, CreateItemController)?,
                "get_item" => dispatcher.register_typed(name, GetItemController)?,
                other => {
                    warn!(handler_name = other, path = %route.path_pattern, "No controller for operation");
                    missing.push(other.to_string());
                }
            }
        }
    }
    Ok(missing)
}

/// Handler names in `routes` that [`register_from_spec`] cannot serve.
pub fn unregistered_handlers(routes: &[RouteMeta]) -> Vec<String> {
    routes
        .iter()
        .map(|r| r.handler_name.as_ref())
        .filter(|name| !KNOWN_HANDLERS.contains(name))
        .map(str::to_string)
        .collect()
}
