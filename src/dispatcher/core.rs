use crate::error::ApiError;
use crate::ids::RequestId;
use crate::middleware::{duration_ms, Middleware};
use crate::router::{ParamVec, RouteMatch};
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A validated request on its way to a handler coroutine.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// The route template, e.g. `/items/{item_id}`.
    pub path: String,
    pub handler_name: Arc<str>,
    pub path_params: ParamVec,
    pub body: Option<Value>,
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and JSON body produced by a handler; always sent as `application/json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

pub type HandlerSender = mpsc::Sender<HandlerRequest>;

#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<Arc<str>, HandlerSender>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `sender` as the handler for `handler_name`, replacing any previous one.
    ///
    /// Dropping the old sender closes its channel, which ends the old coroutine.
    pub fn add_sender(&mut self, handler_name: &str, sender: HandlerSender) {
        if self.handlers.insert(Arc::from(handler_name), sender).is_some() {
            warn!(handler_name, "Replaced existing handler - old coroutine will exit");
        }
        info!(
            handler_name,
            total_handlers = self.handlers.len(),
            "Handler registered"
        );
    }

    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(AsRef::as_ref).collect();
        names.sort_unstable();
        names
    }

    /// Spawn a coroutine running `handler_fn` for every request sent to `name`.
    ///
    /// The coroutine stack size is the runtime default (see
    /// [`RuntimeConfig`](crate::runtime_config::RuntimeConfig)).
    ///
    /// # Safety
    ///
    /// Spawns a `may` coroutine. The handler must not block the OS thread or
    /// hold thread-local state across yields.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F) -> std::io::Result<()>
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let handler_name: Arc<str> = Arc::from(name);
        let stack_size = may::config().get_stack_size();

        let coroutine_name = Arc::clone(&handler_name);
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler_name = %coroutine_name, stack_size, "Handler coroutine start");
                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let request_id = req.request_id;
                        let started = Instant::now();

                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler_fn(req);
                        }));
                        match outcome {
                            Ok(()) => debug!(
                                request_id = %request_id,
                                handler_name = %coroutine_name,
                                execution_time_ms = duration_ms(started.elapsed()),
                                "Handler execution complete"
                            ),
                            Err(panic) => {
                                let panic_message = panic
                                    .downcast_ref::<&str>()
                                    .map(|s| (*s).to_string())
                                    .or_else(|| panic.downcast_ref::<String>().cloned())
                                    .unwrap_or_else(|| "unknown panic".to_string());
                                error!(
                                    request_id = %request_id,
                                    handler_name = %coroutine_name,
                                    panic_message = %panic_message,
                                    "Handler panicked"
                                );
                                let response = HandlerResponse::from(ApiError::Internal(
                                    "Internal Server Error".to_string(),
                                ));
                                if reply_tx.send(response).is_err() {
                                    warn!(request_id = %request_id, "Caller gone before panic reply");
                                }
                            }
                        }
                    }
                    debug!(handler_name = %coroutine_name, "Handler coroutine exit");
                })
        };

        if let Err(e) = spawn_result {
            error!(handler_name = %handler_name, error = %e, stack_size, "Failed to spawn handler coroutine");
            return Err(e);
        }

        self.add_sender(name, tx);
        Ok(())
    }

    /// Run middleware and the handler for `route_match`, returning its response.
    ///
    /// Never fails: a missing handler becomes a 500 and a dead coroutine a 503.
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: Option<Value>,
        request_id: RequestId,
    ) -> HandlerResponse {
        let Some(tx) = self.handlers.get(&route_match.handler_name) else {
            error!(
                request_id = %request_id,
                handler_name = %route_match.handler_name,
                available_handlers = ?self.handler_names(),
                "Handler not found"
            );
            return ApiError::Internal(format!(
                "No handler registered for '{}'",
                route_match.handler_name
            ))
            .into();
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path: route_match.route.path_pattern.to_string(),
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            body,
            reply_tx,
        };

        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            let resp = mw.before(&request);
            if early_resp.is_none() {
                early_resp = resp;
            }
        }

        let (mut resp, latency) = match early_resp {
            Some(r) => (r, Duration::ZERO),
            None => {
                let start = Instant::now();
                let handler_name = Arc::clone(&request.handler_name);
                if let Err(e) = tx.send(request.clone()) {
                    error!(request_id = %request_id, handler_name = %handler_name, error = %e, "Failed to send request to handler");
                    return ApiError::Unavailable(format!("Handler '{handler_name}' is not running"))
                        .into();
                }
                match reply_rx.recv() {
                    Ok(r) => (r, start.elapsed()),
                    Err(e) => {
                        error!(
                            request_id = %request_id,
                            handler_name = %handler_name,
                            error = %e,
                            "Handler channel closed before reply"
                        );
                        return ApiError::Unavailable(format!(
                            "Handler '{handler_name}' is not responding"
                        ))
                        .into();
                    }
                }
            }
        };

        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }
        resp
    }
}
