use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::error::ApiError;
use crate::ids::RequestId;
use serde::Serialize;
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::warn;

pub trait Handler: Send + 'static {
    type Request: TryFrom<HandlerRequest, Error = ApiError> + Send + 'static;
    type Response: Serialize + Send + 'static;

    fn handle(&self, req: TypedHandlerRequest<Self::Request>) -> Result<Self::Response, ApiError>;
}

/// Request metadata plus the converted input.
#[derive(Debug, Clone)]
pub struct TypedHandlerRequest<T> {
    pub request_id: RequestId,
    pub handler_name: Arc<str>,
    pub data: T,
}

impl<T> TypedHandlerRequest<T>
where
    T: TryFrom<HandlerRequest, Error = ApiError>,
{
    pub fn from_handler(req: HandlerRequest) -> Result<Self, ApiError> {
        let request_id = req.request_id;
        let handler_name = Arc::clone(&req.handler_name);
        let data = T::try_from(req)?;
        Ok(TypedHandlerRequest {
            request_id,
            handler_name,
            data,
        })
    }
}

/// Convert, handle and serialize one request.
pub(crate) fn run_typed<H: Handler>(handler: &H, req: HandlerRequest) -> HandlerResponse {
    let typed = match TypedHandlerRequest::<H::Request>::from_handler(req) {
        Ok(t) => t,
        Err(e) => return e.into(),
    };
    let request_id = typed.request_id;
    match handler.handle(typed) {
        Ok(resp) => match serde_json::to_value(resp) {
            Ok(body) => HandlerResponse::json(200, body),
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Failed to serialize handler response");
                ApiError::Internal("Failed to serialize response".to_string()).into()
            }
        },
        Err(e) => e.into(),
    }
}

impl Dispatcher {
    /// Spawn a coroutine serving `handler` under `name`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Dispatcher::register_handler`].
    pub unsafe fn register_typed<H>(&mut self, name: &str, handler: H) -> std::io::Result<()>
    where
        H: Handler,
    {
        unsafe {
            self.register_handler(name, move |req: HandlerRequest| {
                let reply_tx = req.reply_tx.clone();
                let request_id = req.request_id;
                let response = run_typed(&handler, req);
                if reply_tx.send(response).is_err() {
                    warn!(request_id = %request_id, "Caller gone before handler reply");
                }
            })
        }
    }
}
