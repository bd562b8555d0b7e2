use crate::error::ApiError;
use crate::handlers::health::{Request, Response};
use crate::typed::{Handler, TypedHandlerRequest};

pub struct HealthController;

impl Handler for HealthController {
    type Request = Request;
    type Response = Response;

    fn handle(&self, _req: TypedHandlerRequest<Request>) -> Result<Response, ApiError> {
        Ok(Response::ok())
    }
}
