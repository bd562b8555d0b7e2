use crate::dispatcher::HandlerRequest;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct Request;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            status: "ok".to_string(),
        }
    }
}

impl TryFrom<HandlerRequest> for Request {
    type Error = ApiError;

    fn try_from(_req: HandlerRequest) -> Result<Self, Self::Error> {
        Ok(Request)
    }
}
