use super::types::Item;
use crate::dispatcher::HandlerRequest;
use crate::error::ApiError;
use crate::validator::{FieldIssue, IssueKind};
use serde::{Deserialize, Serialize};

/// Body of `POST /items`. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    pub price: f64,
}

pub type Response = Item;

impl TryFrom<HandlerRequest> for Request {
    type Error = ApiError;

    fn try_from(req: HandlerRequest) -> Result<Self, Self::Error> {
        let Some(body) = req.body else {
            return Err(ApiError::Validation(vec![FieldIssue::new(
                IssueKind::Missing,
                ["body"],
            )]));
        };
        serde_json::from_value(body).map_err(|e| {
            ApiError::Validation(vec![
                FieldIssue::new(IssueKind::ValueError, ["body"]).with_msg(e.to_string())
            ])
        })
    }
}
