use super::types::Item;
use crate::dispatcher::HandlerRequest;
use crate::error::ApiError;
use crate::validator::{saturating_parse_integer, FieldIssue, IssueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Integers beyond the `i64` range are clamped; they can never be a stored id.
    pub item_id: i64,
}

pub type Response = Item;

impl TryFrom<HandlerRequest> for Request {
    type Error = ApiError;

    fn try_from(req: HandlerRequest) -> Result<Self, Self::Error> {
        let raw = req.get_path_param("item_id").ok_or_else(|| {
            ApiError::Validation(vec![FieldIssue::new(
                IssueKind::Missing,
                ["path", "item_id"],
            )])
        })?;
        let item_id = saturating_parse_integer(raw).ok_or_else(|| {
            ApiError::Validation(vec![FieldIssue::new(
                IssueKind::IntParsing,
                ["path", "item_id"],
            )])
        })?;
        Ok(Request { item_id })
    }
}
