use crate::error::ApiError;
use crate::handlers::get_item::{Request, Response};
use crate::handlers::types::{Item, ITEM_ID};
use crate::typed::{Handler, TypedHandlerRequest};

pub const NOT_FOUND: &str = "not found";

/// The one item that exists.
pub fn sample_item() -> Item {
    Item {
        id: ITEM_ID,
        name: "sample".to_string(),
        price: 10.0,
    }
}

pub fn get_item(item_id: i64) -> Result<Item, ApiError> {
    if item_id == ITEM_ID {
        Ok(sample_item())
    } else {
        Err(ApiError::NotFound(NOT_FOUND.to_string()))
    }
}

pub struct GetItemController;

impl Handler for GetItemController {
    type Request = Request;
    type Response = Response;

    fn handle(&self, req: TypedHandlerRequest<Request>) -> Result<Response, ApiError> {
        get_item(req.data.item_id)
    }
}
