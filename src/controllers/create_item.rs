use crate::error::ApiError;
use crate::handlers::create_item::{Request, Response};
use crate::handlers::types::{Item, ITEM_ID};
use crate::typed::{Handler, TypedHandlerRequest};
use tracing::debug;

pub const PRICE_MUST_BE_POSITIVE: &str = "price must be > 0";

/// Echo the item back with the fixed id; the name is taken verbatim, empty included.
pub fn create_item(input: Request) -> Result<Item, ApiError> {
    if input.price <= 0.0 {
        return Err(ApiError::BusinessRule(PRICE_MUST_BE_POSITIVE.to_string()));
    }
    Ok(Item {
        id: ITEM_ID,
        name: input.name,
        price: input.price,
    })
}

pub struct CreateItemController;

impl Handler for CreateItemController {
    type Request = Request;
    type Response = Response;

    fn handle(&self, req: TypedHandlerRequest<Request>) -> Result<Response, ApiError> {
        debug!(request_id = %req.request_id, handler = %req.handler_name, price = req.data.price, "Creating item");
        create_item(req.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("book", 12.5)]
    #[case("pen", 0.01)]
    #[case("", 1.0)]
    #[case("   ", 3.0)]
    #[case("car", 1e9)]
    fn test_positive_price_echoes_input(#[case] name: &str, #[case] price: f64) {
        let item = create_item(Request {
            name: name.to_string(),
            price,
        })
        .unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(item.name, name);
        assert_eq!(item.price, price);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.0)]
    #[case(-1.0)]
    #[case(-0.0001)]
    fn test_non_positive_price_rejected(#[case] price: f64) {
        let err = create_item(Request {
            name: "book".to_string(),
            price,
        })
        .unwrap_err();
        assert_eq!(err, ApiError::BusinessRule(PRICE_MUST_BE_POSITIVE.to_string()));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_price_serializes_as_float() {
        let item = create_item(Request {
            name: "book".to_string(),
            price: 12.0,
        })
        .unwrap();
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"id":1,"name":"book","price":12.0}"#
        );
    }
}
