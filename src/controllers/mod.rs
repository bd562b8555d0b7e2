//! Business logic for each operation, exposed as typed [`Handler`](crate::typed::Handler)s.

pub mod create_item;
pub mod get_item;
pub mod health;

pub use create_item::CreateItemController;
pub use get_item::GetItemController;
pub use health::HealthController;
