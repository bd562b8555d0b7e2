use serde::{Deserialize, Serialize};

/// Every created item gets this id; nothing is stored.
pub const ITEM_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: f64,
}
