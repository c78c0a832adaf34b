use std::collections::BTreeMap;

use nexus_engine::db_types::{ItemId, OrderId};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

impl PlaceOrderRequest {
    /// Merges repeated item ids into a single line each, summing their quantities.
    ///
    /// Every line must have a positive quantity, and the order must contain at least one line.
    pub fn coalesce(&self) -> Result<BTreeMap<ItemId, i64>, ServerError> {
        if self.items.is_empty() {
            return Err(ServerError::InvalidRequest("An order must contain at least one item.".into()));
        }
        let mut lines = BTreeMap::new();
        for line in &self.items {
            if line.quantity <= 0 {
                return Err(ServerError::InvalidRequest(format!(
                    "Quantity for item {} must be positive, but was {}.",
                    line.item_id, line.quantity
                )));
            }
            let total = lines.entry(line.item_id).or_insert(0i64);
            *total = total
                .checked_add(line.quantity)
                .ok_or_else(|| ServerError::InvalidRequest(format!("Quantity for item {} is too large.", line.item_id)))?;
        }
        Ok(lines)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStockRequest {
    pub item_id: ItemId,
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemRequest {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
}

/// Query parameters the identity provider sends back to `/redirect`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
