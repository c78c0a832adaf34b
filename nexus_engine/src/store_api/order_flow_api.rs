use std::{collections::BTreeMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{ItemId, Order, OrderId, OrderWithLines},
    traits::{InventoryManagement, OrderManagement},
    StoreError,
};

/// `OrderFlowApi` is the primary API for placing and managing customer orders.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.db)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + InventoryManagement
{
    /// Places a new order for `user_id`.
    ///
    /// `lines` must already be coalesced, so that each item id appears once. Before anything is written,
    /// * every quantity must be positive, otherwise [`StoreError::InvalidQuantity`] is returned, and
    /// * every item must exist, otherwise [`StoreError::ItemNotFound`] is returned.
    ///
    /// The order itself is then written in a single transaction by the backend. If any line is short of stock, the
    /// whole order fails with [`StoreError::InsufficientStock`] and nothing changes.
    pub async fn place_order(&self, user_id: &str, lines: &BTreeMap<ItemId, i64>) -> Result<OrderId, StoreError> {
        for (&item_id, &quantity) in lines {
            if quantity <= 0 {
                return Err(StoreError::InvalidQuantity { item_id, quantity });
            }
        }
        for &item_id in lines.keys() {
            if self.db.fetch_item(item_id).await?.is_none() {
                debug!("📦️ Order from {user_id} rejected. Item {item_id} does not exist");
                return Err(StoreError::ItemNotFound(item_id));
            }
        }
        let order_id = self.db.place_order(user_id, lines).await?;
        info!("📦️ Order #{order_id} placed by {user_id} ({} lines)", lines.len());
        Ok(order_id)
    }

    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// Fetches an order and its lines. Callers must check ownership themselves.
    pub async fn fetch_order(&self, order_id: OrderId) -> Result<OrderWithLines, StoreError> {
        self.db.fetch_order(order_id).await?.ok_or(StoreError::OrderNotFound(order_id))
    }

    pub async fn delete_order(&self, order_id: OrderId) -> Result<(), StoreError> {
        self.db.delete_order(order_id).await?;
        info!("📦️ Order #{order_id} deleted");
        Ok(())
    }
}
