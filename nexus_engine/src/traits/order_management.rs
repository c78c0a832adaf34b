use std::collections::BTreeMap;

use crate::{
    db_types::{ItemId, Order, OrderId, OrderWithLines},
    StoreError,
};

/// The `OrderManagement` trait defines behaviour for placing and querying orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Places an order for `user_id` in a single all-or-nothing transaction.
    ///
    /// `lines` maps each item id to the quantity wanted. Callers are expected to have coalesced duplicate item ids
    /// and rejected non-positive quantities already. For every line the backend must
    /// * insert the order line, and
    /// * decrement the item's stock, but only if the stock on hand covers the quantity.
    ///
    /// If any line fails, nothing is written: no order header, no lines and no stock changes.
    ///
    /// Returns the id of the new order.
    async fn place_order(&self, user_id: &str, lines: &BTreeMap<ItemId, i64>) -> Result<OrderId, StoreError>;

    /// Returns the order headers belonging to `user_id`, oldest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Returns the order and its lines. No ownership check is made here.
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderWithLines>, StoreError>;

    /// Deletes the order and its lines. Stock is not returned to the catalog.
    async fn delete_order(&self, order_id: OrderId) -> Result<(), StoreError>;
}
