//! `SqliteDatabase` is the SQLite implementation of a Nexus inventory store backend.
//!
//! It implements all the traits defined in the [`traits`](crate::traits) module.
use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, items, new_pool, orders, run_migrations, users};
use crate::{
    db_types::{Item, ItemId, NewItem, Order, OrderId, OrderWithLines, User, UserProfile},
    traits::{InventoryManagement, OrderManagement, UserManagement},
    StoreError,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = items::fetch_all_items(&mut conn).await?;
        Ok(items)
    }

    async fn fetch_item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let item = items::fetch_item(item_id, &mut conn).await?;
        Ok(item)
    }

    async fn insert_item(&self, item: NewItem) -> Result<ItemId, StoreError> {
        let mut conn = self.pool.acquire().await?;
        items::insert_item(item, &mut conn).await
    }

    async fn update_item_stock(&self, item_id: ItemId, stock: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if items::update_stock(item_id, stock, &mut conn).await? {
            Ok(())
        } else {
            Err(StoreError::ItemNotFound(item_id))
        }
    }

    /// Deletes the item in a single statement. Order lines reference items with `ON DELETE RESTRICT`, so an item that
    /// has been ordered is refused with [`StoreError::ItemInUse`].
    async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if items::delete_item(item_id, &mut conn).await? {
            debug!("🗃️ Item {item_id} deleted");
            Ok(())
        } else {
            Err(StoreError::ItemNotFound(item_id))
        }
    }

    async fn set_item_image(&self, item_id: ItemId, image_url: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if items::set_image_url(item_id, image_url, &mut conn).await? {
            Ok(())
        } else {
            Err(StoreError::ItemNotFound(item_id))
        }
    }
}

impl OrderManagement for SqliteDatabase {
    /// Takes a set of coalesced order lines, and in a single atomic transaction,
    /// * inserts the order header for `user_id`,
    /// * inserts each order line and decrements the item's stock, provided there is enough on hand.
    ///
    /// The first line that fails aborts the whole order. The transaction is rolled back when it is dropped on the
    /// early return, which also covers the future being dropped mid-flight.
    async fn place_order(&self, user_id: &str, lines: &BTreeMap<ItemId, i64>) -> Result<OrderId, StoreError> {
        if let Some((&item_id, &quantity)) = lines.iter().find(|&(_, &q)| q <= 0) {
            return Err(StoreError::InvalidQuantity { item_id, quantity });
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(user_id, &mut tx).await?;
        for (&item_id, &quantity) in lines {
            orders::insert_order_line(order.id, item_id, quantity, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} with {} lines committed for {user_id}", order.id, lines.len());
        Ok(order.id)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderWithLines>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::fetch_order(order_id, &mut tx).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let order_items = orders::fetch_order_lines(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(OrderWithLines { order, order_items }))
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if orders::delete_order(order_id, &mut conn).await? {
            debug!("🗃️ Order #{order_id} deleted");
            Ok(())
        } else {
            Err(StoreError::OrderNotFound(order_id))
        }
    }
}

impl UserManagement for SqliteDatabase {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::upsert_user(profile, &mut conn).await?;
        trace!("🗃️ Profile for {} saved", profile.id);
        Ok(user)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `NEXUS_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        run_migrations(&self.pool).await
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
