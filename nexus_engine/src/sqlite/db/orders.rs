use chrono::Utc;
use log::{debug, trace};
use sqlx::{error::ErrorKind, SqliteConnection};

use crate::{
    db_types::{ItemId, Order, OrderId, OrderLine},
    sqlite::db::items,
    store_api::errors::constraint_kind,
    StoreError,
};

/// Inserts a new order header for `user_id`, stamped with the current time. This is not atomic on its own. Embed the
/// call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(user_id: &str, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let result = sqlx::query("INSERT INTO orders (user_id, created_at) VALUES ($1, $2);")
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    let order = fetch_order(result.last_insert_rowid(), conn).await?.ok_or(sqlx::Error::RowNotFound)?;
    trace!("🗃️ Order header #{} created for {user_id}", order.id);
    Ok(order)
}

/// Inserts one order line and takes its quantity out of stock.
///
/// The stock decrement is conditional. If it touches no rows, the item is re-read to tell a vanished item apart from
/// a shortage, and the matching error is returned so that the caller can abandon the transaction.
pub async fn insert_order_line(
    order_id: OrderId,
    item_id: ItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let inserted = sqlx::query("INSERT INTO order_items (order_id, item_id, quantity) VALUES ($1, $2, $3)")
        .bind(order_id)
        .bind(item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await;
    match inserted {
        Ok(_) => {},
        Err(e) if matches!(constraint_kind(&e), Some(ErrorKind::ForeignKeyViolation)) => {
            return Err(StoreError::ItemNotFound(item_id));
        },
        Err(e) => return Err(e.into()),
    }
    if items::decrement_stock(item_id, quantity, &mut *conn).await? {
        trace!("🗃️ Order #{order_id}: {quantity} x item {item_id} reserved");
        return Ok(());
    }
    match items::fetch_item(item_id, conn).await? {
        None => Err(StoreError::ItemNotFound(item_id)),
        Some(item) => {
            debug!("🗃️ Order #{order_id}: item {item_id} has {} in stock, but {quantity} were requested", item.stock);
            Err(StoreError::InsufficientStock { item_id, requested: quantity, available: item.stock })
        },
    }
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY item_id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Fetches the orders for `user_id`, oldest first.
pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at, id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Deletes the order header. Its lines go with it through `ON DELETE CASCADE`. Returns `false` if there was no such
/// order.
pub async fn delete_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
