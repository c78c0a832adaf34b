use log::{debug, trace};
use sqlx::{error::ErrorKind, SqliteConnection};

use crate::{
    db_types::{name_key, Item, ItemId, NewItem},
    store_api::errors::constraint_kind,
    StoreError,
};

pub async fn fetch_all_items(conn: &mut SqliteConnection) -> Result<Vec<Item>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM items ORDER BY id").fetch_all(conn).await?;
    Ok(items)
}

pub async fn fetch_item(item_id: ItemId, conn: &mut SqliteConnection) -> Result<Option<Item>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM items WHERE id = $1").bind(item_id).fetch_optional(conn).await?;
    Ok(item)
}

/// Inserts a new item. The unique index on `name COLLATE NOCASE` turns a racing duplicate into
/// [`StoreError::DuplicateItemName`].
///
/// The statement is executed to completion, so that the write is committed before the connection returns to the
/// pool.
pub async fn insert_item(item: NewItem, conn: &mut SqliteConnection) -> Result<ItemId, StoreError> {
    let name = item.name.trim().to_string();
    let result = sqlx::query(
        r#"
            INSERT INTO items (name, description, price, stock, image_url)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(&name)
    .bind(&item.description)
    .bind(item.price)
    .bind(item.stock)
    .bind(&item.image_url)
    .execute(conn)
    .await;
    match result {
        Ok(r) => {
            let id = r.last_insert_rowid();
            debug!("🗃️ Item '{name}' inserted with id {id}");
            Ok(id)
        },
        Err(e) if matches!(constraint_kind(&e), Some(ErrorKind::UniqueViolation)) => {
            debug!("🗃️ Item '{name}' collides with an existing name ({})", name_key(&name));
            Err(StoreError::DuplicateItemName(name))
        },
        Err(e) => Err(e.into()),
    }
}

/// Overwrites the stock of an item. Returns `false` if no item has the given id.
pub async fn update_stock(item_id: ItemId, stock: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE items SET stock = $1 WHERE id = $2").bind(stock).bind(item_id).execute(conn).await?;
    trace!("🗃️ Stock for item {item_id} set to {stock}. {} rows affected", result.rows_affected());
    Ok(result.rows_affected() > 0)
}

/// Decrements the stock of an item, but only if there is enough on hand to cover `quantity`.
///
/// Returns `false` when the item is missing or short of stock. The update is a single statement, so the check and
/// the decrement cannot be separated by another writer.
pub async fn decrement_stock(
    item_id: ItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE items SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
        .bind(quantity)
        .bind(item_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_image_url(item_id: ItemId, image_url: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE items SET image_url = $1 WHERE id = $2").bind(image_url).bind(item_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes the item. Returns `false` if there was no such item.
///
/// Order lines reference items with `ON DELETE RESTRICT`, so deleting an item that has been ordered fails with
/// [`StoreError::ItemInUse`].
pub async fn delete_item(item_id: ItemId, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM items WHERE id = $1").bind(item_id).execute(conn).await;
    match result {
        Ok(r) => Ok(r.rows_affected() > 0),
        Err(e) if matches!(constraint_kind(&e), Some(ErrorKind::ForeignKeyViolation)) => {
            Err(StoreError::ItemInUse(item_id))
        },
        Err(e) => Err(e.into()),
    }
}
