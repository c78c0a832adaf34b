use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::db_types::{ItemId, OrderId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Item {0} does not exist")]
    ItemNotFound(ItemId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("An item named '{0}' already exists")]
    DuplicateItemName(String),
    #[error("Item names cannot be empty")]
    EmptyItemName,
    #[error("Insufficient stock for item {item_id}. Requested {requested}, but only {available} available")]
    InsufficientStock { item_id: ItemId, requested: i64, available: i64 },
    #[error("Item {0} appears on existing orders and cannot be removed")]
    ItemInUse(ItemId),
    #[error("Invalid quantity {quantity} for item {item_id}. Quantities must be positive")]
    InvalidQuantity { item_id: ItemId, quantity: i64 },
    #[error("Stock levels cannot be negative. Got {0}")]
    NegativeStock(i64),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Returns the kind of constraint violation carried by a driver error, if any.
pub(crate) fn constraint_kind(e: &sqlx::Error) -> Option<ErrorKind> {
    match e {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::Other => None,
            kind => Some(kind),
        },
        _ => None,
    }
}
