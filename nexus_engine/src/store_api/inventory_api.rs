//! Unifies API for reading and editing the item catalog.

use std::fmt::Debug;

use log::{debug, trace};

use crate::{
    db_types::{name_key, Item, ItemId, NewItem},
    traits::InventoryManagement,
    StoreError,
};

/// The `InventoryApi` wraps an [`InventoryManagement`] backend and validates writes before they reach it.
pub struct InventoryApi<B> {
    db: B,
}

impl<B: Debug> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi ({:?})", self.db)
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        self.db.list_items().await
    }

    /// Fetches a single item. A missing item is an error here, unlike at the backend level.
    pub async fn fetch_item(&self, item_id: ItemId) -> Result<Item, StoreError> {
        self.db.fetch_item(item_id).await?.ok_or(StoreError::ItemNotFound(item_id))
    }

    /// Adds a new item to the catalog and returns its id.
    ///
    /// The name must be non-empty and must not match an existing name, ignoring case. The current catalog is scanned
    /// first so that the common case fails fast; the backend's unique index settles races between two writers.
    pub async fn add_item(&self, item: NewItem) -> Result<ItemId, StoreError> {
        if item.name.trim().is_empty() {
            return Err(StoreError::EmptyItemName);
        }
        if item.stock < 0 {
            return Err(StoreError::NegativeStock(item.stock));
        }
        let key = item.name_key();
        let existing = self.db.list_items().await?;
        if let Some(clash) = existing.iter().find(|i| name_key(&i.name) == key) {
            debug!("🗃️ Cannot add '{}'. Item {} is already called '{}'", item.name, clash.id, clash.name);
            return Err(StoreError::DuplicateItemName(item.name));
        }
        let id = self.db.insert_item(item).await?;
        trace!("🗃️ Item {id} added to the catalog");
        Ok(id)
    }

    /// Overwrites the stock level for an item. Negative levels are rejected.
    pub async fn update_item_stock(&self, item_id: ItemId, stock: i64) -> Result<(), StoreError> {
        if stock < 0 {
            return Err(StoreError::NegativeStock(stock));
        }
        self.db.update_item_stock(item_id, stock).await
    }

    pub async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError> {
        self.db.delete_item(item_id).await
    }

    pub async fn set_item_image(&self, item_id: ItemId, image_url: &str) -> Result<(), StoreError> {
        self.db.set_item_image(item_id, image_url).await
    }
}
