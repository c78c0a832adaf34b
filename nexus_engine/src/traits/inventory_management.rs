use crate::{
    db_types::{Item, ItemId, NewItem},
    StoreError,
};

/// The `InventoryManagement` trait defines behaviour for reading and editing the item catalog.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Returns a snapshot of every item in the catalog, ordered by id.
    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    async fn fetch_item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Inserts a new item and returns its id.
    ///
    /// Names are unique without regard to case. A backend must reject a colliding name with
    /// [`StoreError::DuplicateItemName`] even if the caller has already checked, since another writer may have
    /// inserted the same name in the meantime.
    async fn insert_item(&self, item: NewItem) -> Result<ItemId, StoreError>;

    /// Overwrites the stock level of an item. Returns [`StoreError::ItemNotFound`] if there is no such item.
    async fn update_item_stock(&self, item_id: ItemId, stock: i64) -> Result<(), StoreError>;

    /// Removes an item from the catalog.
    ///
    /// Items that appear on any order line cannot be removed, and [`StoreError::ItemInUse`] is returned.
    async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError>;

    /// Records where the image for an item is served from.
    async fn set_item_image(&self, item_id: ItemId, image_url: &str) -> Result<(), StoreError>;
}
