use std::collections::BTreeMap;

use mockall::mock;
use nexus_engine::{
    db_types::{Item, ItemId, NewItem, Order, OrderId, OrderWithLines, User, UserProfile},
    traits::{InventoryManagement, OrderManagement, UserManagement},
    StoreError,
};

mock! {
    pub Store {}
    impl InventoryManagement for Store {
        async fn list_items(&self) -> Result<Vec<Item>, StoreError>;
        async fn fetch_item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError>;
        async fn insert_item(&self, item: NewItem) -> Result<ItemId, StoreError>;
        async fn update_item_stock(&self, item_id: ItemId, stock: i64) -> Result<(), StoreError>;
        async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError>;
        async fn set_item_image(&self, item_id: ItemId, image_url: &str) -> Result<(), StoreError>;
    }
    impl OrderManagement for Store {
        async fn place_order(&self, user_id: &str, lines: &BTreeMap<ItemId, i64>) -> Result<OrderId, StoreError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;
        async fn fetch_order(&self, order_id: OrderId) -> Result<Option<OrderWithLines>, StoreError>;
        async fn delete_order(&self, order_id: OrderId) -> Result<(), StoreError>;
    }
    impl UserManagement for Store {
        async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError>;
    }
}
