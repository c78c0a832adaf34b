//! Nexus Inventory Store
//!
//! This library holds the catalog and order book for the Nexus storefront.
//!
//! The library is divided into three sections:
//! 1. Backend contracts ([`mod@traits`]). Any storage backend must implement these traits in order to serve the
//!    storefront. The SQLite backend in [`mod@sqlite`] is the only one shipped.
//! 2. The data types that flow in and out of the store ([`mod@db_types`]).
//! 3. The public API ([`InventoryApi`], [`OrderFlowApi`] and [`UserApi`]). Callers should go through these wrappers
//!    rather than the backend directly, since they carry the validation that the backends assume has been done.
//!
//! Placing an order is the one operation with real concurrency concerns. Stock is decremented with a conditional
//! update inside a single transaction, so two orders racing for the last units can never both commit.
pub mod db_types;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

mod store_api;

#[cfg(feature = "test_utils")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use store_api::{
    errors::StoreError,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    user_api::UserApi,
};
pub use traits::{InventoryManagement, OrderManagement, UserManagement};
