//! # Backend contracts
//!
//! These traits define the behaviour that a storage backend must expose to act as the Nexus inventory store.
//!
//! * [`InventoryManagement`] reads and mutates the item catalog.
//! * [`OrderManagement`] places, queries and deletes orders. Placing an order is the only operation that touches
//!   both the catalog and the order book, and it must do so atomically.
//! * [`UserManagement`] keeps the local copy of identity provider profiles.
//!
//! Every method returns [`StoreError`](crate::StoreError). Backends report missing rows as `Ok(None)` from fetch
//! methods, and as `ItemNotFound`/`OrderNotFound` from mutating methods.
mod inventory_management;
mod order_management;
mod user_management;

pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
