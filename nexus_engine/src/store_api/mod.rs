//! The public face of the inventory store.
//!
//! Each API object wraps a backend implementing one of the [`traits`](crate::traits) and adds the validation the
//! backends rely on. The server holds one of each behind `web::Data`.
pub mod errors;
pub mod inventory_api;
pub mod order_flow_api;
pub mod user_api;
