//! SQLite backend for the Nexus inventory store.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
