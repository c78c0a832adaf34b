//! # Nexus server
//! This crate hosts the HTTP server for the Nexus storefront. It is responsible for:
//! * Verifying the OpenID Connect identity tokens that accompany requests, and enforcing role-based access.
//! * Serving the item catalog, and letting administrators add, restock and remove items.
//! * Placing orders against the inventory, and letting users read and delete their own orders.
//! * Running the login flow with the identity provider and keeping the session in cookies.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/items`, `/items/add`, `/items/update`, `/items/delete`: The catalog. Changes require the `admin` role.
//! * `/orders`: Place, list, fetch and delete orders. Requires a valid identity token.
//! * `/me`: Synchronise and return the caller's profile.
//! * `/login`, `/redirect`, `/logout`: The login session.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod server;
pub mod session_routes;
pub mod uploads;

#[cfg(test)]
mod endpoint_tests;
