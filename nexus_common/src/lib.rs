mod price;

pub mod helpers;
mod secret;

pub use price::{Price, PriceError};
pub use secret::Secret;
