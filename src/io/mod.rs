//! Input/output helpers.
//!
//! - JSON key/value file standing in for browser local storage (`store`)
//! - dataset exports to CSV (`export`)

pub mod export;
pub mod store;

pub use export::*;
pub use store::LocalStore;
