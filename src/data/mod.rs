//! Mock data generation and the live dataset store.

pub mod manager;
pub mod mock;
pub mod universe;

pub use manager::{DataManager, ManagerConfig};
pub use mock::{generate, generate_review_item};
