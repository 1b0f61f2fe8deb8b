//! Domain types used throughout the desk.
//!
//! This module defines:
//!
//! - dataset records (`DataPoint`, `Record` and its per-type payloads)
//! - pull tasks (`PullTask`, `TaskStatus`, `TaskConfig`)
//! - review batches (`ReviewTask`, `ReviewItem`, `ReviewStatus`)

pub mod types;

pub use types::*;
