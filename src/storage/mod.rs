// src/storage/mod.rs
// Persistence for card records and the review audit log.
// The scheduler itself never touches storage; these are the boundary adapters around it.

pub mod db;
pub mod review_log;

pub use self::db::CardStore;
pub use self::review_log::{ReviewLog, ReviewLogEntry};
