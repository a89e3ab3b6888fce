//! 基础设施层：日志、存储

#[cfg(feature = "database")]
pub mod database;
pub mod logger;
pub mod store;

pub use store::{MemoryStore, Record, Store};
