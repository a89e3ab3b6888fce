//! 开发跟踪与用户反馈

pub mod handler;
pub mod model;
pub mod service;

pub use service::DevTrackerService;
