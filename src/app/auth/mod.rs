//! 登录与会话

pub mod handler;
pub mod middleware;
pub mod model;
pub mod service;

pub use service::AuthService;
