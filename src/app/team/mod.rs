//! 团队：名册、健康记录、战备状态

pub mod handler;
pub mod model;
pub mod service;

pub use service::TeamService;
