//! 装备：库存、指派、容器物品与临期提醒

pub mod handler;
pub mod model;
pub mod service;

pub use service::GearService;
