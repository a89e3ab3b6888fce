//! 日历：从订单、复盘、装备和签到派生的按日议程

pub mod handler;
pub mod model;
pub mod service;

pub use service::CalendarService;
