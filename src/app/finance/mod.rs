//! 财务：客户、产出分配、销售、订单、支出与汇总

pub mod handler;
pub mod model;
pub mod service;
pub mod summary;

pub use service::FinanceService;
