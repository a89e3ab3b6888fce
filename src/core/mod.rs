//! 核心层：错误、响应、提取器、中间件与派生视图

pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod view;

pub use error::{CoreError, ErrorResponse};
pub use response::{ApiResponse, ApiResult, Created};
