//! 数据传输对象
//!
//! 请求和响应的结构定义，线上格式统一为 camelCase

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
