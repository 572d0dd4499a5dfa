//! 服务端特有的实体模型

pub mod operation_log;

pub use operation_log::OperationLog;
