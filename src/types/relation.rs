//! 标准连接标签

pub const SUCCESS: &str = "Success";
pub const FAILURE: &str = "Failure";
pub const TRUE: &str = "True";
pub const FALSE: &str = "False";
pub const OTHER: &str = "Other";
