pub mod commit;
pub mod commit_id;

pub const SHORT_ID_LENGTH: usize = 6;
pub const UNCOMMITTED_ID: &str = "0000000000000000000000000000000000000000";
pub const LOG_FIELD_SEPARATOR: &str = "|";
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
