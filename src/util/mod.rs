mod format;

pub use format::{format_size, format_timestamp, parse_date, timestamp_date};
