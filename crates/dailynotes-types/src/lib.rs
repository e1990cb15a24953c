pub mod api;
pub mod models;

/// Calendar date format used for task partitions and digest targets.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
