use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "vitals-query";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Row-derived insights shown for a list query before the overflow summary
pub const LIST_INSIGHT_LIMIT: usize = 10;

/// Window used by the "recent" filter, independent of any requested period
pub const RECENT_WINDOW_DAYS: u32 = 30;

/// Row cap for the `labs_recent` preset when none is given
pub const DEFAULT_PRESET_LIMIT: u32 = 10;

/// Default lookback for trend analysis
pub const DEFAULT_TREND_DAYS: u32 = 90;

/// Slope magnitude above which a series is labelled increasing or decreasing
pub const TREND_SLOPE_THRESHOLD: f64 = 1.0;

/// Payload field whose numeric prefix feeds average/maximum/minimum aggregates
pub const AGGREGATE_SOURCE_FIELD: &str = "result_value";

/// Payload fields tried, in order, for a trend point's value
pub const TREND_VALUE_FIELDS: [&str; 4] = ["value", "result_value", "result", "amount"];

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the SQLite record store
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("records.db")
}

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "vitals_query=info"
}
