pub mod config;
pub mod models;
pub mod db;
pub mod query; // Intent parsing, query compilation, result interpretation, trends

pub use db::{RecordStore, SqliteRecordStore};
pub use query::{PresetQuery, PresetResponse, QueryEngine, QueryResponse, TrendResponse};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honoring `RUST_LOG` when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
