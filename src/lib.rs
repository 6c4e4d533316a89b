pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod lineup;
pub mod parquet_input;
pub mod pipeline;
pub mod profile;
pub mod ratios;
pub mod records;
pub mod roster;
pub mod snapshot;
pub mod store;
pub mod streak;
pub mod table;
pub mod team_form;
pub mod timeline;
pub mod window;

pub use config::FeatureConfig;
pub use error::{FeatureError, Result};
pub use pipeline::{FeatureRun, run_features};

/// Loads `.env.local`/`.env` and installs the log subscriber (`RUST_LOG`,
/// default `info`).
pub fn init_runtime() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
