#![cfg(not(tarpaulin_include))]

use parkmap::app;
use parkmap::config::ServerConfig;
use std::env;
use std::path::PathBuf;

/// Main entry point for the parking map web service
///
/// Usage: `website [config.json]`. Settings missing from the file fall back
/// to defaults, then `PARKMAP_*` environment variables override them.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;

    app::run(config).await
}
