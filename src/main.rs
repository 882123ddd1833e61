//! DrishtiLink daemon - vision telemetry and discovery for the robot network
//!
//! ## Protocol architecture
//!
//! - **UDP (port 5800)**: discovery. The daemon broadcasts its presence at a
//!   configurable interval and answers inbound `Discover` packets directly.
//! - **TCP (port 5801)**: goal reports. Clients connect and poll
//!   `GetGoalDistance`; each request is answered from the most recent
//!   vision observation.

use drishti_link::config::AppConfig;
use drishti_link::error::Result;
use drishti_link::server::Server;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/drishti-link.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `drishti-link <path>` (positional)
/// - `drishti-link --config <path>` (flag-based)
/// - `drishti-link -c <path>` (short flag)
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    // An explicitly given config path must load; the default path may be
    // absent, in which case the compiled-in defaults apply.
    let (config, config_note) = match parse_config_path() {
        Some(path) => (
            AppConfig::from_file(&path)?,
            format!("config loaded from {}", path),
        ),
        None => match AppConfig::from_file(DEFAULT_CONFIG_PATH) {
            Ok(config) => (
                config,
                format!("config loaded from {}", DEFAULT_CONFIG_PATH),
            ),
            Err(_) => (
                AppConfig::default(),
                format!("no config at {}, using defaults", DEFAULT_CONFIG_PATH),
            ),
        },
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("DrishtiLink v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("{}", config_note);

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| {
        drishti_link::Error::Other(format!("error setting Ctrl-C handler: {}", e))
    })?;

    let server = Server::new(config);
    server.run(running)?;

    log::info!("DrishtiLink stopped");
    Ok(())
}
