use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use stockscan_core::error::StockscanError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "stockscan.log";

/// Install the global subscriber: stderr at `RUST_LOG` (default `info`),
/// plus a debug-level file under `log_dir` when one is given.
pub fn init(log_dir: Option<&Path>) -> Result<(), StockscanError> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn,rustls=warn"));

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("debug,hyper=info,reqwest=info,rustls=info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .with(file_layer)
        .init();
    Ok(())
}
