//! Log output for the terminal host.
//!
//! The host owns the terminal, so logs go to a file. The filter comes from
//! `SEQCANVAS_LOG` (same syntax as `RUST_LOG`), defaulting to `info`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "SEQCANVAS_LOG";

/// `seqcanvas-<random>.log` in the temp directory.
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join(format!("seqcanvas-{:08x}.log", rand::random::<u32>()))
}

/// Filter from `SEQCANVAS_LOG`, or `default` when unset or invalid.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber writing to `path` (or a fresh temp file)
/// and returns the path in use.
pub fn init(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map_or_else(default_log_path, Path::to_path_buf);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(path)
}
