//! Log sink for one run.
//!
//! Builds a `tracing` dispatch writing timestamped lines to an append-only log
//! file, optionally mirrored to stdout. The caller installs it for the
//! duration of the run with `tracing::dispatcher::with_default`; nothing is
//! registered globally, so library code logs into the void under test.

use crate::error::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default level when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

/// Build the dispatch for a run. `verbose` mirrors every line to stdout.
pub fn build_dispatch(log_file: &Path, verbose: bool) -> Result<Dispatch> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    let console_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer);

    Ok(Dispatch::new(subscriber))
}
