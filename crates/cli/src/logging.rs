// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator logging: ANSI console output plus a per-invocation log
//! file whose bytes end up embedded in the report at loop end.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Timestamped log file name for this invocation.
pub fn logfile_name(now: &chrono::DateTime<Local>) -> String {
    now.format("%Y_%m_%d_%H_%M_log.txt").to_string()
}

/// Install the global subscriber and return the log file path.
///
/// Workers log concurrently; the file writer is a `Mutex<File>` so
/// lines are appended atomically.
pub fn init() -> Result<PathBuf> {
    let appdata = dirs::data_dir().ok_or_else(|| anyhow!("Cannot resolve the appdata directory"))?;
    let logdir = appdata.join("nbuild");
    std::fs::create_dir_all(&logdir)
        .with_context(|| format!("Creating '{}' log folder", logdir.display()))?;

    let logfile = logdir.join(logfile_name(&Local::now()));
    let file = File::create(&logfile)
        .with_context(|| format!("Creating '{}' log file", logfile.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|err| anyhow!("Installing the logger: {}", err))?;

    Ok(logfile)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
