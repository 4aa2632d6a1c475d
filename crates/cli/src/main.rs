// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nbuild - multi-host continuous-integration coordinator
//!
//! One invocation runs one CI loop: stage sources from the repository,
//! distribute them to matched runner hosts, build and test each job,
//! and persist the per-revision report on the drive.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod logging;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nb_core::{Network, Workflow};
use nb_remote::{local_ips, ssh};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "nbuild",
    version,
    about = "CMake-based C/C++ continuous-integration coordinator"
)]
struct Cli {
    /// Build network description
    #[arg(short = 'n', value_name = "network.json")]
    network: PathBuf,

    /// Workflow description
    #[arg(short = 'w', value_name = "workflow.json")]
    workflow: PathBuf,

    /// Re-run jobs whose name matches this pattern, even when done
    #[arg(short = 'j', value_name = "pattern")]
    jobs: Option<String>,
}

fn load_network(path: &Path) -> Result<Network> {
    let data = std::fs::read(path)
        .with_context(|| format!("Opening '{}' file", path.display()))?;
    let network: Network = serde_json::from_slice(&data)
        .with_context(|| format!("Cannot load '{}' network file", path.display()))?;
    Ok(network)
}

fn load_workflow(path: &Path) -> Result<Workflow> {
    let data = std::fs::read(path)
        .with_context(|| format!("Reading workflow file '{}'", path.display()))?;
    let workflow: Workflow = serde_json::from_slice(&data)
        .with_context(|| format!("Parsing workflow file '{}'", path.display()))?;
    Ok(workflow)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let logfile = logging::init()?;

    info!("nbuild {}", env!("CARGO_PKG_VERSION"));

    /* Coordinator staging root */
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot resolve the home directory"))?;
    let tmp_root = home.join(nb_core::TMP_FOLDER);
    if !tmp_root.exists() {
        std::fs::create_dir_all(&tmp_root)
            .with_context(|| format!("Creating '{}' temp folder", tmp_root.display()))?;
        info!("Created '{}' tmp folder", tmp_root.display());
    }

    /* Build network */
    let ips = local_ips().await;
    if ips.is_empty() {
        return Err(anyhow!("Cannot resolve local ip addresses"));
    }

    let mut network = load_network(&cli.network)?;
    network.refresh_localhost(&ips);
    network.validate()?;
    info!("Drive '{}' '{}'", network.drive.name, network.drive.path);

    let drive_login = network.drive.login.clone();
    let forced_jobs = cli.jobs.unwrap_or_default();

    /* Workflow */
    let workflow = load_workflow(&cli.workflow)?;
    info!("Running workflow '{}'", cli.workflow.display());

    let logdir = nb_engine::run(workflow, network, &forced_jobs, &logfile, &tmp_root).await?;

    /* Copy the log file to the drive */
    let (path, file) = split_pathname(&logfile);
    if !ssh::copy(None, &path, &file, Some(&drive_login), &logdir, &file).await {
        return Err(anyhow!(
            "Error copy logfile '{}' in '{}' directory",
            file,
            logdir
        ));
    }

    Ok(())
}

fn split_pathname(path: &Path) -> (String, String) {
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, file)
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("nbuild: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
