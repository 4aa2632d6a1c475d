// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-report website: the per-revision report page plus the site
//! around it, rebuilt every loop from a checked-out skeleton.

use crate::sched::SchedCtx;
use nb_remote::{cmake, repo, run_shell, ssh};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct WebSection {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    docs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WebConfig {
    #[serde(default)]
    web: Vec<WebSection>,
}

/// Rewrite the skeleton's section config so it lists every stored
/// report page, newest first.
pub(crate) fn update_config(config: &str, mut stems: Vec<String>) -> Option<String> {
    let mut parsed: WebConfig = serde_json::from_str(config).ok()?;
    let section = parsed.web.first_mut()?;
    stems.sort_by_key(|s| s.trim_start_matches('r').parse::<u32>().unwrap_or(0));
    stems.reverse();
    section.docs = stems;
    serde_json::to_string_pretty(&parsed).ok()
}

/// Site generator invocation for the report website (`-p` page mode).
pub(crate) fn ndoc_report_cmd(
    project_vers: &str,
    repo_vers: u32,
    srcpath: &str,
    outpath: &str,
) -> String {
    let ndoc = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join(nb_core::NDOC_APP)))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| nb_core::NDOC_APP.to_string());

    format!(
        "{} -v {}.{} -p {} -o {}",
        ndoc, project_vers, repo_vers, srcpath, outpath
    )
}

/// Landing page that redirects to the newest report.
pub(crate) fn bindex_html(repo_vers: u32) -> String {
    format!(
        "<meta http-equiv=\"Refresh\" content=\"0; url='r{}.html'\" />",
        repo_vers
    )
}

async fn checkout_skeleton(ctx: &SchedCtx, repsrc: &Path) -> bool {
    let global = &ctx.workflow.global;
    let Some(vers) = repo::version(
        &global.web_report_repo_url,
        &global.web_report_repo_user,
        &global.web_report_repo_pass,
    )
    .await
    else {
        error!(
            "Getting version of build doc repo '{}'.",
            global.web_report_repo_url
        );
        return false;
    };

    if !repo::checkout(
        &global.web_report_repo_url,
        &global.web_report_repo_user,
        &global.web_report_repo_pass,
        vers,
        &repsrc.to_string_lossy(),
    )
    .await
    {
        error!(
            "Unable to checkout repo '{}' in '{}'",
            global.web_report_repo_url,
            repsrc.display()
        );
        return false;
    }

    true
}

async fn rewrite_config(repsrc: &Path) -> bool {
    let json_file = repsrc.join("builds/config.json");
    let Ok(config) = tokio::fs::read_to_string(&json_file).await else {
        error!("Reading '{}'", json_file.display());
        return false;
    };

    let pages = repsrc.join("builds/en");
    let mut stems = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(&pages).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let stem = name.rsplit_once('.').map(|(s, _)| s.to_string()).unwrap_or(name);
            stems.push(stem);
        }
    }

    let Some(updated) = update_config(&config, stems) else {
        error!("Web report config.json with wrong content");
        return false;
    };

    tokio::fs::write(&json_file, updated).await.is_ok()
}

/// Generate the report website for this revision: check out the site
/// skeleton, merge in the pages of previous revisions, add the current
/// one, rebuild the site, and store/upload the result.
pub(crate) async fn generate(ctx: &SchedCtx, page: String, project_vers: &str) -> bool {
    let global = &ctx.workflow.global;
    if global.web_report_repo_url.is_empty() {
        warn!("No web report will be generated ('web_report_repo_url')");
        return true;
    }

    let wpaths = &ctx.wpaths;
    let drive = &ctx.network.drive.login;
    info!("Beginning web report 'r{}.htm'", ctx.repo_vers);

    let repsrc = wpaths.tmp_nrep.join("src");
    let repdir = repsrc.join("builds/en");
    let repname = format!("r{}.htm", ctx.repo_vers);

    if wpaths.tmp_nrep.exists() && tokio::fs::remove_dir_all(&wpaths.tmp_nrep).await.is_err() {
        error!("Removing report workpath '{}'", wpaths.tmp_nrep.display());
        return false;
    }
    if tokio::fs::create_dir_all(&wpaths.tmp_nrep).await.is_err() {
        return false;
    }

    if !checkout_skeleton(ctx, &repsrc).await {
        return false;
    }

    /* Pages of previous revisions live on the drive */
    ssh::copy_dir(Some(drive), &wpaths.drive_rep, None, &repdir.to_string_lossy()).await;

    if tokio::fs::create_dir_all(&repdir).await.is_err()
        || tokio::fs::write(repdir.join(&repname), page).await.is_err()
    {
        error!("Generating build report '{}'", repname);
        return false;
    }

    if !ssh::copy(
        None,
        &repdir.to_string_lossy(),
        &repname,
        Some(drive),
        &wpaths.drive_rep,
        &repname,
    )
    .await
    {
        error!("Storing current report '{}'", repname);
        return false;
    }

    if !rewrite_config(&repsrc).await {
        return false;
    }

    /* Build the website around the pages */
    let outpath = wpaths.tmp_nrep.join("ndoc");
    let cmd = ndoc_report_cmd(
        project_vers,
        ctx.repo_vers,
        &repsrc.to_string_lossy(),
        &outpath.to_string_lossy(),
    );
    if !run_shell(&cmd).await.ok() {
        error!("Generating build report website '{}'", outpath.display());
        return false;
    }

    let bindex = outpath.join("web/en/builds/bindex.html");
    if let Some(parent) = bindex.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    if tokio::fs::write(&bindex, bindex_html(ctx.repo_vers)).await.is_err() {
        error!("Writing '{}'", bindex.display());
        return false;
    }

    /* Store the generated website on the drive */
    let websrc = outpath.join("web");
    let tarpath = wpaths.tmp_nrep.join(nb_core::REP_TAR);
    if !cmake::tar(None, &websrc.to_string_lossy(), &tarpath.to_string_lossy()).await {
        error!("Compressing generated report website '{}'", websrc.display());
        return false;
    }
    if !ssh::copy(
        None,
        &wpaths.tmp_nrep.to_string_lossy(),
        nb_core::REP_TAR,
        Some(drive),
        &wpaths.drive_rep_web,
        nb_core::REP_TAR,
    )
    .await
    {
        error!("Storing generated report website '{}'", wpaths.drive_rep_web);
        return false;
    }
    info!("Stored generated report website '{}'", wpaths.drive_rep_web);

    /* Upload to the hosting endpoint */
    if !global.hosting_url.is_empty() {
        let login = nb_core::Login {
            ip: global.hosting_url.clone(),
            user: global.hosting_user.clone(),
            pass: global.hosting_pass.clone(),
            platform: nb_core::Platform::Linux,
            localhost: false,
            use_sshpass: !global.hosting_cert,
        };
        let from = format!("{}/*", websrc.to_string_lossy());
        if !ssh::upload(&from, &login, &global.hosting_buildpath, true).await {
            error!(
                "Uploading website in hosting path '{}'",
                global.hosting_buildpath
            );
            return false;
        }
    }

    true
}

#[cfg(test)]
#[path = "webrep_tests.rs"]
mod tests;
