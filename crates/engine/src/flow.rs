// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The CI loop: one invocation stages sources, runs pending jobs, and
//! persists the report. Restarting resumes from the persisted state.

use crate::sched::{self, SchedCtx};
use crate::{docs, stage, webrep, SharedReport};
use nb_core::{Network, Workflow, WorkPaths};
use nb_report::{page, EventKey, Report};
use nb_remote::{repo, ssh};
use parking_lot::Mutex;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Failures before the loop begins; they abort the invocation with a
/// non-zero exit. Anything that goes wrong after staging has started is
/// recorded in the report and retried by the next loop instead.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Workflow(#[from] nb_core::WorkflowError),
    #[error("unable to get repo version '{0}'")]
    BranchVersion(String),
    #[error("unable to get repo version '{0}'")]
    TargetVersion(String),
    #[error("nothing to build, empty targets/paths")]
    NothingToBuild,
    #[error("unable to get project version '{0}'")]
    ProjectVersion(String),
    #[error("unable to get documentation repo version '{0}'")]
    DocVersion(String),
    #[error("invalid ignore pattern '{0}'")]
    IgnorePattern(String),
    #[error("invalid job pattern '{0}'")]
    JobPattern(String),
}

async fn resolve_target_versions(
    workflow: &mut Workflow,
    repo_url: &str,
) -> Result<(), FlowError> {
    let user = workflow.global.repo_user.clone();
    let pass = workflow.global.repo_pass.clone();

    for target in workflow.sources.iter_mut().chain(workflow.tests.iter_mut()) {
        let url = format!("{}/{}", repo_url, target.name);
        match repo::version(&url, &user, &pass).await {
            Some(vers) => target.repo_vers = Some(vers),
            None => return Err(FlowError::TargetVersion(url)),
        }
    }
    Ok(())
}

async fn project_version(
    repo_url: &str,
    vers_file: &str,
    repo_vers: u32,
    user: &str,
    pass: &str,
) -> Option<String> {
    let url = format!("{}/{}", repo_url, vers_file);
    let data = repo::cat(&url, repo_vers, user, pass).await?;
    let text = String::from_utf8_lossy(&data);
    let line = text.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.to_string())
}

fn ignore_regexes(patterns: &[String]) -> Result<Vec<Regex>, FlowError> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|_| FlowError::IgnorePattern(p.clone())))
        .collect()
}

/// Check for a concurrent invocation, reset the staging tree, and take
/// the lock. `false` aborts the loop without touching any lock another
/// instance may hold.
async fn create_temp_paths(wpaths: &WorkPaths, flowid: &str) -> bool {
    let lockpath = wpaths.tmp_path.join(nb_core::LOCKFILE);
    if lockpath.exists() {
        error!("another nbuild is running for this flow '{}'", flowid);
        return false;
    }

    if wpaths.tmp_path.exists() && tokio::fs::remove_dir_all(&wpaths.tmp_path).await.is_err() {
        error!("Removing previous '{}' temp folder", wpaths.tmp_path.display());
        return false;
    }

    for dir in [
        &wpaths.tmp_path,
        &wpaths.tmp_src,
        &wpaths.tmp_test,
        &wpaths.tmp_ndoc,
        &wpaths.tmp_nrep,
    ] {
        if tokio::fs::create_dir_all(dir).await.is_err() {
            error!("Creating directory '{}'", dir.display());
            return false;
        }
        info!("Directory '{}'", dir.display());
    }

    // The formatter expects its configuration in the working directory
    if std::env::set_current_dir(&wpaths.tmp_path).is_err() {
        error!(
            "Error setting working directory '{}'",
            wpaths.tmp_path.display()
        );
        return false;
    }

    if tokio::fs::write(&lockpath, lockpath.to_string_lossy().as_bytes())
        .await
        .is_err()
    {
        error!("Error creating lockfile '{}'", lockpath.display());
        return false;
    }

    true
}

async fn create_remote_paths(wpaths: &WorkPaths, drive: &nb_core::Login) -> bool {
    let mut dirs = vec![&wpaths.drive_path, &wpaths.drive_inf];
    if let Some(doc) = &wpaths.drive_doc {
        dirs.push(doc);
    }
    dirs.push(&wpaths.drive_rep);
    dirs.push(&wpaths.drive_rep_web);

    for dir in dirs {
        if ssh::create_dir(drive, dir).await {
            info!("Directory '{}'", dir);
        } else {
            error!("Creating directory '{}'", dir);
            return false;
        }
    }
    true
}

async fn load_or_init_report(
    wpaths: &WorkPaths,
    drive: &nb_core::Login,
    repo_url: &str,
    repo_vers: u32,
) -> Option<Report> {
    if ssh::file_exists(drive, &wpaths.drive_inf, nb_core::REPORT_JSON).await {
        let data = ssh::file_cat(drive, &wpaths.drive_inf, nb_core::REPORT_JSON).await?;
        match Report::from_json(&data) {
            Ok(mut report) => {
                info!("Read '{}'", nb_core::REPORT_JSON);
                report.loop_incr();
                Some(report)
            }
            Err(err) => {
                error!("Reading '{}': {}", nb_core::REPORT_JSON, err);
                None
            }
        }
    } else {
        info!("Created '{}'", nb_core::REPORT_JSON);
        Some(Report::new(repo_url, repo_vers))
    }
}

async fn save_report(data: Result<Vec<u8>, serde_json::Error>, drive: &nb_core::Login, infdir: &str) {
    match data {
        Ok(data) => {
            if !ssh::to_file(Some(drive), infdir, nb_core::REPORT_JSON, &data).await {
                error!("Writing '{}'.", nb_core::REPORT_JSON);
            }
        }
        Err(err) => error!("Serialising '{}': {}", nb_core::REPORT_JSON, err),
    }
}

async fn stage_all(
    ctx: &SchedCtx,
    ignore: &[Regex],
    repo_url: &str,
    doc_repo_vers: Option<u32>,
    project_vers: &str,
    report: &SharedReport,
) -> bool {
    let global = &ctx.workflow.global;
    let wpaths = &ctx.wpaths;

    /* Target source files */
    let format_file = stage::clang_format_file(
        &ctx.workflow.sources,
        repo_url,
        &global.repo_user,
        &global.repo_pass,
        ctx.repo_vers,
        &wpaths.tmp_path,
    )
    .await;

    for target in &ctx.workflow.sources {
        if !stage::stage_target(
            target,
            global,
            ignore,
            ctx.repo_vers,
            format_file.as_deref(),
            &wpaths.tmp_src,
            "Source",
            false,
            report,
        )
        .await
        {
            return false;
        }
    }

    /* Copy the tests */
    for target in &ctx.workflow.tests {
        if !stage::stage_target(
            target,
            global,
            ignore,
            ctx.repo_vers,
            None,
            &wpaths.tmp_test,
            "Test",
            true,
            report,
        )
        .await
        {
            return false;
        }
    }

    if !stage::build_file(&ctx.workflow.build, ctx.repo_vers, wpaths, report).await {
        return false;
    }

    /* Compress source and test packages */
    let drive = &ctx.network.drive.login;
    if !stage::tar_upload(
        drive,
        wpaths,
        &wpaths.tmp_src,
        nb_core::SRC_TAR,
        EventKey::SrcTar,
        report,
    )
    .await
    {
        return false;
    }

    if !ctx.workflow.tests.is_empty()
        && !stage::tar_upload(
            drive,
            wpaths,
            &wpaths.tmp_test,
            nb_core::TEST_TAR,
            EventKey::TestTar,
            report,
        )
        .await
    {
        return false;
    }

    /* Project documentation */
    if let Some(doc_vers) = doc_repo_vers {
        if !docs::generate(
            global,
            drive,
            project_vers,
            ctx.repo_vers,
            doc_vers,
            wpaths,
            report,
        )
        .await
        {
            return false;
        }
    }

    true
}

/// Run one CI loop. Returns the drive directory holding the report so
/// the coordinator log can be copied next to it.
pub async fn run(
    mut workflow: Workflow,
    network: Network,
    forced_jobs: &str,
    logfile: &Path,
    tmp_root: &Path,
) -> Result<String, FlowError> {
    workflow.validate()?;

    let forced_pattern = if forced_jobs.is_empty() {
        None
    } else {
        Some(Regex::new(forced_jobs).map_err(|_| FlowError::JobPattern(forced_jobs.to_string()))?)
    };

    /* Current repo version (build branch) */
    let repo_url = format!("{}/{}", workflow.global.repo_url, workflow.global.repo_branch);
    let branch_vers = repo::version(
        &repo_url,
        &workflow.global.repo_user,
        &workflow.global.repo_pass,
    )
    .await
    .ok_or_else(|| FlowError::BranchVersion(repo_url.clone()))?;

    resolve_target_versions(&mut workflow, &repo_url).await?;

    /* The repo version to build */
    let (repo_vers, vers_info) = match workflow.revision_under_build() {
        Some((vers, info)) => (vers, info.to_string()),
        None => return Err(FlowError::NothingToBuild),
    };

    let project_vers = project_version(
        &repo_url,
        &workflow.version,
        repo_vers,
        &workflow.global.repo_user,
        &workflow.global.repo_pass,
    )
    .await
    .ok_or_else(|| FlowError::ProjectVersion(workflow.version.clone()))?;

    /* The documentation repo version */
    let doc_repo_vers = if workflow.global.doc_repo_url.is_empty() {
        None
    } else {
        let vers = repo::version(
            &workflow.global.doc_repo_url,
            &workflow.global.doc_repo_user,
            &workflow.global.doc_repo_pass,
        )
        .await
        .ok_or_else(|| FlowError::DocVersion(workflow.global.doc_repo_url.clone()))?;
        Some(vers)
    };

    info!(
        "{} ({}) - {}",
        workflow.global.project, project_vers, workflow.global.description
    );
    info!("Branch: {} '{}'", branch_vers, workflow.global.repo_branch);
    info!("Repo vers: {} '{}'", repo_vers, vers_info);
    match doc_repo_vers {
        Some(vers) => info!("Doc repo vers: {}", vers),
        None => warn!("No documentation will be generated ('doc_repo_url')"),
    }

    let ignore = ignore_regexes(&workflow.ignore)?;

    let wpaths = WorkPaths::new(
        &network.drive,
        tmp_root,
        &workflow.global.flowid,
        repo_vers,
        doc_repo_vers,
    );
    let flowid = workflow.global.flowid.clone();
    let drive_inf = wpaths.drive_inf.clone();

    let ctx = Arc::new(SchedCtx {
        network,
        workflow,
        wpaths,
        repo_vers,
    });

    /* Directories and the flow lock */
    if !create_temp_paths(&ctx.wpaths, &flowid).await {
        return Ok(drive_inf);
    }

    let drive_login = ctx.network.drive.login.clone();
    if !create_remote_paths(&ctx.wpaths, &drive_login).await {
        remove_lock(&ctx.wpaths).await;
        return Ok(drive_inf);
    }

    /* Load or initialise the report */
    let Some(report) =
        load_or_init_report(&ctx.wpaths, &drive_login, &repo_url, repo_vers).await
    else {
        remove_lock(&ctx.wpaths).await;
        return Ok(drive_inf);
    };

    info!("CI/CD current Loop: {}", report.loop_current());
    let report: SharedReport = Arc::new(Mutex::new(report));
    report.lock().loop_init();

    /* Staging */
    let staged = stage_all(
        &ctx,
        &ignore,
        &repo_url,
        doc_repo_vers,
        &project_vers,
        &report,
    )
    .await;

    /* Jobs */
    if staged && report.lock().can_start_jobs(doc_repo_vers) {
        let with_tests = ctx.workflow.with_test_execs();
        let seljobs = {
            let mut rep = report.lock();
            match &forced_pattern {
                Some(pattern) => {
                    info!("Forced jobs with pattern '{}'", forced_jobs);
                    rep.force_jobs(pattern, &ctx.workflow.jobs, with_tests)
                }
                None => rep.select_jobs(&ctx.workflow.jobs, with_tests),
            }
        };

        if seljobs.is_empty() {
            warn!("No jobs pending, nothing to do");
        } else {
            sched::start(Arc::clone(&ctx), &seljobs, Arc::clone(&report)).await;
        }
    }

    /* Update and persist the report */
    let logdata = tokio::fs::read(logfile).await.unwrap_or_default();
    let (json, content, loop_id, seconds) = {
        let mut rep = report.lock();
        rep.loop_end(&logdata);
        (
            rep.to_json(),
            page::render(&rep, &ctx.workflow.jobs, &ctx.workflow.global, &project_vers),
            rep.loop_current(),
            rep.loop_seconds(None),
        )
    };
    save_report(json, &drive_login, &ctx.wpaths.drive_inf).await;

    /* Report website */
    webrep::generate(&ctx, content, &project_vers).await;

    /* Summary */
    info!("{}-{}", ctx.workflow.global.project, repo_vers);
    info!("Loop: {} ({} seconds)", loop_id, seconds);

    remove_lock(&ctx.wpaths).await;
    Ok(drive_inf)
}

async fn remove_lock(wpaths: &WorkPaths) {
    let lockpath = wpaths.tmp_path.join(nb_core::LOCKFILE);
    let _ = tokio::fs::remove_file(lockpath).await;
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
