// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Documentation generation orchestration.
//!
//! The heavy lifting (markup parsing, HTML rendering) lives in the
//! external `ndoc` tool; this module drives it, caches its output on
//! the drive, and tracks every stage as a report event.

use crate::SharedReport;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use nb_core::{Global, Login, Platform, WorkPaths};
use nb_remote::{cmake, run_shell, ssh};
use nb_report::{log_state, DocEvent, DocOutcome, EventKey};
use tracing::{error, info, warn};

/// Lines the generator marks as warnings.
const NDOC_WARN: &str = "[Warning]";

/// Lines the generator marks as errors.
const NDOC_ERROR: &str = "[Error]";

fn pick_lines(text: &str, word: &str) -> (u32, String) {
    let mut n = 0;
    let mut picked = String::new();
    for line in text.lines() {
        if line.contains(word) {
            picked.push_str(line);
            picked.push('\n');
            n += 1;
        }
    }
    (n, picked)
}

/// Generator invocation: the binary sits next to the coordinator.
pub(crate) fn ndoc_cmd(
    global: &Global,
    project_vers: &str,
    repo_vers: u32,
    doc_repo_vers: u32,
    ndoc_outpath: &str,
) -> String {
    let ndoc = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join(nb_core::NDOC_APP)))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| nb_core::NDOC_APP.to_string());

    format!(
        "{} -v {}.{} -r {} {} {} {} -s {}/{} {} {} {} -o {}",
        ndoc,
        project_vers,
        doc_repo_vers,
        global.doc_repo_url,
        global.doc_repo_user,
        global.doc_repo_pass,
        doc_repo_vers,
        global.repo_url,
        global.repo_branch,
        global.repo_user,
        global.repo_pass,
        repo_vers,
        ndoc_outpath
    )
}

/// Build one ebook with the LaTeX toolchain: alternating passes over
/// the generated sources, then the pdf is published into the website.
async fn ebook(
    lang: &str,
    global: &Global,
    doc_repo_vers: u32,
    wpaths: &WorkPaths,
    report: &SharedReport,
) -> bool {
    let sub = if lang == "en" {
        DocEvent::EbookEn
    } else {
        DocEvent::EbookEs
    };
    let key = EventKey::Doc(doc_repo_vers, sub);
    let tex_path = wpaths.tmp_ndoc.join("tex").join(lang);
    let tex_file = tex_path.join(format!("ndoc_{}.tex", lang));
    let msg = format!("{} ebook '{}' lang", global.project, lang);

    report.lock().begin(key);

    let mut ok = true;
    let mut error_msg = None;

    if tex_file.exists() {
        info!("{}. Beginning", msg);
        let dir = tex_path.to_string_lossy();
        let cmdtex = format!(
            "cd {} && xelatex -synctex=1 -interaction=nonstopmode ndoc_{}.tex",
            dir, lang
        );
        let cmdidx = format!("cd {} && makeindex ndoc_{}.idx", dir, lang);

        // Alternate LaTeX and index passes until references settle
        for cmd in [&cmdtex, &cmdidx, &cmdtex, &cmdidx, &cmdtex] {
            if !run_shell(cmd).await.ok() {
                ok = false;
                error_msg = Some(cmd.to_string());
                break;
            }
        }

        if ok {
            let from = tex_path.join(format!("ndoc_{}.pdf", lang));
            let to = wpaths
                .tmp_ndoc
                .join("web/res")
                .join(format!("{}_{}.pdf", global.project.to_lowercase(), lang));
            if tokio::fs::copy(&from, &to).await.is_err() {
                ok = false;
                error_msg = Some(format!("Copying '{}'", to.display()));
            }
        }
    }

    let state = {
        let mut rep = report.lock();
        rep.finish(key, ok, error_msg);
        rep.state(key)
    };
    log_state(&state, &msg);
    ok
}

/// Upload a generated website tree to the hosting endpoint.
async fn upload_website(
    global: &Global,
    local_path: &str,
    hosting_path: &str,
) -> Result<(), String> {
    info!(
        "Begin upload '{}' to '{}:{}'",
        local_path, global.hosting_url, hosting_path
    );

    let login = Login {
        ip: global.hosting_url.clone(),
        user: global.hosting_user.clone(),
        pass: global.hosting_pass.clone(),
        platform: Platform::Linux,
        localhost: false,
        use_sshpass: !global.hosting_cert,
    };

    let chmod = format!("chmod -R 777 {}", local_path);
    if !run_shell(&chmod).await.ok() {
        return Err(format!("Error chmod in '{}'", local_path));
    }

    if !ssh::create_dir(&login, hosting_path).await {
        return Err(format!("Creating hosting path '{}'", hosting_path));
    }

    let from = format!("{}/*", local_path);
    if !ssh::upload(&from, &login, hosting_path, true).await {
        return Err(format!(
            "Uploading website in hosting path '{}'",
            hosting_path
        ));
    }

    info!(
        "Uploaded '{}' to '{}:{}'",
        local_path, global.hosting_url, hosting_path
    );
    Ok(())
}

struct DocRun {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    warns: String,
    errors: String,
    nwarns: u32,
    nerrors: u32,
    ret: i32,
    in_cache: bool,
    hosting_url: String,
}

#[allow(clippy::too_many_arguments)]
async fn generate_inner(
    global: &Global,
    drive: &Login,
    project_vers: &str,
    repo_vers: u32,
    doc_repo_vers: u32,
    drive_doc: &str,
    wpaths: &WorkPaths,
    report: &SharedReport,
    run: &mut DocRun,
) -> Result<(), String> {
    // Previously generated documentation is cached on the drive
    if ssh::file_exists(drive, drive_doc, "stdout.txt").await
        && ssh::file_exists(drive, drive_doc, "stderr.txt").await
    {
        let stdout = ssh::file_cat(drive, drive_doc, "stdout.txt").await;
        let stderr = ssh::file_cat(drive, drive_doc, "stderr.txt").await;

        let Some(stdout) = stdout.filter(|s| s.len() > 1) else {
            return Err(format!(
                "Error reading ndoc stdout.txt from '{}'",
                drive_doc
            ));
        };

        info!("Documentation '{}' in cache '{}'", doc_repo_vers, drive_doc);
        run.stdout = stdout;
        run.stderr = stderr.unwrap_or_default();
        run.in_cache = true;
        return Ok(());
    }

    /* Run the generator */
    {
        let key = EventKey::Doc(doc_repo_vers, DocEvent::Ndoc);
        let msg = "ndoc generator";
        let cmd = ndoc_cmd(
            global,
            project_vers,
            repo_vers,
            doc_repo_vers,
            &wpaths.tmp_ndoc.to_string_lossy(),
        );

        info!("{}. Beginning", msg);
        report.lock().begin(key);
        let out = run_shell(&cmd).await;
        run.ret = out.code;
        run.stdout = out.stdout;
        run.stderr = out.stderr;

        let ok = out.code == 0;
        let ndoc_error = if ok {
            None
        } else {
            Some("Error running ndoc process".to_string())
        };
        let state = {
            let mut rep = report.lock();
            rep.finish(key, ok, ndoc_error);
            rep.state(key)
        };
        log_state(&state, msg);

        let stdout_text = String::from_utf8_lossy(&run.stdout);
        let (nwarns, warns) = pick_lines(&stdout_text, NDOC_WARN);
        let (nerrors, errors) = pick_lines(&stdout_text, NDOC_ERROR);
        run.nwarns = nwarns;
        run.warns = warns;
        run.nerrors = nerrors;
        run.errors = errors;

        if nerrors > 0 || nwarns > 0 {
            warn!("{}. {} errors and {} warnings", msg, nerrors, nwarns);
        }

        if !ok {
            return Err(format!("Error running '{}'", cmd));
        }
    }

    /* Ebooks, only from clean documentation */
    if run.nwarns == 0 && run.nerrors == 0 {
        if !ebook("en", global, doc_repo_vers, wpaths, report).await {
            run.nerrors += 1;
            run.errors.push_str("Error generating 'en' ebook\n");
        }
        if !ebook("es", global, doc_repo_vers, wpaths, report).await {
            run.nerrors += 1;
            run.errors.push_str("Error generating 'es' ebook\n");
        }
    }

    /* Copy the website and the captured streams to the drive */
    {
        let key = EventKey::Doc(doc_repo_vers, DocEvent::Copy);
        let msg = "Copy doc to drive";
        info!("{}. Beginning", msg);
        report.lock().begin(key);

        let websrc = wpaths.tmp_ndoc.join("web");
        let tarpath = wpaths.tmp_ndoc.join(nb_core::WEB_TAR);
        let tmp_ndoc = wpaths.tmp_ndoc.to_string_lossy();

        let mut copy_error = None;
        let mut ok = cmake::tar(
            None,
            &websrc.to_string_lossy(),
            &tarpath.to_string_lossy(),
        )
        .await;
        if !ok {
            copy_error = Some(format!(
                "Error compressing website to '{}'",
                tarpath.display()
            ));
        }

        if ok {
            ok = ssh::copy(
                None,
                &tmp_ndoc,
                nb_core::WEB_TAR,
                Some(drive),
                drive_doc,
                nb_core::WEB_TAR,
            )
            .await;
            if !ok {
                copy_error = Some(format!(
                    "Error copying '{}' to '{}'",
                    nb_core::WEB_TAR,
                    drive_doc
                ));
            }
        }

        if ok {
            ok = ssh::to_file(Some(drive), drive_doc, "stdout.txt", &run.stdout).await;
            if !ok {
                copy_error = Some(format!("Error copying ndoc stdout to '{}'", drive_doc));
            }
        }

        if ok {
            ok = ssh::to_file(Some(drive), drive_doc, "stderr.txt", &run.stderr).await;
            if !ok {
                copy_error = Some(format!("Error copying ndoc stderr to '{}'", drive_doc));
            }
        }

        let failure = copy_error.clone();
        let state = {
            let mut rep = report.lock();
            rep.finish(key, ok, copy_error);
            rep.state(key)
        };
        log_state(&state, msg);

        if let Some(msg) = failure {
            return Err(msg);
        }
    }

    /* Upload to the hosting website */
    if !global.hosting_url.is_empty() {
        let key = EventKey::Doc(doc_repo_vers, DocEvent::Upload);
        let msg = format!(
            "Upload website to '{}:{}'",
            global.hosting_url, global.hosting_docpath
        );
        info!("{}. Beginning", msg);
        report.lock().begin(key);

        let local_path = wpaths.tmp_ndoc.join("web");
        let hosting_path = format!("{}/r{}", global.hosting_docpath, doc_repo_vers);
        let outcome = upload_website(global, &local_path.to_string_lossy(), &hosting_path).await;

        let ok = outcome.is_ok();
        let failure = outcome.err();
        let state = {
            let mut rep = report.lock();
            rep.finish(key, ok, failure.clone());
            rep.state(key)
        };
        log_state(&state, &msg);

        run.hosting_url = format!("{}/docs/r{}", global.doc_url, doc_repo_vers);
        if let Some(msg) = failure {
            return Err(msg);
        }
    } else {
        warn!("Documentation is not uploaded because no hosting data provided");
    }

    Ok(())
}

/// Generate (or reuse) the documentation for one doc-repo revision.
/// Skipped entirely when the parent event is already done.
pub(crate) async fn generate(
    global: &Global,
    drive: &Login,
    project_vers: &str,
    repo_vers: u32,
    doc_repo_vers: u32,
    wpaths: &WorkPaths,
    report: &SharedReport,
) -> bool {
    let key = EventKey::Doc(doc_repo_vers, DocEvent::Doc);
    if report.lock().state(key).done {
        return true;
    }

    let Some(drive_doc) = wpaths.drive_doc.clone() else {
        error!("Documentation drive path is not available");
        return false;
    };

    let msg = format!("Generate documentation '{}'", doc_repo_vers);
    info!("{}. Starting", msg);
    report.lock().begin(key);

    let mut run = DocRun {
        stdout: Vec::new(),
        stderr: Vec::new(),
        warns: String::new(),
        errors: String::new(),
        nwarns: 0,
        nerrors: 0,
        ret: 0,
        in_cache: false,
        hosting_url: String::new(),
    };

    let outcome = generate_inner(
        global,
        drive,
        project_vers,
        repo_vers,
        doc_repo_vers,
        &drive_doc,
        wpaths,
        report,
        &mut run,
    )
    .await;

    let ok = outcome.is_ok();
    {
        let mut rep = report.lock();
        rep.doc_outcome(
            doc_repo_vers,
            DocOutcome {
                hosting_url: run.hosting_url,
                stdout_b64: B64.encode(&run.stdout),
                stderr_b64: B64.encode(&run.stderr),
                warns_b64: B64.encode(&run.warns),
                errors_b64: B64.encode(&run.errors),
                in_cache: run.in_cache,
                ret: run.ret,
                nwarns: run.nwarns,
                nerrors: run.nerrors,
            },
        );
        rep.finish(key, ok, outcome.err());
    }
    let state = report.lock().state(key);
    log_state(&state, &msg);
    ok
}

#[cfg(test)]
#[path = "docs_tests.rs"]
mod tests;
