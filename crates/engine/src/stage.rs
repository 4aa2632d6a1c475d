// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target staging: pull source trees from the repository, apply the
//! legal header and the formatter, and package the results.

use crate::SharedReport;
use chrono::{Datelike, Utc};
use nb_core::{Global, Login, Target, WorkPaths};
use nb_remote::{cmake, repo, run_filtered, ssh};
use nb_report::{log_state, EventKey};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Extensions that receive the legal header and the formatter.
const SOURCE_EXTS: [&str; 10] = ["h", "hxx", "hpp", "inl", "ixx", "ipp", "c", "cpp", "m", "def"];

/// Header extensions that get a documentation link.
const HEADER_EXTS: [&str; 3] = ["h", "hxx", "hpp"];

pub(crate) fn is_source_ext(ext: &str) -> bool {
    SOURCE_EXTS.contains(&ext)
}

/// Flags surfaced in the report for each staged target.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StageFlags {
    pub legalized: bool,
    pub formatted: bool,
}

fn file_ext(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("")
}

fn file_stem(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename)
}

fn ignored(ignore: &[Regex], path: &str) -> bool {
    ignore.iter().any(|r| r.is_match(path))
}

/// The formatter wants its configuration file in the working directory;
/// fetch it from the repository when a target provides one.
pub(crate) async fn clang_format_file(
    targets: &[Target],
    repo_base: &str,
    user: &str,
    pass: &str,
    repo_vers: u32,
    cwd: &Path,
) -> Option<PathBuf> {
    for target in targets {
        let filename = target.name.rsplit('/').next().unwrap_or(&target.name);
        if filename != ".clang-format" {
            continue;
        }
        let url = format!("{}/{}", repo_base, target.name);
        match repo::cat(&url, repo_vers, user, pass).await {
            Some(data) => {
                let file = cwd.join(".clang-format");
                if tokio::fs::write(&file, &data).await.is_ok() {
                    return Some(file);
                }
            }
            None => error!("can't access to '{}'", url),
        }
    }
    None
}

/// Probe whether a documentation page exists for a header.
async fn doc_page_exists(url: &str) -> bool {
    match reqwest::Client::new().head(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Block comment prepended to source files: project line, copyright
/// year range, license lines, the file name, and a documentation link
/// for headers whose page exists.
pub(crate) fn legal_header(global: &Global, filename: &str, doc_link: Option<&str>) -> String {
    let year = Utc::now().year() as u32;
    let mut header = String::new();
    header.push_str("/*\n");
    header.push_str(&format!(" * {} {}\n", global.project, global.description));

    if year == global.start_year {
        header.push_str(&format!(" * {} {}\n", global.start_year, global.author));
    } else {
        header.push_str(&format!(
            " * {}-{} {}\n",
            global.start_year, year, global.author
        ));
    }

    for line in &global.license {
        header.push_str(&format!(" * {}\n", line));
    }

    header.push_str(" *\n");
    header.push_str(&format!(" * File: {}\n", filename));

    if let Some(url) = doc_link {
        header.push_str(&format!(" * {}\n", url));
    }

    header.push_str(" *\n */\n\n");
    header
}

struct FileJob<'a> {
    global: &'a Global,
    ignore: &'a [Regex],
    repo_base: &'a str,
    repo_vers: u32,
    file_doc_url: &'a str,
    with_legal: bool,
    format_file: Option<&'a Path>,
}

async fn copy_repo_file(
    job: &FileJob<'_>,
    src: &str,
    dest: &Path,
    flags: &mut StageFlags,
) -> Result<(), String> {
    if ignored(job.ignore, src) {
        return Ok(());
    }

    let url = format!("{}/{}", job.repo_base, src);
    let mut data = repo::cat(&url, job.repo_vers, &job.global.repo_user, &job.global.repo_pass)
        .await
        .ok_or_else(|| format!("Error download '{}'", src))?;

    let filename = dest
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_ext(&filename);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|_| format!("Error creating '{}'", parent.display()))?;
    }

    if job.with_legal && is_source_ext(ext) {
        let doc_link = if !job.global.doc_url.is_empty()
            && !job.file_doc_url.is_empty()
            && HEADER_EXTS.contains(&ext)
        {
            let stem = file_stem(src.rsplit('/').next().unwrap_or(src));
            let url = format!("{}/{}/{}.html", job.global.doc_url, job.file_doc_url, stem);
            if doc_page_exists(&url).await {
                Some(url)
            } else {
                None
            }
        } else {
            None
        };

        let mut with_header = legal_header(job.global, &filename, doc_link.as_deref()).into_bytes();
        with_header.extend_from_slice(&data);
        data = with_header;
        flags.legalized = true;
    }

    if job.format_file.is_some() && is_source_ext(ext) {
        let cmd = format!("clang-format -style=file -assume-filename='{}'", filename);
        if let Some(formatted) = run_filtered(&cmd, &data).await {
            data = formatted;
        }
        flags.formatted = true;
    }

    tokio::fs::write(dest, &data)
        .await
        .map_err(|_| format!("Error copying '{}'", dest.display()))
}

async fn copy_repo_dir(
    job: &FileJob<'_>,
    src: &str,
    dest: &Path,
    flags: &mut StageFlags,
) -> Result<(), String> {
    // Walk the repository tree with an explicit stack; entries ending
    // in '/' are subdirectories.
    let mut stack = vec![(src.to_string(), dest.to_path_buf())];

    while let Some((dir_src, dir_dest)) = stack.pop() {
        let url = format!("{}/{}", job.repo_base, dir_src);
        let entries = repo::list(&url, job.repo_vers, &job.global.repo_user, &job.global.repo_pass)
            .await
            .ok_or_else(|| format!("Error repo list '{}'", url))?;

        for entry in entries {
            if let Some(subdir) = entry.strip_suffix('/') {
                stack.push((format!("{}/{}", dir_src, subdir), dir_dest.join(subdir)));
            } else {
                let file_src = format!("{}/{}", dir_src, entry);
                copy_repo_file(job, &file_src, &dir_dest.join(&entry), flags).await?;
            }
        }
    }

    Ok(())
}

/// Stage one target: fetch it from the repository, process its files,
/// and record the outcome. Skipped when already done for this revision.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn stage_target(
    target: &Target,
    global: &Global,
    ignore: &[Regex],
    repo_vers: u32,
    format_file: Option<&Path>,
    dest_root: &Path,
    group: &str,
    is_test: bool,
    report: &SharedReport,
) -> bool {
    let name = target.dest_name().to_string();
    let key = if is_test {
        EventKey::Test(&name)
    } else {
        EventKey::Target(&name)
    };

    if report.lock().state(key).done {
        return true;
    }

    let msg = format!("{} '{}'", group, target.name);
    let repo_base = format!("{}/{}", global.repo_url, global.repo_branch);
    let src_url = format!("{}/{}", repo_base, target.name);
    let dest = dest_root.join(target.dest_name());

    info!("{}. Starting copy", msg);
    report.lock().begin(key);

    let job = FileJob {
        global,
        ignore,
        repo_base: &repo_base,
        repo_vers,
        file_doc_url: &target.url,
        with_legal: target.legal,
        format_file: if target.format { format_file } else { None },
    };

    let mut flags = StageFlags::default();
    let outcome = if repo::is_dir(&src_url, repo_vers, &global.repo_user, &global.repo_pass).await
    {
        copy_repo_dir(&job, &target.name, &dest, &mut flags).await
    } else {
        copy_repo_file(&job, &target.name, &dest, &mut flags).await
    };

    let ok = outcome.is_ok();
    let state = {
        let mut rep = report.lock();
        rep.finish(key, ok, outcome.err());
        if is_test {
            rep.test_set(&name, flags.legalized, flags.formatted, target.analyzer);
        } else {
            rep.target_set(&name, flags.legalized, flags.formatted, target.analyzer);
        }
        rep.state(key)
    };
    log_state(&state, &msg);
    ok
}

/// Write the revision marker file into the staged source tree.
pub(crate) async fn build_file(
    build: &str,
    repo_vers: u32,
    wpaths: &WorkPaths,
    report: &SharedReport,
) -> bool {
    if build.is_empty() {
        return true;
    }

    if report.lock().state(EventKey::BuildFile).done {
        return true;
    }

    let msg = format!("'{}'", build);
    let pathname = wpaths.tmp_src.join(build);
    info!("{}. Starting copy", msg);
    report.lock().begin(EventKey::BuildFile);

    let mut ok = true;
    if let Some(parent) = pathname.parent() {
        ok = tokio::fs::create_dir_all(parent).await.is_ok();
    }
    if ok {
        ok = tokio::fs::write(&pathname, format!("{}\n", repo_vers))
            .await
            .is_ok();
    }

    let error_msg = if ok {
        None
    } else {
        let msg = format!("Creating '{}'", pathname.display());
        error!("{}", msg);
        Some(msg)
    };

    let state = {
        let mut rep = report.lock();
        rep.finish(EventKey::BuildFile, ok, error_msg);
        rep.state(EventKey::BuildFile)
    };
    log_state(&state, &msg);
    ok
}

/// Compress a staged tree and move the tarball to the drive.
pub(crate) async fn tar_upload(
    drive: &Login,
    wpaths: &WorkPaths,
    srcdir: &Path,
    tarname: &str,
    key: EventKey<'_>,
    report: &SharedReport,
) -> bool {
    if report.lock().state(key).done {
        return true;
    }

    let msg = format!("'{}'", tarname);
    let tarpath = wpaths.tmp_path.join(tarname);
    info!("{}. Starting compressing.", msg);
    report.lock().begin(key);

    let mut error_msg = None;
    let mut ok = cmake::tar(
        None,
        &srcdir.to_string_lossy(),
        &tarpath.to_string_lossy(),
    )
    .await;

    if ok {
        ok = ssh::copy(
            None,
            &wpaths.tmp_path.to_string_lossy(),
            tarname,
            Some(drive),
            &wpaths.drive_path,
            tarname,
        )
        .await;
        if !ok {
            error_msg = Some(format!("Error moving '{}' to drive", tarpath.display()));
        }
    } else {
        error_msg = Some(format!("Error generating '{}'", tarpath.display()));
    }

    let state = {
        let mut rep = report.lock();
        rep.finish(key, ok, error_msg);
        rep.state(key)
    };
    log_state(&state, &msg);
    ok
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
