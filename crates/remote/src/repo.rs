// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository client (Subversion over the coordinator shell).

use crate::exec::run_shell;

fn auth(user: &str, pass: &str) -> String {
    format!(
        "--non-interactive --no-auth-cache --username {} --password {}",
        user, pass
    )
}

/// Last-changed revision of a repository URL, `None` when unresolvable.
pub async fn version(repo_url: &str, user: &str, pass: &str) -> Option<u32> {
    let cmd = format!(
        "svn info --show-item last-changed-revision {} {} -r HEAD",
        auth(user, pass),
        repo_url
    );
    let out = run_shell(&cmd).await;
    let text = out.stdout_text();
    let vers: u32 = text.lines().next()?.trim().parse().ok()?;
    if vers == 0 {
        return None;
    }
    Some(vers)
}

/// Entries of a repository directory at a revision. Directories end in
/// `/`, as listed by the client.
pub async fn list(repo_url: &str, repo_vers: u32, user: &str, pass: &str) -> Option<Vec<String>> {
    let cmd = format!(
        "svn list {} {} -r {}",
        auth(user, pass),
        repo_url,
        repo_vers
    );
    let out = run_shell(&cmd).await;
    if !out.ok() {
        return None;
    }
    Some(
        out.stdout_text()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().to_string())
            .collect(),
    )
}

/// Raw bytes of a repository file at a revision.
pub async fn cat(repo_url: &str, repo_vers: u32, user: &str, pass: &str) -> Option<Vec<u8>> {
    let cmd = format!("svn cat {} {} -r {}", auth(user, pass), repo_url, repo_vers);
    let out = run_shell(&cmd).await;
    if !out.ok() {
        return None;
    }
    Some(out.stdout)
}

/// Extract the `Node Kind` value from an `svn info` listing.
pub fn parse_node_kind(info: &str) -> Option<String> {
    for line in info.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("node kind") {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Whether the repository URL names a directory at a revision.
pub async fn is_dir(repo_url: &str, repo_vers: u32, user: &str, pass: &str) -> bool {
    let cmd = format!("svn info {} {} -r {}", auth(user, pass), repo_url, repo_vers);
    let out = run_shell(&cmd).await;
    match parse_node_kind(&out.stdout_text()) {
        Some(kind) => kind.eq_ignore_ascii_case("directory"),
        None => false,
    }
}

/// Check out a repository URL at a revision into a local directory.
pub async fn checkout(repo_url: &str, user: &str, pass: &str, repo_vers: u32, dest: &str) -> bool {
    let cmd = format!(
        "svn checkout {} {} {} -r {}",
        auth(user, pass),
        repo_url,
        dest,
        repo_vers
    );
    run_shell(&cmd).await.ok()
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
