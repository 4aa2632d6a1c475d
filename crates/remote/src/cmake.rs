// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-tool drivers: configure, build, install, tar.

use crate::exec::CmdOutput;
use crate::ssh::{self, local_platform};
use nb_core::{Login, Platform, Vers};

fn endpoint_platform(login: Option<&Login>) -> Platform {
    login.map_or_else(local_platform, |l| l.platform)
}

/// Quote for the generator name: escaped when the command travels from a
/// Windows coordinator through an SSH double-quoted wrapper.
fn generator_quote(login: Option<&Login>) -> &'static str {
    let remote = login.map_or(false, |l| !l.localhost);
    if local_platform() == Platform::Windows && remote {
        "\\\""
    } else {
        "\""
    }
}

/// `cd <dir>` prologue joined with the platform statement separator.
fn with_cd(platform: Platform, dir: &str, cmd: &str) -> String {
    format!("cd {}{}{}", dir, platform.cmd_sep(), cmd)
}

fn with_envvars(platform: Platform, envvars: &str, cmd: &str) -> String {
    if envvars.is_empty() {
        cmd.to_string()
    } else {
        format!("{}{}{}", envvars, platform.cmd_sep(), cmd)
    }
}

async fn exec_logged(login: Option<&Login>, cmd: &str) -> (i32, String) {
    let out = ssh::exec(login, cmd).await;
    (out.code, out.logged(cmd))
}

/// Probe the remote build tool's version.
pub async fn version(login: Option<&Login>) -> Option<Vers> {
    let out: CmdOutput = ssh::exec(login, "cmake --version").await;
    if !out.ok() {
        return None;
    }
    Vers::parse(&out.stdout_text())
}

/// Compose the configure command line.
pub fn configure_cmd(
    login: Option<&Login>,
    envvars: &str,
    src_path: &str,
    build_path: &str,
    generator: &str,
    opts: &str,
) -> String {
    let platform = endpoint_platform(login);
    let q = generator_quote(login);
    let cmake = format!("cmake -G {q}{generator}{q} {opts} {src_path}");
    with_envvars(platform, envvars, &with_cd(platform, build_path, &cmake))
}

/// Run configure; returns the exit code and the captured log.
pub async fn configure(
    login: Option<&Login>,
    envvars: &str,
    src_path: &str,
    build_path: &str,
    generator: &str,
    opts: &str,
) -> (i32, String) {
    let cmd = configure_cmd(login, envvars, src_path, build_path, generator, opts);
    exec_logged(login, &cmd).await
}

pub fn build_cmd(login: Option<&Login>, envvars: &str, build_path: &str, opts: &str) -> String {
    let platform = endpoint_platform(login);
    with_envvars(
        platform,
        envvars,
        &format!("cmake --build {} {}", build_path, opts),
    )
}

pub async fn build(
    login: Option<&Login>,
    envvars: &str,
    build_path: &str,
    opts: &str,
) -> (i32, String) {
    let cmd = build_cmd(login, envvars, build_path, opts);
    exec_logged(login, &cmd).await
}

pub async fn install(login: Option<&Login>, build_path: &str, opts: &str) -> (i32, String) {
    let cmd = format!("cmake --install {} {}", build_path, opts);
    exec_logged(login, &cmd).await
}

/// Install through the generator's native make program (pre-3.15 tools).
pub async fn install_with(
    login: Option<&Login>,
    build_path: &str,
    install_cmd: &str,
) -> (i32, String) {
    let cmd = with_cd(endpoint_platform(login), build_path, install_cmd);
    exec_logged(login, &cmd).await
}

/// Pack a directory's contents into a gzip tarball via `cmake -E tar`.
pub async fn tar(login: Option<&Login>, src_path: &str, tarpath: &str) -> bool {
    let platform = endpoint_platform(login);
    let cmd = with_cd(platform, src_path, &format!("cmake -E tar cvzf {} .", tarpath));
    ssh::exec_ok(login, &cmd).await
}

/// Unpack a gzip tarball into a directory.
pub async fn untar(login: Option<&Login>, dest_path: &str, tarpath: &str) -> bool {
    let platform = endpoint_platform(login);
    let cmd = with_cd(platform, dest_path, &format!("cmake -E tar xvzf {}", tarpath));
    ssh::exec_ok(login, &cmd).await
}

/// Run a test executable; returns the exit code and its combined log.
pub async fn run_test(login: Option<&Login>, test_cmd: &str) -> (i32, String) {
    let out = ssh::exec(login, test_cmd).await;
    (out.code, out.logged(test_cmd))
}

#[cfg(test)]
#[path = "cmake_tests.rs"]
mod tests;
