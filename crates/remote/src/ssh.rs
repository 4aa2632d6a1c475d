// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH/SCP command composition and remote file operations.

use crate::exec::{run_shell, CmdOutput};
use nb_core::{Login, Platform};
use std::path::Path;
use tracing::warn;

/// Platform of the coordinator process itself.
pub fn local_platform() -> Platform {
    if cfg!(windows) {
        Platform::Windows
    } else if cfg!(target_os = "macos") {
        Platform::Macos
    } else {
        Platform::Linux
    }
}

fn is_local(login: Option<&Login>) -> bool {
    login.map_or(true, |l| l.localhost)
}

fn endpoint_platform(login: Option<&Login>) -> Platform {
    login.map_or_else(local_platform, |l| l.platform)
}

/// Wrap a command for execution on `login`. Local logins shell out
/// directly. Quoting follows the target platform: double quotes for
/// Windows runners, single quotes for POSIX ones. Windows coordinators
/// rely on key auth; POSIX coordinators use `sshpass` when the login
/// asks for it.
pub fn compose(login: &Login, cmd: &str) -> String {
    if login.localhost {
        return cmd.to_string();
    }

    let q = login.platform.quote();
    if local_platform() == Platform::Windows {
        format!("ssh {}@{} {q}{cmd}{q}", login.user, login.ip)
    } else if login.use_sshpass {
        format!(
            "sshpass -p '{}' ssh {}@{} {q}{cmd}{q}",
            login.pass, login.user, login.ip
        )
    } else {
        format!("ssh {}@{} {q}{cmd}{q}", login.user, login.ip)
    }
}

fn compose_opt(login: Option<&Login>, cmd: &str) -> String {
    match login {
        Some(l) => compose(l, cmd),
        None => cmd.to_string(),
    }
}

/// Run a command on `login` (or locally when `None`).
pub async fn exec(login: Option<&Login>, cmd: &str) -> CmdOutput {
    run_shell(&compose_opt(login, cmd)).await
}

/// Run a command and report only success.
pub async fn exec_ok(login: Option<&Login>, cmd: &str) -> bool {
    exec(login, cmd).await.ok()
}

async fn exec_ret(login: Option<&Login>, cmd: &str, expected: i32) -> bool {
    exec(login, cmd).await.code == expected
}

/// Single ICMP echo with the platform-correct count flag.
pub async fn ping(ip: &str) -> bool {
    let cmd = if local_platform() == Platform::Windows {
        format!("ping {} -n 1", ip)
    } else {
        format!("ping {} -c 1", ip)
    };
    run_shell(&cmd).await.ok()
}

fn exists_probe(platform: Platform, path: &str, is_dir: bool) -> String {
    if platform.is_posix() {
        let flag = if is_dir { "-d" } else { "-f" };
        format!("[ ! {} {} ] && echo NOT_EXISTS", flag, path)
    } else {
        format!(
            "IF EXIST {} (echo Yes) ELSE (echo NOT_EXISTS)",
            path.replace('/', "\\")
        )
    }
}

async fn exists(login: &Login, path: &str, is_dir: bool) -> bool {
    let cmd = exists_probe(login.platform, path, is_dir);
    let out = exec(Some(login), &cmd).await;
    !out.stdout_text().contains("NOT_EXISTS")
}

pub async fn dir_exists(login: &Login, path: &str) -> bool {
    exists(login, path, true).await
}

pub async fn file_exists(login: &Login, path: &str, filename: &str) -> bool {
    let full = login.platform.path(&format!("{}/{}", path, filename));
    exists(login, &full, false).await
}

/// Create a directory (and missing parents) on the target.
pub async fn create_dir(login: &Login, dir: &str) -> bool {
    if login.platform.is_posix() {
        return exec_ok(Some(login), &format!("mkdir -p {}", dir)).await;
    }

    // Windows `mkdir` has no `-p`; create missing parents one by one.
    if dir_exists(login, dir).await {
        return true;
    }
    let normalized = dir.replace('/', "\\");
    let parts: Vec<&str> = normalized.split('\\').collect();
    let mut ok = true;
    for i in 1..=parts.len() {
        let prefix = parts[..i].join("\\");
        if prefix.is_empty() || prefix.ends_with(':') {
            continue;
        }
        if !dir_exists(login, &prefix).await {
            ok = exec(Some(login), &format!("mkdir {}", prefix)).await.ok() && ok;
        }
    }
    ok
}

pub async fn delete_file(login: &Login, path: &str) -> bool {
    let cmd = if login.platform.is_posix() {
        format!("rm {}", path)
    } else {
        format!("del {}", path.replace('/', "\\"))
    };
    exec_ok(Some(login), &cmd).await
}

pub async fn delete_dir(login: &Login, path: &str) -> bool {
    let cmd = if login.platform.is_posix() {
        format!("rm -rf {}", path)
    } else {
        format!("rd /s /q {}", path.replace('/', "\\"))
    };
    exec_ok(Some(login), &cmd).await
}

/// Read a remote file. `None` when the command failed.
pub async fn file_cat(login: &Login, path: &str, filename: &str) -> Option<Vec<u8>> {
    let cmd = if login.platform.is_posix() {
        format!("cat {}/{}", path, filename)
    } else {
        login.platform.path(&format!("type {}/{}", path, filename))
    };
    let out = exec(Some(login), &cmd).await;
    if out.ok() {
        Some(out.stdout)
    } else {
        None
    }
}

/// Serialise an in-memory byte sequence to a file on `login`. Remote
/// destinations are written locally first and SCP'd across.
pub async fn to_file(login: Option<&Login>, path: &str, filename: &str, data: &[u8]) -> bool {
    if is_local(login) {
        let dest = Path::new(path).join(filename);
        return tokio::fs::write(&dest, data).await.is_ok();
    }

    let tmp = std::env::temp_dir().join(filename);
    if tokio::fs::write(&tmp, data).await.is_err() {
        return false;
    }
    let dest = endpoint_platform(login).path(&format!("{}/{}", path, filename));
    let ok = scp(None, &tmp.to_string_lossy(), login, &dest, false).await;
    let _ = tokio::fs::remove_file(&tmp).await;
    ok
}

fn login_equal(a: Option<&Login>, b: Option<&Login>) -> bool {
    if is_local(a) && is_local(b) {
        return true;
    }
    match (a, b) {
        (Some(a), Some(b)) => a.ip == b.ip,
        _ => false,
    }
}

/// SCP operand; separators are POSIX-normalised regardless of the
/// endpoint platform.
pub fn scp_operand(login: Option<&Login>, path: &str) -> String {
    let posix = path.replace('\\', "/");
    match login {
        Some(l) if !l.localhost => format!("{}@{}:{}", l.user, l.ip, posix),
        _ => posix,
    }
}

/// Raw SCP between two endpoints.
pub async fn scp(
    from: Option<&Login>,
    from_path: &str,
    to: Option<&Login>,
    to_path: &str,
    recursive: bool,
) -> bool {
    let scp = if recursive { "scp -r" } else { "scp" };
    let cmd = format!(
        "{} {} {}",
        scp,
        scp_operand(from, from_path),
        scp_operand(to, to_path)
    );
    run_shell(&cmd).await.ok()
}

/// Same-host copies degrade to a plain local copy command.
async fn copy_files(login: Option<&Login>, from: &str, to: &str) -> bool {
    let cmd = if endpoint_platform(login).is_posix() {
        format!("cp {} {}", from, to)
    } else {
        format!("copy {} {}", from, to)
    };
    exec_ok(login, &cmd).await
}

fn join_file(login: Option<&Login>, path: &str, filename: &str) -> String {
    endpoint_platform(login).path(&format!("{}/{}", path, filename))
}

/// Copy one file between any two nodes of the network.
pub async fn copy(
    from: Option<&Login>,
    from_path: &str,
    from_file: &str,
    to: Option<&Login>,
    to_path: &str,
    to_file: &str,
) -> bool {
    let from_full = join_file(from, from_path, from_file);
    let to_full = join_file(to, to_path, to_file);
    if login_equal(from, to) {
        copy_files(from, &from_full, &to_full).await
    } else {
        scp(from, &from_full, to, &to_full, false).await
    }
}

/// Recursive copy of a directory's contents.
pub async fn copy_dir(
    from: Option<&Login>,
    from_path: &str,
    to: Option<&Login>,
    to_path: &str,
) -> bool {
    let from_full = join_file(from, from_path, "*");
    scp(from, &from_full, to, to_path, true).await
}

/// Upload to a hosting endpoint, prefixing `sshpass` when the
/// destination relies on password auth.
pub async fn upload(from_path: &str, to: &Login, to_path: &str, recursive: bool) -> bool {
    let scp_cmd = if recursive { "scp -r" } else { "scp" };
    let from = scp_operand(None, from_path);
    let dest = scp_operand(Some(to), to_path);
    let cmd = if to.use_sshpass {
        format!("sshpass -p '{}' {} {} {}", to.pass, scp_cmd, from, dest)
    } else {
        format!("{} {} {}", scp_cmd, from, dest)
    };
    run_shell(&cmd).await.ok()
}

/// `vboxmanage` present on the parent host?
pub async fn vbox_check(login: &Login) -> bool {
    exec_ok(Some(login), "vboxmanage -version").await
}

pub async fn vbox_start(login: &Login, vbox_uuid: &str) -> bool {
    let cmd = format!("vboxmanage startvm {} --type headless", vbox_uuid);
    exec_ok(Some(login), &cmd).await
}

pub async fn vmware_start(login: &Login, vmware_path: &str) -> bool {
    let cmd = format!("vmrun start \"{}\"", vmware_path);
    exec_ok(Some(login), &cmd).await
}

/// `diskutil list` output from a macOS host.
pub async fn diskutil_list(login: &Login) -> Option<String> {
    if login.platform != Platform::Macos {
        return None;
    }
    let out = exec(Some(login), "/usr/sbin/diskutil list").await;
    if out.ok() {
        Some(out.stdout_text())
    } else {
        None
    }
}

pub async fn mount(login: &Login, device_path: &str) -> bool {
    if login.platform != Platform::Macos {
        return false;
    }
    let cmd = format!(
        "echo {} | sudo -S /usr/sbin/diskutil mountDisk {}",
        login.pass, device_path
    );
    exec_ok(Some(login), &cmd).await
}

pub async fn bless(login: &Login, volume_path: &str) -> bool {
    if login.platform != Platform::Macos {
        return false;
    }
    let cmd = format!(
        "echo {} | sudo -S /usr/sbin/bless --mount {} --setBoot --nextonly",
        login.pass, volume_path
    );
    exec_ok(Some(login), &cmd).await
}

pub async fn reboot(login: &Login) -> bool {
    if login.platform != Platform::Macos {
        return false;
    }
    // Remote reboot closes the connection; ssh reports 255 instead of 0.
    let cmd = format!("echo {} | sudo -S /sbin/reboot", login.pass);
    exec_ret(Some(login), &cmd, 255).await
}

/// Platform-appropriate shutdown command.
pub async fn shutdown(login: &Login) -> bool {
    let cmd = match login.platform {
        Platform::Linux | Platform::Macos => {
            format!("echo {} | sudo -S shutdown -h now", login.pass)
        }
        Platform::Windows => "shutdown -s -t 00 -f".to_string(),
    };
    exec_ok(Some(login), &cmd).await
}

pub async fn launchd_load(login: &Login, script_path: &str) -> bool {
    if login.platform != Platform::Macos {
        warn!("launchd scripts only exist on macOS hosts");
        return false;
    }
    exec_ok(Some(login), &format!("launchctl load {}", script_path)).await
}

pub async fn launchd_unload(login: &Login, script_path: &str) -> bool {
    if login.platform != Platform::Macos {
        return false;
    }
    exec_ok(Some(login), &format!("launchctl unload {}", script_path)).await
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
