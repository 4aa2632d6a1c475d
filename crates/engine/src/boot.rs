// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host lifecycle: waking virtualised and volume-booted runners.

use nb_core::{host_index, Host, HostKind, Login, MacosVersion, Platform};
use nb_remote::ssh;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// Ping-poll deadline while a host comes up.
const BOOT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Ping-poll interval.
const PING_INTERVAL: Duration = Duration::from_millis(500);

/// Windows runners answer pings before their services are up.
const WINDOWS_GRACE: Duration = Duration::from_secs(15);

/// Virtual machine flavours started from a parent host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmKind {
    Vbox,
    Utm,
    Vmware,
}

impl VmKind {
    fn prefix(self) -> &'static str {
        match self {
            VmKind::Vbox => "VBOX",
            VmKind::Utm => "UTM",
            VmKind::Vmware => "VMWARE",
        }
    }

    fn tool(self) -> &'static str {
        match self {
            VmKind::Vbox => "VBOXMANAGE",
            VmKind::Utm => "UTMCTL",
            VmKind::Vmware => "VMRUN",
        }
    }
}

/// Outcome of a boot attempt. Only virtualised hosts that this
/// coordinator actually woke up are ever shut down again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootState {
    #[default]
    NotInit,
    /// The host answered pings before anything was attempted.
    AlreadyRunning,
    /// Metal host that is down, or no alive sibling volume / parent.
    Unreachable,
    /// VM started and came up.
    WakeUp(VmKind),
    /// VM started but never answered pings.
    Timeout(VmKind),
    /// Parent host does not answer pings.
    ParentDown(VmKind),
    /// Parent answers pings but SSH fails.
    ParentSsh(VmKind),
    /// Parent SSH works but the VM tool is missing or failed.
    ParentTool(VmKind),
    MacosWakeUp,
    MacosTimeout,
    MacosUnknownVersion,
    MacosNotBootable,
    MacosCantBootFromVolume,
}

impl std::fmt::Display for BootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootState::NotInit => write!(f, "NOT_INITIALIZED"),
            BootState::AlreadyRunning => write!(f, "ALREADY_RUNNING"),
            BootState::Unreachable => write!(f, "UNREACHABLE"),
            BootState::WakeUp(kind) => write!(f, "{}_WAKE_UP", kind.prefix()),
            BootState::Timeout(kind) => write!(f, "{}_TIMEOUT", kind.prefix()),
            BootState::ParentDown(kind) => write!(f, "{}_HOST_DOWN", kind.prefix()),
            BootState::ParentSsh(kind) => write!(f, "{}_HOST_SSH", kind.prefix()),
            BootState::ParentTool(kind) => write!(f, "{}_HOST_{}", kind.prefix(), kind.tool()),
            BootState::MacosWakeUp => write!(f, "MACOS_WAKE_UP"),
            BootState::MacosTimeout => write!(f, "MACOS_TIMEOUT"),
            BootState::MacosUnknownVersion => write!(f, "MACOS_UNKNOWN_VERSION"),
            BootState::MacosNotBootable => write!(f, "MACOS_NOT_BOOTABLE"),
            BootState::MacosCantBootFromVolume => write!(f, "MACOS_CANT_BOOT_FROM_VOLUME"),
        }
    }
}

/// Only hosts this coordinator woke (or tried to wake) are shut down.
/// Hosts that were already running, macOS volume boots, and every
/// failure state are left alone.
pub fn shutdownable(state: BootState) -> bool {
    matches!(state, BootState::WakeUp(_) | BootState::Timeout(_))
}

async fn ping_with_timeout(login: &Login, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if ssh::ping(&login.ip).await {
            if login.platform == Platform::Windows {
                tokio::time::sleep(WINDOWS_GRACE).await;
            }
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(PING_INTERVAL).await;
    }
}

/// Classify why a VM start failed on its parent host.
async fn parent_failure(plogin: &Login, kind: VmKind) -> BootState {
    if !ssh::ping(&plogin.ip).await {
        return BootState::ParentDown(kind);
    }
    if !ssh::exec_ok(Some(plogin), "echo up").await {
        return BootState::ParentSsh(kind);
    }
    BootState::ParentTool(kind)
}

fn parent<'a>(hosts: &'a [Host], host: &Host, name: &str) -> Option<&'a Host> {
    match host_index(hosts, name) {
        Some(i) => Some(&hosts[i]),
        None => {
            error!(
                "Host '{}' referenced by '{}' doesn't exist in network",
                name, host.name
            );
            None
        }
    }
}

async fn boot_vm(
    host: &Host,
    hosts: &[Host],
    kind: VmKind,
    parent_name: &str,
) -> (bool, BootState) {
    let Some(phost) = parent(hosts, host, parent_name) else {
        return (false, BootState::Unreachable);
    };
    let login = &host.login;
    let plogin = &phost.login;
    info!(
        "Booting '{}'-'{}' from '{}'-'{}'",
        host.name, login.ip, phost.name, plogin.ip
    );

    let started = match kind {
        VmKind::Vbox => ssh::vbox_start(plogin, &host.vbox_uuid).await,
        VmKind::Utm => utm_start(plogin, &host.utm_uuid).await,
        VmKind::Vmware => vmware_start(plogin, &host.vmware_path).await,
    };

    if !started {
        return (false, parent_failure(plogin, kind).await);
    }

    if ping_with_timeout(login, BOOT_TIMEOUT).await {
        (true, BootState::WakeUp(kind))
    } else {
        (false, BootState::Timeout(kind))
    }
}

/// One-shot launchd job that fires `utmctl start <uuid>` after a second.
/// UTM does not accept `utmctl` calls over a plain SSH session, so the
/// start goes through launchd on the parent.
pub fn utm_launchd_plist(utm_uuid: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>com.example.onetimejob</string>

    <key>ProgramArguments</key>
    <array>
        <string>/Applications/UTM.app/Contents/MacOS/utmctl</string>
        <string>start</string>
        <string>{utm_uuid}</string>
    </array>

    <key>StartInterval</key>
    <integer>1</integer>

    <key>RunAtLoad</key>
    <true/>

    <key>AbandonProcessGroup</key>
    <true/>
</dict>
</plist>
"#
    )
}

async fn utm_start(plogin: &Login, utm_uuid: &str) -> bool {
    if plogin.platform != Platform::Macos {
        error!("UTM virtual machines ONLY supported in macOS hosts");
        return false;
    }

    let script_path = "/tmp";
    let script_name = "utm_launch.plist";
    let plist = utm_launchd_plist(utm_uuid);
    if !ssh::to_file(Some(plogin), script_path, script_name, plist.as_bytes()).await {
        error!("Error copying '{}' into '{}'", script_name, plogin.ip);
        return false;
    }

    // Load the one-shot job, give it a moment to fire, then unload it
    // so the machine is not launched twice.
    let pathname = format!("{}/{}", script_path, script_name);
    ssh::launchd_load(plogin, &pathname).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    ssh::launchd_unload(plogin, &pathname).await;
    true
}

async fn vmware_start(plogin: &Login, vmware_path: &str) -> bool {
    if plogin.platform != Platform::Macos {
        error!("VMware virtual machines ONLY supported in macOS hosts");
        return false;
    }
    ssh::vmware_start(plogin, vmware_path).await
}

/// Resolve the `diskN` device holding a volume from `diskutil list`
/// output. Apple can wrap volume names in U+2068/U+2069 bidirectional
/// isolates, and the device identifier sits three tokens after the
/// volume name.
pub fn disk_from_volume(listing: &str, volume: &str) -> Option<String> {
    let alias1 = format!("/Volumes/{}", volume);
    let alias2 = format!("\u{2068}{}\u{2069}", volume);
    let alias3 = format!("\u{2068}/Volumes/{}\u{2069}", volume);

    let mut found_volume = false;
    let mut pos_disk = 0;
    for token in listing.split_whitespace() {
        if found_volume {
            pos_disk += 1;
            if token.starts_with("disk") {
                if pos_disk == 3 {
                    return Some(token.to_string());
                }
                found_volume = false;
                pos_disk = 0;
            }
        } else if token == volume || token == alias1 || token == alias2 || token == alias3 {
            found_volume = true;
        }
    }
    None
}

/// Some booted macOS volume on the same physical Mac.
async fn macos_alive<'a>(hosts: &'a [Host], macos_host: &str) -> Option<&'a Host> {
    for host in hosts {
        if host.kind == HostKind::Macos
            && host.macos_host == macos_host
            && ssh::ping(&host.login.ip).await
        {
            return Some(host);
        }
    }
    None
}

/// Reboot a Mac into another boot volume connected to the same machine.
async fn boot_from_bless(from_host: &Host, to_host: &Host) -> (bool, BootState) {
    let from_login = &from_host.login;
    let to_login = &to_host.login;
    let volume = &to_host.macos_volume;
    let volume_path = format!("/Volumes/{}", volume);

    info!(
        "Booting '{}'-'{}' from '{}'-'{}'",
        to_host.name, to_login.ip, from_host.name, from_login.ip
    );

    let mut ok = true;
    let mut disk = None;

    if ok {
        disk = match ssh::diskutil_list(from_login).await {
            Some(listing) => disk_from_volume(&listing, volume),
            None => None,
        };
        if disk.is_none() {
            error!("macOS disk from volume");
            ok = false;
        }
    }

    // External boot volumes are mounted by graphical sessions but not
    // by SSH sessions; mount explicitly.
    if ok {
        if let Some(disk) = &disk {
            let device_path = format!("/dev/{}", disk);
            ok = ssh::mount(from_login, &device_path).await;
            if !ok {
                error!("macOS mount");
            }
        }
    }

    if ok {
        ok = ssh::bless(from_login, &volume_path).await;
        if !ok {
            error!("macOS bless");
        }
    }

    if ok {
        ok = ssh::reboot(from_login).await;
        if !ok {
            error!("macOS reboot");
        }
    }

    if !ok {
        return (false, BootState::MacosCantBootFromVolume);
    }

    // iMacs can take a couple of minutes to come back.
    if ping_with_timeout(to_login, BOOT_TIMEOUT).await {
        (true, BootState::MacosWakeUp)
    } else {
        (false, BootState::MacosTimeout)
    }
}

async fn boot_macos(host: &Host, hosts: &[Host]) -> (bool, BootState) {
    let Some(alive) = macos_alive(hosts, &host.macos_host).await else {
        return (false, BootState::Unreachable);
    };

    let (Some(alive_os), Some(host_os)) = (alive.macos_version(), host.macos_version()) else {
        return (false, BootState::MacosUnknownVersion);
    };

    if !MacosVersion::can_boot_direct(alive_os, host_os) {
        // TODO: try to restore to the Mac's default volume first
        return (false, BootState::MacosNotBootable);
    }

    boot_from_bless(alive, host).await
}

/// Wake a runner host. Returns whether the host is usable plus the
/// state the shutdown decision is made from.
pub async fn boot(host: &Host, hosts: &[Host]) -> (bool, BootState) {
    if ssh::ping(&host.login.ip).await {
        return (true, BootState::AlreadyRunning);
    }

    match host.kind {
        // A powered-off metal host cannot be woken remotely
        HostKind::Metal => (false, BootState::Unreachable),
        HostKind::Vbox => boot_vm(host, hosts, VmKind::Vbox, &host.vbox_host).await,
        HostKind::Utm => boot_vm(host, hosts, VmKind::Utm, &host.utm_host).await,
        HostKind::Vmware => boot_vm(host, hosts, VmKind::Vmware, &host.vmware_host).await,
        HostKind::Macos => boot_macos(host, hosts).await,
    }
}

/// Shut the host down when this coordinator booted it.
pub async fn shutdown(host: &Host, state: BootState) -> bool {
    if !shutdownable(state) {
        return false;
    }
    ssh::shutdown(&host.login).await
}

#[cfg(test)]
#[path = "boot_tests.rs"]
mod tests;
