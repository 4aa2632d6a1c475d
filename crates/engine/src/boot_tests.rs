// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    vbox_wake = { BootState::WakeUp(VmKind::Vbox), "VBOX_WAKE_UP" },
    vbox_timeout = { BootState::Timeout(VmKind::Vbox), "VBOX_TIMEOUT" },
    vbox_down = { BootState::ParentDown(VmKind::Vbox), "VBOX_HOST_DOWN" },
    vbox_ssh = { BootState::ParentSsh(VmKind::Vbox), "VBOX_HOST_SSH" },
    vbox_tool = { BootState::ParentTool(VmKind::Vbox), "VBOX_HOST_VBOXMANAGE" },
    utm_tool = { BootState::ParentTool(VmKind::Utm), "UTM_HOST_UTMCTL" },
    vmware_tool = { BootState::ParentTool(VmKind::Vmware), "VMWARE_HOST_VMRUN" },
    macos_wake = { BootState::MacosWakeUp, "MACOS_WAKE_UP" },
    macos_vol = { BootState::MacosCantBootFromVolume, "MACOS_CANT_BOOT_FROM_VOLUME" },
    already = { BootState::AlreadyRunning, "ALREADY_RUNNING" },
    unreachable = { BootState::Unreachable, "UNREACHABLE" },
)]
fn state_names(state: BootState, expected: &str) {
    assert_eq!(state.to_string(), expected);
}

#[test]
fn only_woken_vms_are_shutdownable() {
    assert!(shutdownable(BootState::WakeUp(VmKind::Vbox)));
    assert!(shutdownable(BootState::Timeout(VmKind::Utm)));
    assert!(shutdownable(BootState::WakeUp(VmKind::Vmware)));

    assert!(!shutdownable(BootState::AlreadyRunning));
    assert!(!shutdownable(BootState::NotInit));
    assert!(!shutdownable(BootState::Unreachable));
    assert!(!shutdownable(BootState::ParentTool(VmKind::Vbox)));
    // macOS volume boots are never shut down
    assert!(!shutdownable(BootState::MacosWakeUp));
    assert!(!shutdownable(BootState::MacosTimeout));
}

#[test]
fn utm_plist_carries_the_vm_uuid() {
    let plist = utm_launchd_plist("8a4f2b2e-1111-2222-3333-444455556666");
    assert!(plist.contains("<string>utmctl</string>") || plist.contains("MacOS/utmctl"));
    assert!(plist.contains("<string>start</string>"));
    assert!(plist.contains("<string>8a4f2b2e-1111-2222-3333-444455556666</string>"));
    assert!(plist.contains("<key>RunAtLoad</key>"));
}

#[test]
fn disk_resolution_plain_volume() {
    let listing = "\
/dev/disk2 (external, physical):
   #:                       TYPE NAME                    SIZE       IDENTIFIER
   0:      GUID_partition_scheme                        *500.1 GB   disk2
   1:                        EFI EFI                     209.7 MB   disk2s1
   2:                  Apple_HFS Mojave                  499.8 GB   disk2s2
";
    // After the volume token: size (2 tokens) then the identifier
    assert_eq!(
        disk_from_volume(listing, "Mojave").as_deref(),
        Some("disk2s2")
    );
}

#[test]
fn disk_resolution_with_bidi_isolates() {
    let listing = "   2:                 Apple_APFS \u{2068}Sonoma\u{2069}        499.8 GB   disk3s2\n";
    assert_eq!(
        disk_from_volume(listing, "Sonoma").as_deref(),
        Some("disk3s2")
    );
}

#[test]
fn disk_resolution_missing_volume() {
    assert_eq!(disk_from_volume("no volumes here", "Mojave"), None);
}

#[test]
fn disk_resolution_ignores_wrong_position() {
    // A "disk" token directly after the name is not the identifier
    let listing = "Mojave disk9 extra tokens disk2s2 more";
    assert_eq!(disk_from_volume(listing, "Mojave"), None);
}
