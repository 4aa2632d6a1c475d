// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn login(ip: &str, platform: Platform) -> Login {
    Login {
        ip: ip.to_string(),
        user: "ci".to_string(),
        pass: "secret".to_string(),
        platform,
        localhost: false,
        use_sshpass: false,
    }
}

#[test]
fn localhost_by_name() {
    let mut l = login("localhost", Platform::Linux);
    l.refresh_localhost(&[]);
    assert!(l.localhost);
}

#[test]
fn localhost_by_address_match() {
    let mut l = login("192.168.1.10", Platform::Linux);
    l.refresh_localhost(&["192.168.1.10".parse().unwrap()]);
    assert!(l.localhost);
}

#[test]
fn remote_address_is_not_localhost() {
    let mut l = login("192.168.1.10", Platform::Linux);
    l.localhost = true;
    l.refresh_localhost(&["192.168.1.20".parse().unwrap()]);
    assert!(!l.localhost);
}

#[test]
fn unparseable_address_is_not_localhost() {
    let mut l = login("runner.example", Platform::Linux);
    l.refresh_localhost(&["192.168.1.20".parse().unwrap()]);
    assert!(!l.localhost);
}

#[test]
fn platform_paths_and_separators() {
    assert_eq!(Platform::Windows.path("c:/work/src"), "c:\\work\\src");
    assert_eq!(Platform::Linux.path("c:\\work\\src"), "c:/work/src");
    assert_eq!(Platform::Windows.cmd_sep(), "&");
    assert_eq!(Platform::Macos.cmd_sep(), ";");
    assert_eq!(Platform::Windows.quote(), '"');
    assert_eq!(Platform::Linux.quote(), '\'');
}

#[test]
fn platform_serde_is_lowercase() {
    let json = serde_json::to_string(&Platform::Macos).unwrap();
    assert_eq!(json, "\"macos\"");
    let back: Platform = serde_json::from_str("\"windows\"").unwrap();
    assert_eq!(back, Platform::Windows);
    assert!(serde_json::from_str::<Platform>("\"beos\"").is_err());
}
