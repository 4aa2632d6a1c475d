// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{host, job, linux_login};

fn network(hosts: Vec<Host>) -> Network {
    Network {
        drive: Drive {
            name: "store".to_string(),
            path: "/data/ci".to_string(),
            login: linux_login("10.0.0.10"),
        },
        hosts,
    }
}

#[test]
fn parse_network_file() {
    let json = r#"{
        "drive": {
            "name": "store",
            "path": "/data/ci",
            "login": {"ip": "10.0.0.10", "user": "ci", "pass": "s", "platform": "linux"}
        },
        "hosts": [{
            "name": "ubuntu",
            "workpath": "/home/ci/build",
            "type": "metal",
            "login": {"ip": "10.0.0.11", "user": "ci", "pass": "s", "platform": "linux", "use_sshpass": true},
            "generators": ["Unix Makefiles"],
            "tags": ["x64", "ubuntu"]
        }]
    }"#;

    let net: Network = serde_json::from_str(json).unwrap();
    assert_eq!(net.hosts.len(), 1);
    assert_eq!(net.hosts[0].kind, HostKind::Metal);
    assert!(net.hosts[0].login.use_sshpass);
    assert!(net.validate().is_ok());
}

#[test]
fn unknown_host_type_is_rejected() {
    let json = r#"{
        "name": "h", "type": "qemu",
        "login": {"ip": "1.2.3.4", "user": "u", "pass": "p", "platform": "linux"}
    }"#;
    assert!(serde_json::from_str::<Host>(json).is_err());
}

#[test]
fn duplicate_host_names_are_fatal() {
    let net = network(vec![
        host("ubuntu", &["Unix Makefiles"], &["x64"]),
        host("ubuntu", &["Ninja"], &["x86"]),
    ]);
    assert!(matches!(
        net.validate(),
        Err(NetworkError::DuplicateHost(name)) if name == "ubuntu"
    ));
}

#[test]
fn non_linux_drive_is_fatal() {
    let mut net = network(vec![]);
    net.drive.login.platform = Platform::Windows;
    assert!(matches!(net.validate(), Err(NetworkError::DriveNotLinux)));
}

#[test]
fn match_requires_generator_and_all_tags() {
    let hosts = vec![
        host("win", &["Visual Studio 17 2022"], &["x64", "msvc2022"]),
        host("ubuntu", &["Unix Makefiles", "Ninja"], &["x64", "ubuntu"]),
    ];

    let j = job("debug", 1, "Unix Makefiles", &["x64", "ubuntu"]);
    assert_eq!(match_job(&hosts, &j), Some(1));

    let j = job("debug", 1, "Unix Makefiles", &["x64", "arm64"]);
    assert_eq!(match_job(&hosts, &j), None);

    let j = job("debug", 1, "Xcode", &[]);
    assert_eq!(match_job(&hosts, &j), None);
}

#[test]
fn first_declared_match_wins() {
    let hosts = vec![
        host("a", &["Ninja"], &["x64"]),
        host("b", &["Ninja"], &["x64"]),
    ];
    let j = job("fast", 1, "Ninja", &["x64"]);
    assert_eq!(match_job(&hosts, &j), Some(0));
}

#[test]
fn host_lookup_by_name() {
    let hosts = vec![host("a", &[], &[]), host("b", &[], &[])];
    assert_eq!(host_index(&hosts, "b"), Some(1));
    assert_eq!(host_index(&hosts, "c"), None);
}
