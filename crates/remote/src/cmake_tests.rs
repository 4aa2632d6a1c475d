// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nb_core::test_support::linux_login;

#[test]
fn configure_cmd_posix() {
    let login = linux_login("10.0.0.11");
    let cmd = configure_cmd(
        Some(&login),
        "export CMAKE_BUILD_PARALLEL_LEVEL=4",
        "/home/ci/build/flow/debug/src",
        "/home/ci/build/flow/debug/build",
        "Unix Makefiles",
        "-DCMAKE_BUILD_TYPE=Debug ",
    );
    assert_eq!(
        cmd,
        "export CMAKE_BUILD_PARALLEL_LEVEL=4;cd /home/ci/build/flow/debug/build;\
         cmake -G \"Unix Makefiles\" -DCMAKE_BUILD_TYPE=Debug  /home/ci/build/flow/debug/src"
    );
}

#[test]
fn configure_cmd_windows_separator() {
    let mut login = linux_login("10.0.0.12");
    login.platform = Platform::Windows;
    let cmd = configure_cmd(
        Some(&login),
        "set CMAKE_BUILD_PARALLEL_LEVEL=4",
        "c:/work/src",
        "c:/work/build",
        "Visual Studio 17 2022",
        "-A x64 ",
    );
    assert!(cmd.starts_with("set CMAKE_BUILD_PARALLEL_LEVEL=4&cd c:/work/build&"));
    assert!(cmd.contains("cmake -G \"Visual Studio 17 2022\" -A x64  c:/work/src"));
}

#[test]
fn configure_cmd_without_envvars() {
    let login = linux_login("10.0.0.11");
    let cmd = configure_cmd(Some(&login), "", "/src", "/build", "Ninja", "");
    assert_eq!(cmd, "cd /build;cmake -G \"Ninja\"  /src");
}

#[test]
fn build_cmd_with_envvars() {
    let login = linux_login("10.0.0.11");
    let cmd = build_cmd(
        Some(&login),
        "export CMAKE_BUILD_PARALLEL_LEVEL=4",
        "/build",
        "--config Release",
    );
    assert_eq!(
        cmd,
        "export CMAKE_BUILD_PARALLEL_LEVEL=4;cmake --build /build --config Release"
    );
}

#[test]
fn build_cmd_plain() {
    let cmd = build_cmd(None, "", "/build", "");
    assert_eq!(cmd, "cmake --build /build ");
}
