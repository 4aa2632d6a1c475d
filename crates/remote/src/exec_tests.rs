// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn run_shell_captures_stdout() {
    let out = run_shell("echo hello").await;
    assert!(out.ok());
    assert_eq!(out.stdout_text().trim(), "hello");
}

#[tokio::test]
async fn run_shell_reports_exit_code() {
    let out = run_shell("exit 3").await;
    assert!(!out.ok());
    assert_eq!(out.code, 3);
}

#[cfg(unix)]
#[tokio::test]
async fn run_filtered_streams_stdin_to_stdout() {
    let out = run_filtered("cat", b"line one\nline two\n").await;
    assert_eq!(out.as_deref(), Some(&b"line one\nline two\n"[..]));
}

#[cfg(unix)]
#[tokio::test]
async fn run_filtered_failure_yields_none() {
    assert!(run_filtered("false", b"x").await.is_none());
}

#[test]
fn merged_text_appends_nontrivial_stderr() {
    let out = CmdOutput {
        code: 0,
        stdout: b"built ok\n".to_vec(),
        stderr: b"warning: deprecated call\n".to_vec(),
    };
    let merged = out.merged_text();
    assert!(merged.starts_with("built ok"));
    assert!(merged.contains("\nstderr:\nwarning: deprecated call"));
}

#[test]
fn merged_text_ignores_trivial_stderr() {
    let out = CmdOutput {
        code: 0,
        stdout: b"built ok\n".to_vec(),
        stderr: b"\n".to_vec(),
    };
    assert!(!out.merged_text().contains("stderr:"));
}

#[test]
fn logged_prepends_command_line() {
    let out = CmdOutput {
        code: 0,
        stdout: b"done\n".to_vec(),
        stderr: Vec::new(),
    };
    assert_eq!(out.logged("make all"), "make all\n\ndone\n");
}
