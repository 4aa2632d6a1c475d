// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_coherent() {
    Cli::command().debug_assert();
}

#[test]
fn required_flags() {
    assert!(Cli::try_parse_from(["nbuild"]).is_err());
    assert!(Cli::try_parse_from(["nbuild", "-n", "net.json"]).is_err());

    let cli = Cli::try_parse_from(["nbuild", "-n", "net.json", "-w", "flow.json"]).unwrap();
    assert_eq!(cli.network, PathBuf::from("net.json"));
    assert_eq!(cli.workflow, PathBuf::from("flow.json"));
    assert_eq!(cli.jobs, None);
}

#[test]
fn forced_jobs_pattern() {
    let cli =
        Cli::try_parse_from(["nbuild", "-n", "n.json", "-w", "w.json", "-j", ".*"]).unwrap();
    assert_eq!(cli.jobs.as_deref(), Some(".*"));
}

#[test]
fn network_file_errors_are_contextual() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let err = load_network(&missing).unwrap_err();
    assert!(err.to_string().contains("Opening"));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, b"{ not json").unwrap();
    let err = load_network(&broken).unwrap_err();
    assert!(err.to_string().contains("network file"));
}

#[test]
fn workflow_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w.json");
    std::fs::write(
        &path,
        br#"{"global": {"flowid": "f"}, "version": "v.txt", "build": "b.txt"}"#,
    )
    .unwrap();
    let workflow = load_workflow(&path).unwrap();
    assert_eq!(workflow.global.flowid, "f");
    assert!(workflow.jobs.is_empty());
}

#[test]
fn pathname_split() {
    let (dir, file) = split_pathname(Path::new("/var/log/nbuild/2026_03_07_09_05_log.txt"));
    assert_eq!(dir, "/var/log/nbuild");
    assert_eq!(file, "2026_03_07_09_05_log.txt");
}
