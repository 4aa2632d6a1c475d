// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nb_core::test_support::network;

#[test]
fn ignore_patterns_compile() {
    let patterns = vec![r"\.bak$".to_string(), "private/".to_string()];
    let regexes = ignore_regexes(&patterns).unwrap();
    assert_eq!(regexes.len(), 2);
    assert!(regexes[0].is_match("file.bak"));
}

#[test]
fn broken_ignore_pattern_is_fatal() {
    let patterns = vec!["([unclosed".to_string()];
    assert!(matches!(
        ignore_regexes(&patterns),
        Err(FlowError::IgnorePattern(p)) if p == "([unclosed"
    ));
}

#[tokio::test]
async fn live_lockfile_aborts_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let net = network(vec![]);
    let wpaths = WorkPaths::new(&net.drive, dir.path(), "flow", 1, None);

    tokio::fs::create_dir_all(&wpaths.tmp_path).await.unwrap();
    tokio::fs::write(wpaths.tmp_path.join(nb_core::LOCKFILE), b"lock")
        .await
        .unwrap();

    assert!(!create_temp_paths(&wpaths, "flow").await);
    // The foreign lock is left in place
    assert!(wpaths.tmp_path.join(nb_core::LOCKFILE).exists());
}

#[test]
fn flow_errors_are_descriptive() {
    let err = FlowError::BranchVersion("svn://10.0.0.10/svn/PROJ/trunk".to_string());
    assert!(err.to_string().contains("unable to get repo version"));
    let err = FlowError::NothingToBuild;
    assert!(err.to_string().contains("nothing to build"));
    let err = FlowError::JobPattern("(".to_string());
    assert!(err.to_string().contains("invalid job pattern"));
}
