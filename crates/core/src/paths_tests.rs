// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::network;
use std::path::Path;

#[test]
fn drive_paths_embed_the_revision() {
    let net = network(vec![]);
    let paths = WorkPaths::new(&net.drive, Path::new("/tmp/nb"), "flow", 1234, Some(77));

    assert_eq!(paths.tmp_path, Path::new("/tmp/nb/flow"));
    assert_eq!(paths.tmp_src, Path::new("/tmp/nb/flow/src"));
    assert_eq!(paths.tmp_test, Path::new("/tmp/nb/flow/test"));
    assert_eq!(paths.drive_path, "/data/ci/flow/r1234");
    assert_eq!(paths.drive_inf, "/data/ci/flow/r1234/inf");
    assert_eq!(paths.drive_doc.as_deref(), Some("/data/ci/flow-DOC/r77"));
    assert_eq!(paths.drive_rep, "/data/ci/flow-REP");
    assert_eq!(paths.drive_rep_web, "/data/ci/flow-REPWEB/r1234");
}

#[test]
fn doc_path_absent_without_doc_revision() {
    let net = network(vec![]);
    let paths = WorkPaths::new(&net.drive, Path::new("/tmp/nb"), "flow", 1, None);
    assert!(paths.drive_doc.is_none());
}

#[test]
fn different_revisions_never_collide() {
    let net = network(vec![]);
    let a = WorkPaths::new(&net.drive, Path::new("/tmp/nb"), "flow", 10, None);
    let b = WorkPaths::new(&net.drive, Path::new("/tmp/nb"), "flow", 11, None);
    assert_ne!(a.drive_path, b.drive_path);
    assert_ne!(a.drive_rep_web, b.drive_rep_web);
}
