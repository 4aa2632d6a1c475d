// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn global() -> Global {
    Global {
        project: "Proj".to_string(),
        repo_url: "svn://10.0.0.10/svn/PROJ".to_string(),
        repo_branch: "trunk".to_string(),
        repo_user: "ci".to_string(),
        repo_pass: "s1".to_string(),
        doc_repo_url: "svn://10.0.0.10/svn/PROJ/doc".to_string(),
        doc_repo_user: "ci".to_string(),
        doc_repo_pass: "s2".to_string(),
        ..Global::default()
    }
}

#[test]
fn ndoc_cmd_carries_both_repos_and_revisions() {
    let cmd = ndoc_cmd(&global(), "1.5", 120, 88, "/tmp/flow/ndoc_out");
    assert!(cmd.contains("-v 1.5.88"));
    assert!(cmd.contains("-r svn://10.0.0.10/svn/PROJ/doc ci s2 88"));
    assert!(cmd.contains("-s svn://10.0.0.10/svn/PROJ/trunk ci s1 120"));
    assert!(cmd.ends_with("-o /tmp/flow/ndoc_out"));
}

#[test]
fn pick_lines_counts_marked_output() {
    let out = "\
page home: ok
[Warning] missing image 'x.png'
page draw: ok
[Error] broken link 'y.html'
[Warning] missing image 'z.png'
";
    let (nwarns, warns) = pick_lines(out, NDOC_WARN);
    let (nerrors, errors) = pick_lines(out, NDOC_ERROR);
    assert_eq!(nwarns, 2);
    assert_eq!(nerrors, 1);
    assert!(warns.contains("x.png"));
    assert!(warns.contains("z.png"));
    assert!(errors.contains("y.html"));
    assert!(!errors.contains("ok"));
}
