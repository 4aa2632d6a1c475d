// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::report::{DocEvent, EventKey, StepOutput};
use nb_core::test_support::job;
use nb_core::{Global, Job};

fn built_report() -> (Report, Vec<Job>) {
    let mut r = Report::new("svn://10.0.0.10/svn/PROJ/trunk", 120);
    r.loop_init();
    for key in [EventKey::Target("src"), EventKey::BuildFile, EventKey::SrcTar] {
        r.begin(key);
        r.finish(key, true, None);
    }
    let jobs = vec![job("debug-x64", 1, "Unix Makefiles", &["x64", "ubuntu"])];
    let id = r.select_jobs(&jobs, false)[0].id;
    r.begin(EventKey::Job(id, Step::Build));
    r.finish(EventKey::Job(id, Step::Build), true, None);
    r.step_output(
        id,
        Step::Build,
        "ubuntu",
        StepOutput {
            build_log: Some("gcc -c os.c".to_string()),
            ..StepOutput::default()
        },
    );
    r.loop_end(b"loop log text");
    (r, jobs)
}

#[test]
fn page_header_carries_revision_and_version() {
    let (r, jobs) = built_report();
    let page = render(&r, &jobs, &Global::default(), "1.5.1");
    assert!(page.starts_with("h1.r120, v1.5.1"));
    assert!(page.contains("notoc.\n"));
    assert!(page.contains("h2.Summary"));
}

#[test]
fn page_lists_targets_and_jobs() {
    let (r, jobs) = built_report();
    let page = render(&r, &jobs, &Global::default(), "1.5.1");
    assert!(page.contains("table(targetssummary,,open,no).Source code package"));
    assert!(page.contains("p(left).src"));
    assert!(page.contains("table(jobssummary,,open,no).Build jobs"));
    assert!(page.contains("p.<lh>debug-x64</lh>"));
    assert!(page.contains("img(ubuntu_logo.png,16,.05)."));
    assert!(page.contains("p.ubuntu"));
}

#[test]
fn page_embeds_decoded_loop_log() {
    let (r, jobs) = built_report();
    let page = render(&r, &jobs, &Global::default(), "1.5.1");
    assert!(page.contains("loop log text"));
    assert!(page.contains("h2.Lp0"));
}

#[test]
fn page_renders_build_logs_closed() {
    let (r, jobs) = built_report();
    let page = render(&r, &jobs, &Global::default(), "1.5.1");
    assert!(page.contains("code(text,,1,close).Build log\ngcc -c os.c"));
}

#[test]
fn page_without_loops() {
    let r = Report::new("url", 1);
    let page = render(&r, &[], &Global::default(), "0.1");
    assert!(page.contains("p.<b>No loops in this build.</b>"));
}

#[test]
fn doc_table_rendered_when_docs_present() {
    let (mut r, jobs) = built_report();
    r.begin(EventKey::Doc(9, DocEvent::Doc));
    r.finish(EventKey::Doc(9, DocEvent::Doc), true, None);
    let mut g = Global::default();
    g.doc_url = "https://example.org".to_string();
    let page = render(&r, &jobs, &g, "1.5.1");
    assert!(page.contains("table(docssummary,,open,no).Documentation"));
    assert!(page.contains("https://example.org/docs/r9/en/home/web/home.html''r9"));
}

#[test]
fn seconds_formatting() {
    assert_eq!(fmt_seconds(0), "00:00:00");
    assert_eq!(fmt_seconds(3723), "01:02:03");
    assert_eq!(fmt_seconds(-5), "00:00:00");
}

#[test]
fn bgcolor_cycles_by_priority() {
    assert_eq!(job_bgcolor(1), job_bgcolor(7));
    assert_ne!(job_bgcolor(1), job_bgcolor(2));
}
