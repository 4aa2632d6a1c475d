// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-revision report page in documentation markup.
//!
//! The emitted text is the *source* consumed by the external site
//! generator; rendering it to HTML happens elsewhere.

use crate::event::Event;
use crate::report::{JobRecord, Report, Step};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use nb_core::{Global, Job};
use std::fmt::Write as _;

fn fmt_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y %b %d").to_string())
        .unwrap_or_default()
}

fn fmt_datetime(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn fmt_seconds(seconds: i64) -> String {
    let s = seconds.max(0);
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

fn mark(page: &mut String, on: bool) {
    if on {
        page.push_str("p.✓\n");
    } else {
        page.push_str("p.⍉\n");
    }
}

fn error_icon(page: &mut String, show: bool, nerrors: u32, nwarns: u32) {
    if !show {
        page.push_str("p.⍉\n");
    } else if nerrors > 0 {
        page.push_str("img(error.png,16,.05).\n");
    } else if nwarns > 0 {
        page.push_str("img(warning.png,16,.05).\n");
    } else {
        page.push_str("img(ok.png,16,.05).\n");
    }
}

fn has_tag_like(tags: &[String], word: &str) -> bool {
    tags.iter().any(|t| t.contains(word))
}

fn job_icon(record: &JobRecord, jobs: &[Job]) -> &'static str {
    let Some(job) = jobs.iter().find(|j| j.name == record.name) else {
        return "ubuntu20_logo.png";
    };

    if has_tag_like(&job.tags, "ubuntu") {
        return "ubuntu_logo.png";
    }
    if has_tag_like(&job.tags, "raspos") {
        return "raspbian.png";
    }

    let msvc: [(&str, &str, &str); 7] = [
        ("Visual Studio 17 2022", "msvc2022", "vs2022.png"),
        ("Visual Studio 16 2019", "msvc2019", "vs2019.png"),
        ("Visual Studio 15 2017", "msvc2017", "vs2017.png"),
        ("Visual Studio 14 2015", "msvc2015", "vs2015.png"),
        ("Visual Studio 12 2013", "msvc2013", "vs2013.png"),
        ("Visual Studio 11 2012", "msvc2012", "vs2012.png"),
        ("Visual Studio 10 2010", "msvc2010", "vs2010.png"),
    ];
    for (generator, tag, icon) in msvc {
        if job.generator == generator || has_tag_like(&job.tags, tag) {
            return icon;
        }
    }
    if job.generator == "Visual Studio 9 2008" {
        return "vs2008.png";
    }
    if job.generator == "Visual Studio 8 2005" {
        return "vs2005.png";
    }
    if job.generator == "MinGW Makefiles" {
        return "mingw.png";
    }

    let macos: [(&str, &str); 14] = [
        ("sequoia", "sequoia.png"),
        ("sonoma", "sonoma.png"),
        ("ventura", "ventura.png"),
        ("monterey", "monterey.png"),
        ("bigsur", "bigsur.png"),
        ("catalina", "catalina.png"),
        ("mojave", "mojave.png"),
        ("high_sierra", "high_sierra.png"),
        ("sierra", "sierra.png"),
        ("el_capitan", "el_capitan.png"),
        ("yosemite", "yosemite.png"),
        ("mavericks", "mavericks.png"),
        ("mountain_lion", "mountain_lion.png"),
        ("snow_leopard", "snow_leopard.png"),
    ];
    for (tag, icon) in macos {
        if has_tag_like(&job.tags, tag) {
            return icon;
        }
    }

    "ubuntu20_logo.png"
}

fn job_bgcolor(priority: u32) -> &'static str {
    match priority % 6 {
        0 => "#FFF5F4",
        1 => "#F2F6FF",
        2 => "#FEFFF4",
        3 => "#FCEEFF",
        4 => "#F3FFF4",
        _ => "#F2F6FF",
    }
}

fn decode_blob(blob: &str) -> String {
    B64.decode(blob)
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

fn loop_duration(init: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> i64 {
    match (init, end) {
        (Some(init), Some(end)) => (end - init).num_seconds().max(0),
        _ => 0,
    }
}

fn event_loop_cell(page: &mut String, event: &Event) {
    let _ = writeln!(page, "p.<lh>Lp{}</lh>", event.loop_id.unwrap_or(0));
}

fn target_table(page: &mut String, report: &Report, title: &str, tests: bool) {
    let records = if tests { &report.tests } else { &report.targets };
    if records.is_empty() {
        return;
    }

    let id = if tests { "testssummary" } else { "targetssummary" };
    let _ = writeln!(page, "table({},,open,no).{}", id, title);
    page.push_str("row.\np.Target\np.Analyzer\np.Format\np.Legal\np.Time\np.Date\np.Loop\n");

    for record in records {
        let nerrors = report.target_errors(&record.event.name);
        let nwarns = report.target_warnings(&record.event.name);
        page.push_str("row.\n");
        let _ = writeln!(page, "p(left).{}", record.event.name);
        error_icon(page, record.analyzer, nerrors, nwarns);
        mark(page, record.format);
        mark(page, record.legal);
        let _ = writeln!(page, "p.{}s", record.event.seconds);
        let _ = writeln!(page, "p.{}", fmt_datetime(record.event.init));
        event_loop_cell(page, &record.event);
    }

    page.push_str("table.\n\n");
}

fn step_detail(page: &mut String, step: &crate::report::StepRecord, test: bool) {
    let prefix = if test { "Test " } else { "Build " };

    if !step.event.error_msg.is_empty() {
        let _ = writeln!(page, "code(text,,1,open).{}job execution error", prefix);
        page.push_str(&step.event.error_msg);
        page.push_str("\ncode.\n");
    }

    if step.nerrors > 0 {
        let _ = writeln!(page, "code(text,,1,open).{}<b>{}</b> errors", prefix, step.nerrors);
        if test {
            page.push_str(&decode_blob(&step.errors));
        } else {
            page.push_str(&step.errors);
        }
        page.push_str("code.\n");
    }

    if step.nwarns > 0 {
        let _ = writeln!(page, "code(text,,1,open).{}<b>{}</b> warnings", prefix, step.nwarns);
        if test {
            page.push_str(&decode_blob(&step.warns));
        } else {
            page.push_str(&step.warns);
        }
        page.push_str("code.\n");
    }
}

fn step_logs(page: &mut String, step: &crate::report::StepRecord, test: bool) {
    let prefix = if test { "Test " } else { "" };
    if !step.cmake_log.is_empty() {
        let _ = writeln!(page, "code(text,,1,close).{}Build cmake log", prefix);
        page.push_str(&step.cmake_log);
        page.push_str("code.\n");
    }
    if !step.build_log.is_empty() {
        let _ = writeln!(page, "code(text,,1,close).{}Build log", prefix);
        page.push_str(&step.build_log);
        page.push_str("code.\n");
    }
    if !step.install_log.is_empty() {
        if test {
            // The test step's third log is the executable run, base64.
            page.push_str("code(ansi,,1,close).Test run log\n");
            page.push_str(&decode_blob(&step.install_log));
        } else {
            page.push_str("code(text,,1,close).Install log\n");
            page.push_str(&step.install_log);
        }
        page.push_str("code.\n");
    }
}

/// Render the report page source for one repository revision.
pub fn render(report: &Report, jobs: &[Job], global: &Global, project_vers: &str) -> String {
    let mut page = String::with_capacity(4096);
    let njobs = report.jobs_done();

    let _ = write!(page, "h1.r{}, v{}", report.repo_vers, project_vers);
    if let Some(first) = report.loops.first() {
        let _ = write!(page, ", {} ({})", fmt_date(first.init), njobs);
    }
    page.push_str("\nnotoc.\nnosecnum.\n\n");

    let _ = writeln!(
        page,
        "ep.Learn more about <b>nbuild</b> CI/CD <l>https://nappgui.com/en/nbuild/nbuild.html''here</l>"
    );

    page.push_str("h2.Summary\n\n");

    target_table(&mut page, report, "Source code package", false);
    target_table(&mut page, report, "Test package", true);

    /* Documentation table */
    if !report.docs.is_empty() {
        page.push_str("table(docssummary,,open,no).Documentation\n");
        page.push_str("row.\np.\np.Url\np.Time\np.ndoc\np.en.pdf\np.es.pdf\np.Copy\np.Upload\np.Date\np.Loop\n");
        for doc in report.docs.iter().rev() {
            page.push_str("row.\n");
            error_icon(&mut page, true, doc.nerrors, doc.nwarns);
            let _ = writeln!(
                page,
                "p.<l>{}/docs/r{}/en/home/web/home.html''r{}</l>",
                global.doc_url, doc.doc_repo_vers, doc.doc_repo_vers
            );
            let _ = writeln!(page, "p.{}s", doc.event.seconds);
            let _ = writeln!(page, "p.{}s", doc.ndoc_event.seconds);
            let _ = writeln!(page, "p.{}s", doc.ebook_en_event.seconds);
            let _ = writeln!(page, "p.{}s", doc.ebook_es_event.seconds);
            let _ = writeln!(page, "p.{}s", doc.copy_event.seconds);
            let _ = writeln!(page, "p.{}s", doc.upload_event.seconds);
            let _ = writeln!(page, "p.{}", fmt_datetime(doc.event.init));
            event_loop_cell(&mut page, &doc.event);
        }
        page.push_str("table.\n\n");
    }

    /* Jobs table */
    if njobs > 0 {
        page.push_str("table(jobssummary,,open,no).Build jobs\n");
        page.push_str("row.\np.\np.Name\np.Build\np.Test\np.Runner\np.Generator\np.T1\np.T2\np.Date\np.Loop\n");
        for record in report.jobs.iter().filter(|j| j.is_done()) {
            let bstep = match record.step(Step::Build) {
                Some(step) => step,
                None => continue,
            };
            let tstep = record.step(Step::Test);

            let _ = writeln!(page, "row({}).", job_bgcolor(record.priority));
            let _ = writeln!(page, "img({},16,.05).", job_icon(record, jobs));
            let _ = writeln!(page, "p.<lh>{}</lh>", record.name);

            if bstep.event.error_msg.is_empty() {
                error_icon(&mut page, true, bstep.nerrors, bstep.nwarns);
            } else {
                error_icon(&mut page, true, 1, 0);
            }

            match tstep {
                Some(step) if step.event.is_done() => {
                    if step.event.error_msg.is_empty() {
                        error_icon(&mut page, true, step.nerrors, step.nwarns);
                    } else {
                        error_icon(&mut page, true, 1, 0);
                    }
                }
                _ => page.push_str("p.⍉\n"),
            }

            let _ = writeln!(page, "p.{}", record.hostname);
            let _ = writeln!(page, "p.{}", record.generator);
            let _ = writeln!(page, "p.{}s", bstep.event.seconds);
            match tstep {
                Some(step) if step.event.is_done() => {
                    let _ = writeln!(page, "p.{}s", step.event.seconds);
                }
                _ => page.push_str("p.⍉\n"),
            }
            let _ = writeln!(page, "p.{}", fmt_datetime(bstep.event.init));
            event_loop_cell(&mut page, &bstep.event);
        }
        page.push_str("table.\n\n");
    }

    /* Loops table */
    if report.loops.is_empty() {
        page.push_str("p.<b>No loops in this build.</b>\n");
    } else {
        let _ = writeln!(
            page,
            "table(loops,,open,no).<b>{}</b> loops executed over '{}'",
            report.loops.len(),
            report.repo_vers
        );
        page.push_str("row.\np.Loop ID\np.Time\np.Begin\np.End\np.Tasks\n");
        let last = report.loops.len() - 1;
        for (i, record) in report.loops.iter().enumerate().rev() {
            let ntasks = report.tasks_in_loop(i as u32);
            if ntasks == 0 && i != last {
                continue;
            }
            page.push_str("row.\n");
            let _ = writeln!(page, "p.<lh>Lp{}</lh>", i);
            let _ = writeln!(page, "p.{}", fmt_seconds(loop_duration(record.init, record.end)));
            let _ = writeln!(page, "p.{}", fmt_datetime(record.init));
            let _ = writeln!(page, "p.{}", fmt_datetime(record.end));
            let _ = writeln!(page, "p.{}", ntasks);
        }
        page.push_str("table.\n\n");
    }

    /* Job details */
    for record in report.jobs.iter().filter(|j| j.is_done()) {
        let Some(bstep) = record.step(Step::Build) else {
            continue;
        };
        let _ = writeln!(page, "h2.{}", record.name);
        step_detail(&mut page, bstep, false);
        if let Some(tstep) = record.step(Step::Test) {
            step_detail(&mut page, tstep, true);
        }
        step_logs(&mut page, bstep, false);
        if let Some(tstep) = record.step(Step::Test) {
            step_logs(&mut page, tstep, true);
        }
    }

    /* Loop details */
    let last = report.loops.len().saturating_sub(1);
    for (i, record) in report.loops.iter().enumerate() {
        let ntasks = report.tasks_in_loop(i as u32);
        if ntasks == 0 && i != last {
            continue;
        }
        let _ = writeln!(page, "h2.Lp{}", i);

        if let Some(doc) = report.doc_in_loop(i as u32) {
            if doc.nerrors > 0 {
                let _ = writeln!(
                    page,
                    "code(ansi,,1,open).Documentation '{}' errors",
                    doc.doc_repo_vers
                );
                page.push_str(&decode_blob(&doc.errors));
                page.push_str("code.\n");
            }
            if doc.nwarns > 0 {
                let _ = writeln!(
                    page,
                    "code(ansi,,1,open).Documentation '{}' warnings",
                    doc.doc_repo_vers
                );
                page.push_str(&decode_blob(&doc.warns));
                page.push_str("code.\n");
            }
        }

        if !record.log.is_empty() {
            let state = if ntasks > 0 { "close" } else { "open" };
            let _ = write!(page, "code(ansi,,1,{}).", state);
            let _ = writeln!(
                page,
                "{} tasks completed in {} sec on {}",
                ntasks,
                loop_duration(record.init, record.end),
                fmt_datetime(record.init)
            );
            page.push_str(&decode_blob(&record.log));
            page.push_str("code.\n");
        }

        page.push('\n');
    }

    page
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
