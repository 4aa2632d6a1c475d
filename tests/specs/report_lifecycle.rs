//! The report across loops: staging idempotence, job gating, priority
//! tiers, forced re-runs, and crash-safe resumption.

use nb_core::Job;
use nb_report::{DocEvent, EventKey, Report, Step, StepOutput};

fn job(name: &str, priority: u32) -> Job {
    Job {
        id: 0,
        priority,
        name: name.to_string(),
        config: "Debug".to_string(),
        generator: "Unix Makefiles".to_string(),
        opts: String::new(),
        tags: vec!["x64".to_string(), "ubuntu".to_string()],
    }
}

fn stage_everything(report: &mut Report) {
    for key in [
        EventKey::Target("src"),
        EventKey::BuildFile,
        EventKey::SrcTar,
    ] {
        report.begin(key);
        report.finish(key, true, None);
    }
}

/// One Linux runner, one job, clean build: staging done in loop 0, the
/// job runs in loop 1, the report persists the whole state.
#[test]
fn single_job_clean_build() {
    let mut report = Report::new("svn://10.0.0.10/svn/PROJ/trunk", 1234);
    let jobs = vec![job("debug-x64", 1)];

    // Loop 0: staging only; jobs must wait for the next loop
    report.loop_init();
    stage_everything(&mut report);
    assert!(!report.can_start_jobs(None));
    report.loop_end(b"loop 0 log");

    // Loop 1: staging is already done, the job runs
    report.loop_incr();
    report.loop_init();
    assert!(report.can_start_jobs(None));

    let selected = report.select_jobs(&jobs, false);
    assert_eq!(selected.len(), 1);
    let id = selected[0].id;

    report.begin(EventKey::Job(id, Step::Build));
    report.finish(EventKey::Job(id, Step::Build), true, None);
    report.step_output(id, Step::Build, "ubuntu", StepOutput::default());
    report.loop_end(b"loop 1 log");

    // No test targets: a single build step, zero diagnostics
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].steps.len(), 1);
    assert_eq!(report.jobs[0].steps[0].nwarns, 0);
    assert_eq!(report.jobs[0].steps[0].nerrors, 0);
    assert_eq!(report.jobs[0].hostname, "ubuntu");
    assert_eq!(report.loops.len(), 2);

    // Persisted and reloaded, the state is identical
    let mut reloaded = Report::from_json(&report.to_json().unwrap()).unwrap();
    assert!(reloaded.jobs[0].is_done());
    assert!(reloaded.select_jobs(&jobs, false).is_empty());
}

/// Forcing with a pattern re-initialises done steps and re-runs them.
#[test]
fn forced_rerun_ignores_doneness() {
    let mut report = Report::new("url", 1);
    let jobs = vec![job("debug-x64", 1)];

    report.loop_init();
    stage_everything(&mut report);
    report.loop_end(b"");
    report.loop_incr();
    report.loop_init();

    let id = report.select_jobs(&jobs, false)[0].id;
    report.begin(EventKey::Job(id, Step::Build));
    report.finish(EventKey::Job(id, Step::Build), true, None);
    report.loop_end(b"");

    // Loop 2 with `-j ".*"`: the done job is selected again
    report.loop_incr();
    report.loop_init();
    let pattern = regex::Regex::new(".*").unwrap();
    let forced = report.force_jobs(&pattern, &jobs, false);
    assert_eq!(forced.len(), 1);

    let state = report.state(EventKey::Job(forced[0].id, Step::Build));
    assert!(!state.done, "forced step must be re-initialised");
    assert_eq!(state.loop_id, Some(2));
}

/// Priority tiers: only the lowest pending tier runs per loop.
#[test]
fn priority_tiers_run_one_per_loop() {
    let mut report = Report::new("url", 1);
    let jobs = vec![job("a", 1), job("b", 2)];

    report.loop_init();
    stage_everything(&mut report);
    report.loop_end(b"");
    report.loop_incr();
    report.loop_init();

    // Both pending: the selection is exactly {a}
    let selected = report.select_jobs(&jobs, false);
    assert_eq!(selected.len(), 1);
    assert_eq!(jobs[selected[0].job].name, "a");

    report.begin(EventKey::Job(selected[0].id, Step::Build));
    report.finish(EventKey::Job(selected[0].id, Step::Build), true, None);
    report.loop_end(b"");

    // Next loop picks up b
    report.loop_incr();
    report.loop_init();
    let selected = report.select_jobs(&jobs, false);
    assert_eq!(selected.len(), 1);
    assert_eq!(jobs[selected[0].job].name, "b");
}

/// A crash between loops loses nothing: the reloaded report resumes at
/// the next loop id and skips done events.
#[test]
fn resume_after_crash() {
    let mut report = Report::new("url", 99);
    report.loop_init();
    stage_everything(&mut report);
    report.loop_end(b"first");
    let persisted = report.to_json().unwrap();

    // The "restarted" coordinator reloads and advances the counter
    let mut resumed = Report::from_json(&persisted).unwrap();
    resumed.loop_incr();
    resumed.loop_init();
    assert_eq!(resumed.loop_current(), 1);

    // Staging events are done with their loop id untouched
    for key in [
        EventKey::Target("src"),
        EventKey::BuildFile,
        EventKey::SrcTar,
    ] {
        let state = resumed.state(key);
        assert!(state.done);
        assert_eq!(state.loop_id, Some(0));
    }
    assert!(resumed.can_start_jobs(None));
}

/// The documentation event group gates jobs like any other staging
/// prerequisite, keyed by its own repository revision.
#[test]
fn doc_event_group_gates_jobs() {
    let mut report = Report::new("url", 1);
    report.loop_init();
    stage_everything(&mut report);
    report.loop_end(b"");
    report.loop_incr();
    report.loop_init();

    // Docs configured but never generated: jobs blocked
    assert!(!report.can_start_jobs(Some(55)));

    report.begin(EventKey::Doc(55, DocEvent::Doc));
    report.finish(EventKey::Doc(55, DocEvent::Doc), true, None);
    // Generated this loop: still blocked until the next one
    assert!(!report.can_start_jobs(Some(55)));

    report.loop_end(b"");
    report.loop_incr();
    report.loop_init();
    assert!(report.can_start_jobs(Some(55)));
}
