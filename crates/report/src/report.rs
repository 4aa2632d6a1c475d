// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The report document: loops, staging events, docs, and job steps.

use crate::event::{Event, EventState};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use nb_core::{Job, SelectedJob};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One CI loop: init/end timestamps plus the coordinator log, base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: String,
}

/// Staging record for one source or test target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRecord {
    pub event: Event,
    #[serde(default)]
    pub legal: bool,
    #[serde(default)]
    pub format: bool,
    #[serde(default)]
    pub analyzer: bool,
}

/// Documentation generation record for one doc-repo revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocRecord {
    pub event: Event,
    #[serde(default)]
    pub ndoc_event: Event,
    #[serde(default)]
    pub ebook_es_event: Event,
    #[serde(default)]
    pub ebook_en_event: Event,
    #[serde(default)]
    pub copy_event: Event,
    #[serde(default)]
    pub upload_event: Event,
    pub doc_repo_vers: u32,
    #[serde(default)]
    pub hosting_url: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub warns: String,
    #[serde(default)]
    pub errors: String,
    #[serde(default)]
    pub in_cache: bool,
    #[serde(default)]
    pub ret: i32,
    #[serde(default)]
    pub nwarns: u32,
    #[serde(default)]
    pub nerrors: u32,
}

/// One step of a job: its event plus captured logs and diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRecord {
    pub event: Event,
    pub name: String,
    #[serde(default)]
    pub cmake_log: String,
    #[serde(default)]
    pub build_log: String,
    #[serde(default)]
    pub install_log: String,
    #[serde(default)]
    pub warns: String,
    #[serde(default)]
    pub errors: String,
    #[serde(default)]
    pub nwarns: u32,
    #[serde(default)]
    pub nerrors: u32,
}

/// Per-job record across all loops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRecord {
    pub priority: u32,
    pub name: String,
    /// Host that ran (or is running) this job; pre-assigned on resume.
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub generator: String,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

impl JobRecord {
    pub fn step(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == step.as_str())
    }

    fn step_mut(&mut self, step: Step) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.name == step.as_str())
    }

    /// A job counts as done once its first step is done.
    pub fn is_done(&self) -> bool {
        self.steps.first().map_or(false, |s| s.event.is_done())
    }
}

/// Fixed two-step pipeline per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Build,
    Test,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Build => "build",
            Step::Test => "test",
        }
    }
}

/// Sub-events of the documentation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocEvent {
    Doc,
    Ndoc,
    EbookEn,
    EbookEs,
    Copy,
    Upload,
}

/// Addresses of every event the report tracks.
#[derive(Debug, Clone, Copy)]
pub enum EventKey<'a> {
    Target(&'a str),
    Test(&'a str),
    BuildFile,
    SrcTar,
    TestTar,
    Doc(u32, DocEvent),
    Job(usize, Step),
}

/// Captured outputs of one job step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub cmake_log: Option<String>,
    pub build_log: Option<String>,
    pub install_log: Option<String>,
    pub warns: Option<String>,
    pub errors: Option<String>,
    pub nwarns: u32,
    pub nerrors: u32,
}

/// Captured outputs of a documentation run.
#[derive(Debug, Clone, Default)]
pub struct DocOutcome {
    pub hosting_url: String,
    pub stdout_b64: String,
    pub stderr_b64: String,
    pub warns_b64: String,
    pub errors_b64: String,
    pub in_cache: bool,
    pub ret: i32,
    pub nwarns: u32,
    pub nerrors: u32,
}

/// The full durable state of one CI job for a repository revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub repo_url: String,
    pub repo_vers: u32,
    pub loop_id: u32,
    #[serde(default)]
    pub loops: Vec<LoopRecord>,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
    #[serde(default)]
    pub tests: Vec<TargetRecord>,
    #[serde(default)]
    pub docs: Vec<DocRecord>,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    #[serde(default)]
    pub build_file: Event,
    #[serde(default)]
    pub src_tar: Event,
    #[serde(default)]
    pub test_tar: Event,
}

impl Report {
    pub fn new(repo_url: &str, repo_vers: u32) -> Report {
        Report {
            repo_url: repo_url.to_string(),
            repo_vers,
            loop_id: 0,
            loops: Vec::new(),
            targets: Vec::new(),
            tests: Vec::new(),
            docs: Vec::new(),
            jobs: Vec::new(),
            build_file: Event::default(),
            src_tar: Event::default(),
            test_tar: Event::default(),
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Report, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /* ------------------------------ loops ------------------------------ */

    /// Advance the loop counter after loading a persisted report.
    pub fn loop_incr(&mut self) {
        self.loop_id += 1;
    }

    pub fn loop_current(&self) -> u32 {
        self.loop_id
    }

    /// Append the running loop's record. Between `loop_init` and
    /// `loop_end`, `loops.len() == loop_id + 1`.
    pub fn loop_init(&mut self) {
        debug_assert_eq!(self.loops.len(), self.loop_id as usize);
        self.loops.push(LoopRecord {
            init: Some(Utc::now()),
            end: None,
            log: String::new(),
        });
    }

    /// Terminate the running loop and embed the coordinator log.
    pub fn loop_end(&mut self, logfile: &[u8]) {
        debug_assert_eq!(self.loops.len(), self.loop_id as usize + 1);
        if let Some(record) = self.loops.last_mut() {
            record.end = Some(Utc::now());
            record.log = B64.encode(logfile);
        }
    }

    /// Wall seconds of a loop; `None` selects the last loop.
    pub fn loop_seconds(&self, loop_id: Option<u32>) -> i64 {
        let record = match loop_id {
            Some(id) => self.loops.get(id as usize),
            None => self.loops.last(),
        };
        let Some(record) = record else { return 0 };
        match (record.init, record.end) {
            (Some(init), Some(end)) => (end - init).num_seconds().max(0),
            _ => 0,
        }
    }

    /* ------------------------------ events ----------------------------- */

    fn target_record(records: &mut Vec<TargetRecord>, name: &str) -> usize {
        if let Some(i) = records.iter().position(|t| t.event.name == name) {
            return i;
        }
        records.push(TargetRecord {
            event: Event::named(name),
            ..TargetRecord::default()
        });
        records.len() - 1
    }

    fn doc_record(&mut self, doc_repo_vers: u32) -> usize {
        if let Some(i) = self.docs.iter().position(|d| d.doc_repo_vers == doc_repo_vers) {
            return i;
        }
        self.docs.push(DocRecord {
            doc_repo_vers,
            ..DocRecord::default()
        });
        self.docs.len() - 1
    }

    fn event_mut(&mut self, key: EventKey<'_>) -> Option<&mut Event> {
        match key {
            EventKey::Target(name) => {
                let i = Report::target_record(&mut self.targets, name);
                Some(&mut self.targets[i].event)
            }
            EventKey::Test(name) => {
                let i = Report::target_record(&mut self.tests, name);
                Some(&mut self.tests[i].event)
            }
            EventKey::BuildFile => Some(&mut self.build_file),
            EventKey::SrcTar => Some(&mut self.src_tar),
            EventKey::TestTar => Some(&mut self.test_tar),
            EventKey::Doc(vers, sub) => {
                let i = self.doc_record(vers);
                let doc = &mut self.docs[i];
                Some(match sub {
                    DocEvent::Doc => &mut doc.event,
                    DocEvent::Ndoc => &mut doc.ndoc_event,
                    DocEvent::EbookEn => &mut doc.ebook_en_event,
                    DocEvent::EbookEs => &mut doc.ebook_es_event,
                    DocEvent::Copy => &mut doc.copy_event,
                    DocEvent::Upload => &mut doc.upload_event,
                })
            }
            EventKey::Job(job_id, step) => {
                let job = self.jobs.get_mut(job_id)?;
                job.step_mut(step).map(|s| &mut s.event)
            }
        }
    }

    /// Project an event's state, creating it when first addressed.
    pub fn state(&mut self, key: EventKey<'_>) -> EventState {
        match self.event_mut(key) {
            Some(event) => event.state(),
            None => Event::default().state(),
        }
    }

    /// Stamp the event's init timestamp with the current loop.
    pub fn begin(&mut self, key: EventKey<'_>) {
        let loop_id = self.loop_id;
        match self.event_mut(key) {
            Some(event) => event.begin(loop_id, Utc::now()),
            None => warn!("begin on unknown event {:?}", key),
        }
    }

    /// Terminate the event with its outcome.
    pub fn finish(&mut self, key: EventKey<'_>, ok: bool, error_msg: Option<String>) {
        match self.event_mut(key) {
            Some(event) => event.finish(ok, error_msg, Utc::now()),
            None => warn!("finish on unknown event {:?}", key),
        }
    }

    /// Record a failure without terminating the event; the next loop
    /// re-attempts the work.
    pub fn mark_error(&mut self, key: EventKey<'_>, msg: &str) {
        let loop_id = self.loop_id;
        match self.event_mut(key) {
            Some(event) => event.mark_error(loop_id, msg),
            None => warn!("error on unknown event {:?}", key),
        }
    }

    /* ----------------------------- staging ----------------------------- */

    pub fn target_set(&mut self, name: &str, legal: bool, format: bool, analyzer: bool) {
        let i = Report::target_record(&mut self.targets, name);
        self.targets[i].legal = legal;
        self.targets[i].format = format;
        self.targets[i].analyzer = analyzer;
    }

    pub fn test_set(&mut self, name: &str, legal: bool, format: bool, analyzer: bool) {
        let i = Report::target_record(&mut self.tests, name);
        self.tests[i].legal = legal;
        self.tests[i].format = format;
        self.tests[i].analyzer = analyzer;
    }

    /// Total errors of a target across all runners.
    // TODO: aggregate per-target diagnostics once runners report them
    pub fn target_errors(&self, _name: &str) -> u32 {
        0
    }

    /// Total warnings of a target across all runners.
    pub fn target_warnings(&self, _name: &str) -> u32 {
        0
    }

    /* ------------------------------- docs ------------------------------ */

    pub fn doc_outcome(&mut self, doc_repo_vers: u32, outcome: DocOutcome) {
        let i = self.doc_record(doc_repo_vers);
        let doc = &mut self.docs[i];
        doc.hosting_url = outcome.hosting_url;
        doc.stdout = outcome.stdout_b64;
        doc.stderr = outcome.stderr_b64;
        doc.warns = outcome.warns_b64;
        doc.errors = outcome.errors_b64;
        doc.in_cache = outcome.in_cache;
        doc.ret = outcome.ret;
        doc.nwarns = outcome.nwarns;
        doc.nerrors = outcome.nerrors;
    }

    pub fn doc_in_loop(&self, loop_id: u32) -> Option<&DocRecord> {
        self.docs
            .iter()
            .find(|d| d.event.loop_id == Some(loop_id))
    }

    /* ------------------------------- jobs ------------------------------ */

    /// Record a step's outputs and pin the job to the host that ran it.
    pub fn step_output(&mut self, job_id: usize, step: Step, hostname: &str, out: StepOutput) {
        let Some(job) = self.jobs.get_mut(job_id) else {
            warn!("step output for unknown job {}", job_id);
            return;
        };
        debug_assert!(job.hostname.is_empty() || job.hostname == hostname);
        job.hostname = hostname.to_string();

        let Some(record) = job.step_mut(step) else {
            return;
        };
        if let Some(log) = out.cmake_log {
            record.cmake_log = log;
        }
        if let Some(log) = out.build_log {
            record.build_log = log;
        }
        if let Some(log) = out.install_log {
            record.install_log = log;
        }
        if let Some(warns) = out.warns {
            record.warns = warns;
        }
        if let Some(errors) = out.errors {
            record.errors = errors;
        }
        record.nwarns = out.nwarns;
        record.nerrors = out.nerrors;
    }

    /// A job's test step runs only when it exists, has not run yet, and
    /// the build step finished cleanly with zero compile errors.
    pub fn job_can_test(&self, job_id: usize) -> bool {
        let Some(job) = self.jobs.get(job_id) else {
            return false;
        };
        let Some(tstep) = job.step(Step::Test) else {
            return false;
        };
        if tstep.event.is_done() {
            return false;
        }
        let Some(bstep) = job.step(Step::Build) else {
            return false;
        };
        bstep.event.is_done() && bstep.event.error_msg.is_empty() && bstep.nerrors == 0
    }

    /// Host recorded for a job by a previous partial run.
    pub fn job_host(&self, job_id: usize) -> Option<&str> {
        let hostname = self.jobs.get(job_id)?.hostname.as_str();
        if hostname.is_empty() {
            None
        } else {
            Some(hostname)
        }
    }

    fn blocks_jobs(&self, event: &Event) -> bool {
        if !event.is_done() {
            return true;
        }
        // Work finished in the running loop blocks jobs until the next
        // loop; everything must have settled in a previous one.
        event.loop_id == Some(self.loop_id)
    }

    /// Jobs can start only when every staging prerequisite terminated in
    /// a previous loop.
    pub fn can_start_jobs(&self, doc_repo_vers: Option<u32>) -> bool {
        if self.targets.iter().any(|t| self.blocks_jobs(&t.event)) {
            return false;
        }
        if self.tests.iter().any(|t| self.blocks_jobs(&t.event)) {
            return false;
        }
        if self.blocks_jobs(&self.build_file) || self.blocks_jobs(&self.src_tar) {
            return false;
        }
        if let Some(vers) = doc_repo_vers {
            match self.docs.iter().find(|d| d.doc_repo_vers == vers) {
                Some(doc) => {
                    if self.blocks_jobs(&doc.event) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Make sure every workflow job has a report record.
    pub fn ensure_jobs(&mut self, jobs: &[Job], with_tests: bool) {
        for job in jobs {
            if self.jobs.iter().any(|j| j.name == job.name) {
                continue;
            }
            let mut steps = vec![StepRecord {
                name: Step::Build.as_str().to_string(),
                ..StepRecord::default()
            }];
            if with_tests {
                steps.push(StepRecord {
                    name: Step::Test.as_str().to_string(),
                    ..StepRecord::default()
                });
            }
            self.jobs.push(JobRecord {
                priority: job.priority,
                name: job.name.clone(),
                hostname: String::new(),
                generator: job.generator.clone(),
                steps,
            });
        }
    }

    /// Pending jobs of the smallest priority tier that still has any.
    /// The scheduler handles one tier per loop.
    pub fn select_jobs(&mut self, jobs: &[Job], with_tests: bool) -> Vec<SelectedJob> {
        self.ensure_jobs(jobs, with_tests);

        let mut selected = Vec::new();
        for priority in 1..=nb_core::MAX_PRIORITY {
            for (idx, job) in jobs.iter().enumerate() {
                if job.priority != priority {
                    continue;
                }
                let Some(id) = self.jobs.iter().position(|j| j.name == job.name) else {
                    continue;
                };
                if !self.jobs[id].is_done() {
                    selected.push(SelectedJob { job: idx, id });
                }
            }
            if !selected.is_empty() {
                break;
            }
        }
        selected
    }

    /// Select every job whose name matches `pattern`, ignoring done-ness.
    /// Matched steps are re-initialised so they run again this loop.
    pub fn force_jobs(
        &mut self,
        pattern: &Regex,
        jobs: &[Job],
        with_tests: bool,
    ) -> Vec<SelectedJob> {
        self.ensure_jobs(jobs, with_tests);

        let mut selected = Vec::new();
        let loop_id = self.loop_id;
        for (idx, job) in jobs.iter().enumerate() {
            if !pattern.is_match(&job.name) {
                continue;
            }
            let Some(id) = self.jobs.iter().position(|j| j.name == job.name) else {
                continue;
            };
            for step in &mut self.jobs[id].steps {
                step.event.begin(loop_id, Utc::now());
            }
            selected.push(SelectedJob { job: idx, id });
        }
        selected
    }

    /* ------------------------------- page ------------------------------ */

    /// Number of tasks that terminated in a loop, for the loop tables.
    pub fn tasks_in_loop(&self, loop_id: u32) -> u32 {
        let id = Some(loop_id);
        let mut n = 0;
        n += self.targets.iter().filter(|t| t.event.loop_id == id).count();
        n += self.tests.iter().filter(|t| t.event.loop_id == id).count();
        n += self.docs.iter().filter(|d| d.event.loop_id == id).count();
        n += self
            .jobs
            .iter()
            .filter(|j| j.steps.first().map_or(false, |s| s.event.loop_id == id))
            .count();
        if self.build_file.loop_id == id {
            n += 1;
        }
        if self.src_tar.loop_id == id {
            n += 1;
        }
        n as u32
    }

    /// Jobs whose build step has completed at least once.
    pub fn jobs_done(&self) -> u32 {
        self.jobs.iter().filter(|j| j.is_done()).count() as u32
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
