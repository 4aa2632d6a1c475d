// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner scheduler: one worker per matched host, a shared task list.

use crate::boot::{self, BootState};
use crate::builder;
use crate::SharedReport;
use nb_core::{host_index, match_job, Network, SelectedJob, Workflow, WorkPaths};
use nb_report::{log_state, EventKey, Step};
use nb_remote::ssh;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Task lifecycle inside one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
}

/// One selected job bound to the runner that will execute it. A task
/// without a runner is never picked up; its pending state carries into
/// the next loop as a visible "no host" condition.
#[derive(Debug, Clone)]
pub struct Task {
    pub sjob: SelectedJob,
    pub runner: Option<usize>,
    pub state: TaskState,
}

/// The mutex-guarded task list. Workers hold the lock only across one
/// state flip; each runner sees its own tasks in FIFO order and every
/// task is executed by exactly one worker.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl TaskQueue {
    pub fn new(tasks: Vec<Task>) -> TaskQueue {
        TaskQueue {
            tasks: Mutex::new(tasks),
        }
    }

    /// First pending task assigned to `runner`, flipped to running.
    pub fn take_for(&self, runner: usize) -> Option<(usize, SelectedJob)> {
        let mut tasks = self.tasks.lock();
        for (i, task) in tasks.iter_mut().enumerate() {
            debug_assert!(!(task.state == TaskState::Running && task.runner == Some(runner)));
            if task.state == TaskState::Pending && task.runner == Some(runner) {
                task.state = TaskState::Running;
                return Some((i, task.sjob));
            }
        }
        None
    }

    /// Flip a running task to done.
    pub fn finish(&self, index: usize) {
        let mut tasks = self.tasks.lock();
        debug_assert_eq!(tasks[index].state, TaskState::Running);
        tasks[index].state = TaskState::Done;
    }

    /// Mark every pending task of a runner done, returning their jobs.
    /// Used when the runner could not be booted.
    pub fn fail_all_for(&self, runner: usize) -> Vec<SelectedJob> {
        let mut tasks = self.tasks.lock();
        let mut failed = Vec::new();
        for task in tasks.iter_mut() {
            if task.state == TaskState::Pending && task.runner == Some(runner) {
                task.state = TaskState::Done;
                failed.push(task.sjob);
            }
        }
        failed
    }

    /// Tasks that never got a runner and stayed pending.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|t| t.state == TaskState::Pending)
            .count()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }
}

/// Everything a worker needs for its loop, shared immutably.
pub(crate) struct SchedCtx {
    pub network: Network,
    pub workflow: Workflow,
    pub wpaths: WorkPaths,
    pub repo_vers: u32,
}

fn priority_of(ctx: &SchedCtx, seljobs: &[SelectedJob]) -> u32 {
    seljobs
        .first()
        .map(|s| ctx.workflow.jobs[s.job].priority)
        .unwrap_or(0)
}

/// Pull the staged tarballs from the drive to the coordinator once;
/// each worker then distributes the local copy to its host.
async fn prepare_packages(ctx: &SchedCtx, with_build_tasks: bool) -> bool {
    let drive = &ctx.network.drive.login;
    let wpaths = &ctx.wpaths;
    let tmp = wpaths.tmp_path.to_string_lossy();

    if with_build_tasks {
        let tarpath = wpaths.tmp_path.join(nb_core::SRC_TAR);
        if !tarpath.exists()
            && !ssh::copy(
                Some(drive),
                &wpaths.drive_path,
                nb_core::SRC_TAR,
                None,
                &tmp,
                nb_core::SRC_TAR,
            )
            .await
        {
            error!(
                "Error copying '{}' from '{}'",
                nb_core::SRC_TAR,
                wpaths.drive_path
            );
            return false;
        }
    }

    if ctx.workflow.with_test_execs() {
        let tarpath = wpaths.tmp_path.join(nb_core::TEST_TAR);
        if !tarpath.exists()
            && !ssh::copy(
                Some(drive),
                &wpaths.drive_path,
                nb_core::TEST_TAR,
                None,
                &tmp,
                nb_core::TEST_TAR,
            )
            .await
        {
            error!(
                "Error copying '{}' from '{}'",
                nb_core::TEST_TAR,
                wpaths.drive_path
            );
            return false;
        }
    }

    true
}

async fn run_build_step(
    ctx: &SchedCtx,
    runner_id: usize,
    host_idx: usize,
    sjob: SelectedJob,
    report: &SharedReport,
) {
    let host = &ctx.network.hosts[host_idx];
    let job = &ctx.workflow.jobs[sjob.job];
    let key = EventKey::Job(sjob.id, Step::Build);

    let state = report.lock().state(key);
    if state.done {
        return;
    }

    report.lock().begin(key);
    info!(
        "Runner [{}] '{}' beginning job [{}] '{}'",
        runner_id, host.name, sjob.id, job.name
    );

    let flowid = &ctx.workflow.global.flowid;
    let result = builder::run_build(
        host,
        &ctx.network.drive,
        job,
        &ctx.wpaths,
        flowid,
        runner_id,
    )
    .await;

    let state = {
        let mut rep = report.lock();
        rep.finish(key, result.ok, result.error_msg);
        rep.step_output(sjob.id, Step::Build, &host.name, result.output);
        rep.state(key)
    };
    info!(
        "Runner [{}] '{}' complete job [{}] '{}'",
        runner_id, host.name, sjob.id, job.name
    );
    log_state(&state, &format!("Job '{}'", job.name));
}

async fn run_test_step(
    ctx: &SchedCtx,
    runner_id: usize,
    host_idx: usize,
    sjob: SelectedJob,
    report: &SharedReport,
) {
    let host = &ctx.network.hosts[host_idx];
    let job = &ctx.workflow.jobs[sjob.job];
    let key = EventKey::Job(sjob.id, Step::Test);

    report.lock().begin(key);
    info!(
        "Runner [{}] '{}' beginning test [{}] '{}'",
        runner_id, host.name, sjob.id, job.name
    );

    let flowid = &ctx.workflow.global.flowid;
    let result = builder::run_test(
        host,
        job,
        &ctx.workflow.tests,
        &ctx.wpaths,
        flowid,
        runner_id,
    )
    .await;

    let state = {
        let mut rep = report.lock();
        rep.finish(key, result.ok, result.error_msg);
        rep.step_output(sjob.id, Step::Test, &host.name, result.output);
        rep.state(key)
    };
    info!(
        "Runner [{}] '{}' complete test [{}] '{}'",
        runner_id, host.name, sjob.id, job.name
    );
    log_state(&state, &format!("Test '{}'", job.name));
}

/// One runner's worker: boot the host, drain its tasks, shut it down.
async fn worker(
    ctx: Arc<SchedCtx>,
    runner_id: usize,
    host_idx: usize,
    queue: Arc<TaskQueue>,
    report: SharedReport,
) {
    let host = &ctx.network.hosts[host_idx];
    info!(
        "Runner [{}] '{}' booting '{}'",
        runner_id, host.name, host.login.ip
    );

    let (ok, state) = boot::boot(host, &ctx.network.hosts).await;
    if !ok {
        error!(
            "Runner [{}] '{}' cannot be booted '{}::{}'",
            runner_id, host.name, host.login.ip, state
        );
        // The builds are not attempted; the failure lands on every
        // assigned task and the next loop retries them.
        let msg = format!("cannot boot host '{}' ({})", host.name, state);
        for sjob in queue.fail_all_for(runner_id) {
            report.lock().mark_error(EventKey::Job(sjob.id, Step::Build), &msg);
        }
        return;
    }

    while let Some((index, sjob)) = queue.take_for(runner_id) {
        run_build_step(&ctx, runner_id, host_idx, sjob, &report).await;
        if report.lock().job_can_test(sjob.id) {
            run_test_step(&ctx, runner_id, host_idx, sjob, &report).await;
        }
        queue.finish(index);
    }

    if boot::shutdown(host, state).await {
        info!("Runner [{}] '{}' shutting down", runner_id, host.name);
    }
}

/// Run the selected jobs: match each to a runner, spawn one worker per
/// runner, and wait for all of them to drain their tasks.
pub(crate) async fn start(ctx: Arc<SchedCtx>, seljobs: &[SelectedJob], report: SharedReport) {
    info!("Beginning jobs with {} priority", priority_of(&ctx, seljobs));
    for (i, sjob) in seljobs.iter().enumerate() {
        info!("[{}] '{}'", i, ctx.workflow.jobs[sjob.job].name);
    }

    // Runner list: one entry per distinct host, identified by index
    let mut runner_hosts: Vec<usize> = Vec::new();
    let mut tasks = Vec::new();

    for sjob in seljobs {
        let job = &ctx.workflow.jobs[sjob.job];
        let hosts = &ctx.network.hosts;

        // A host recorded by a previous partial run wins over rematching
        let pinned = report.lock().job_host(sjob.id).map(str::to_string);
        let host_idx = match pinned {
            Some(name) => host_index(hosts, &name),
            None => match_job(hosts, job),
        };

        let runner = host_idx.map(|idx| {
            if let Some(pos) = runner_hosts.iter().position(|h| *h == idx) {
                pos
            } else {
                runner_hosts.push(idx);
                runner_hosts.len() - 1
            }
        });

        if runner.is_none() {
            warn!("No host capable of job '{}'", job.name);
        }

        tasks.push(Task {
            sjob: *sjob,
            runner,
            state: TaskState::Pending,
        });
    }

    if runner_hosts.is_empty() {
        error!("No work can be started, as there is no host capable of doing so");
        return;
    }

    if !prepare_packages(&ctx, !tasks.is_empty()).await {
        return;
    }

    let queue = Arc::new(TaskQueue::new(tasks));
    let mut handles = Vec::new();
    for (runner_id, host_idx) in runner_hosts.iter().enumerate() {
        let ctx = Arc::clone(&ctx);
        let queue = Arc::clone(&queue);
        let report = Arc::clone(&report);
        let host_idx = *host_idx;
        handles.push(tokio::spawn(async move {
            worker(ctx, runner_id, host_idx, queue, report).await;
        }));
    }

    for handle in handles {
        if handle.await.is_err() {
            error!("runner worker aborted");
        }
    }

    let unassigned = queue.pending();
    if unassigned > 0 {
        warn!("{} task(s) without a capable host stay pending", unassigned);
    }
}

#[cfg(test)]
#[path = "sched_tests.rs"]
mod tests;
