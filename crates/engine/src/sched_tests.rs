// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn task(job: usize, id: usize, runner: Option<usize>) -> Task {
    Task {
        sjob: SelectedJob { job, id },
        runner,
        state: TaskState::Pending,
    }
}

#[test]
fn take_for_picks_first_pending_of_own_runner() {
    let queue = TaskQueue::new(vec![
        task(0, 0, Some(1)),
        task(1, 1, Some(0)),
        task(2, 2, Some(0)),
    ]);

    let (index, sjob) = queue.take_for(0).unwrap();
    assert_eq!(index, 1);
    assert_eq!(sjob.job, 1);

    // The running task is not handed out again
    let (index, sjob) = queue.take_for(0).unwrap();
    assert_eq!(index, 2);
    assert_eq!(sjob.job, 2);
    assert!(queue.take_for(0).is_none());
}

#[test]
fn workers_are_not_interchangeable() {
    let queue = TaskQueue::new(vec![task(0, 0, Some(0)), task(1, 1, Some(1))]);

    let (index, _) = queue.take_for(1).unwrap();
    assert_eq!(index, 1);
    // Runner 1 has nothing else, even though runner 0's task is pending
    assert!(queue.take_for(1).is_none());
    assert_eq!(queue.pending(), 1);
}

#[test]
fn finish_flips_to_done() {
    let queue = TaskQueue::new(vec![task(0, 0, Some(0))]);
    let (index, _) = queue.take_for(0).unwrap();
    queue.finish(index);

    let tasks = queue.snapshot();
    assert_eq!(tasks[0].state, TaskState::Done);
    assert!(queue.take_for(0).is_none());
}

#[test]
fn unassigned_tasks_are_never_picked_up() {
    let queue = TaskQueue::new(vec![task(0, 0, None), task(1, 1, Some(0))]);

    let (index, _) = queue.take_for(0).unwrap();
    assert_eq!(index, 1);
    queue.finish(index);

    // The task without a runner stays pending across the whole loop
    assert_eq!(queue.pending(), 1);
    assert_eq!(queue.snapshot()[0].state, TaskState::Pending);
}

#[test]
fn fail_all_for_drains_a_runner() {
    let queue = TaskQueue::new(vec![
        task(0, 0, Some(0)),
        task(1, 1, Some(0)),
        task(2, 2, Some(1)),
    ]);

    let failed = queue.fail_all_for(0);
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].id, 0);
    assert_eq!(failed[1].id, 1);

    // The other runner's task is untouched
    assert!(queue.take_for(0).is_none());
    assert!(queue.take_for(1).is_some());
}

#[test]
fn every_task_is_executed_exactly_once() {
    let queue = TaskQueue::new(vec![
        task(0, 0, Some(0)),
        task(1, 1, Some(0)),
        task(2, 2, Some(1)),
    ]);

    let mut seen = Vec::new();
    for runner in [0usize, 1] {
        while let Some((index, sjob)) = queue.take_for(runner) {
            seen.push(sjob.id);
            queue.finish(index);
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(queue.pending(), 0);
}
