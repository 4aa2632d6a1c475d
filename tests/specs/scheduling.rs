//! Scheduler task discipline and boot-state driven behavior.

use nb_core::SelectedJob;
use nb_engine::boot::{shutdownable, BootState, VmKind};
use nb_engine::{Task, TaskQueue, TaskState};

fn task(id: usize, runner: Option<usize>) -> Task {
    Task {
        sjob: SelectedJob { job: id, id },
        runner,
        state: TaskState::Pending,
    }
}

/// Two runners drain a shared list; each executes only its own tasks,
/// in FIFO order, and every assigned task terminates done.
#[test]
fn runners_drain_their_own_tasks() {
    let queue = TaskQueue::new(vec![
        task(0, Some(0)),
        task(1, Some(1)),
        task(2, Some(0)),
        task(3, None),
    ]);

    let mut runner0 = Vec::new();
    while let Some((index, sjob)) = queue.take_for(0) {
        runner0.push(sjob.id);
        queue.finish(index);
    }
    assert_eq!(runner0, vec![0, 2]);

    let mut runner1 = Vec::new();
    while let Some((index, sjob)) = queue.take_for(1) {
        runner1.push(sjob.id);
        queue.finish(index);
    }
    assert_eq!(runner1, vec![1]);

    // The unassigned task remains pending: a visible "no host" condition
    assert_eq!(queue.pending(), 1);
    let snapshot = queue.snapshot();
    assert_eq!(snapshot[3].state, TaskState::Pending);
    for t in &snapshot[..3] {
        assert_eq!(t.state, TaskState::Done);
    }
}

/// A runner that cannot boot surrenders all its tasks at once; tasks
/// of other runners are unaffected.
#[test]
fn boot_failure_drains_only_that_runner() {
    let queue = TaskQueue::new(vec![task(0, Some(0)), task(1, Some(0)), task(2, Some(1))]);

    let failed = queue.fail_all_for(0);
    assert_eq!(failed.len(), 2);
    assert!(queue.take_for(0).is_none());

    let (index, sjob) = queue.take_for(1).unwrap();
    assert_eq!(sjob.id, 2);
    queue.finish(index);
    assert_eq!(queue.pending(), 0);
}

/// Shutdown policy: only virtualised hosts this coordinator woke are
/// ever shut down.
#[test]
fn shutdown_follows_boot_state() {
    for kind in [VmKind::Vbox, VmKind::Utm, VmKind::Vmware] {
        assert!(shutdownable(BootState::WakeUp(kind)));
        assert!(shutdownable(BootState::Timeout(kind)));
        assert!(!shutdownable(BootState::ParentDown(kind)));
        assert!(!shutdownable(BootState::ParentSsh(kind)));
        assert!(!shutdownable(BootState::ParentTool(kind)));
    }

    assert!(!shutdownable(BootState::AlreadyRunning));
    assert!(!shutdownable(BootState::Unreachable));
    assert!(!shutdownable(BootState::MacosWakeUp));
    assert!(!shutdownable(BootState::MacosNotBootable));
}

/// Boot failures carry the stable state name into task error messages.
#[test]
fn boot_states_have_stable_names() {
    assert_eq!(
        BootState::ParentTool(VmKind::Vbox).to_string(),
        "VBOX_HOST_VBOXMANAGE"
    );
    assert_eq!(BootState::Timeout(VmKind::Utm).to_string(), "UTM_TIMEOUT");
    assert_eq!(
        BootState::WakeUp(VmKind::Vmware).to_string(),
        "VMWARE_WAKE_UP"
    );
}
