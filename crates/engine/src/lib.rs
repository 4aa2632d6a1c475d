// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration engine: host lifecycle, target staging, the runner
//! scheduler, the build/test driver, and the top-level CI loop.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod boot;
mod builder;
mod docs;
mod flow;
mod sched;
mod stage;
mod webrep;

pub use flow::{run, FlowError};
pub use sched::{Task, TaskQueue, TaskState};

use nb_report::Report;
use parking_lot::Mutex;
use std::sync::Arc;

/// The report shared between the coordinator and runner workers.
/// Workers hold the lock only across short state transitions, never
/// across remote calls.
pub type SharedReport = Arc<Mutex<Report>>;
