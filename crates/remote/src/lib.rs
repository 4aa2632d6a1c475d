// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform command execution on local and remote nodes.
//!
//! Every other crate reaches the network through this one: local shell
//! commands, SSH/SCP against runner hosts and the drive, the build-tool
//! drivers (configure/build/install/tar), and the repository client.
//!
//! Failure semantics: operations return booleans, options, or return
//! codes — never panics. Stderr is captured and, when it carries more
//! than noise, appended to the returned log under a `stderr:` marker.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cmake;
mod exec;
mod ips;
pub mod repo;
pub mod ssh;

pub use exec::{run_filtered, run_shell, CmdOutput};
pub use ips::local_ips;
