// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived work paths for one flow and repository revision.

use crate::network::Drive;
use std::path::{Path, PathBuf};

/// Full set of directories a loop works with: coordinator-local staging
/// trees and drive-side storage roots. Every drive-side path embeds the
/// repository revision so different revisions cannot collide.
#[derive(Debug, Clone)]
pub struct WorkPaths {
    /// Coordinator staging root `<tmp>/<flowid>`.
    pub tmp_path: PathBuf,
    /// Source staging tree `<tmp>/<flowid>/src`.
    pub tmp_src: PathBuf,
    /// Test staging tree `<tmp>/<flowid>/test`.
    pub tmp_test: PathBuf,
    /// Documentation generator output `<tmp>/<flowid>/ndoc_out`.
    pub tmp_ndoc: PathBuf,
    /// Report website working tree `<tmp>/<flowid>/ndoc_rep`.
    pub tmp_nrep: PathBuf,
    /// Drive storage root `<drive>/<flowid>/r<vers>`.
    pub drive_path: String,
    /// Drive reports and logs `<drive>/<flowid>/r<vers>/inf`.
    pub drive_inf: String,
    /// Drive documentation `<drive>/<flowid>-DOC/r<docvers>`, when docs
    /// are configured.
    pub drive_doc: Option<String>,
    /// Drive report sources `<drive>/<flowid>-REP`.
    pub drive_rep: String,
    /// Drive report websites `<drive>/<flowid>-REPWEB/r<vers>`.
    pub drive_rep_web: String,
}

impl WorkPaths {
    pub fn new(
        drive: &Drive,
        tmp_root: &Path,
        flowid: &str,
        repo_vers: u32,
        doc_repo_vers: Option<u32>,
    ) -> WorkPaths {
        let tmp_path = tmp_root.join(flowid);
        let tmp_src = tmp_path.join("src");
        let tmp_test = tmp_path.join("test");
        let tmp_ndoc = tmp_path.join("ndoc_out");
        let tmp_nrep = tmp_path.join("ndoc_rep");

        // The drive is a Linux node; its paths are '/'-joined strings.
        let drive_path = format!("{}/{}/r{}", drive.path, flowid, repo_vers);
        let drive_inf = format!("{}/inf", drive_path);
        let drive_doc =
            doc_repo_vers.map(|v| format!("{}/{}-DOC/r{}", drive.path, flowid, v));
        let drive_rep = format!("{}/{}-REP", drive.path, flowid);
        let drive_rep_web = format!("{}/{}-REPWEB/r{}", drive.path, flowid, repo_vers);

        WorkPaths {
            tmp_path,
            tmp_src,
            tmp_test,
            tmp_ndoc,
            tmp_nrep,
            drive_path,
            drive_inf,
            drive_doc,
            drive_rep,
            drive_rep_web,
        }
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
