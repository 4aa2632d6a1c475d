// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess execution with stream capture.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured outcome of one shell command.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// Process exit code; `-1` when the process could not be spawned or
    /// was killed by a signal.
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    pub fn ok(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stdout with non-trivial stderr appended under a marker.
    pub fn merged_text(&self) -> String {
        let mut text = self.stdout_text();
        if self.stderr.len() > 10 {
            text.push_str("\nstderr:\n");
            text.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        text
    }

    /// The executed command line followed by the merged streams, as
    /// stored in build logs.
    pub fn logged(&self, cmd: &str) -> String {
        format!("{}\n\n{}", cmd, self.merged_text())
    }

    fn spawn_failure(err: std::io::Error) -> CmdOutput {
        CmdOutput {
            code: -1,
            stdout: Vec::new(),
            stderr: err.to_string().into_bytes(),
        }
    }
}

fn shell_command(cmd: &str) -> Command {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c");
        c
    };
    command.arg(cmd);
    command
}

/// Run a shell command, capturing both streams. Blocks the caller only.
pub async fn run_shell(cmd: &str) -> CmdOutput {
    match shell_command(cmd).output().await {
        Ok(output) => CmdOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        },
        Err(err) => CmdOutput::spawn_failure(err),
    }
}

/// Run a filter command: stream `input` into its stdin and return its
/// stdout. `None` when the filter could not run or failed.
pub async fn run_filtered(cmd: &str, input: &[u8]) -> Option<Vec<u8>> {
    let mut child = shell_command(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).await.ok()?;
    }

    let output = child.wait_with_output().await.ok()?;
    if output.status.success() {
        Some(output.stdout)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
