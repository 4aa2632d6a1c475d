// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host credentials and platform tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Operating system of a network node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
}

impl Platform {
    /// True for Linux and macOS targets.
    pub fn is_posix(self) -> bool {
        !matches!(self, Platform::Windows)
    }

    /// Normalise path separators for this platform.
    pub fn path(self, raw: &str) -> String {
        match self {
            Platform::Windows => raw.replace('/', "\\"),
            Platform::Linux | Platform::Macos => raw.replace('\\', "/"),
        }
    }

    /// Shell statement separator (`&` on Windows, `;` on POSIX).
    pub fn cmd_sep(self) -> &'static str {
        match self {
            Platform::Windows => "&",
            Platform::Linux | Platform::Macos => ";",
        }
    }

    /// Quote character for commands executed on this platform.
    pub fn quote(self) -> char {
        match self {
            Platform::Windows => '"',
            Platform::Linux | Platform::Macos => '\'',
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Linux => write!(f, "linux"),
            Platform::Macos => write!(f, "macos"),
        }
    }
}

/// Credentials and reachability for one network node.
///
/// `localhost` is re-evaluated once at startup against the coordinator's
/// own addresses; a local login shells out directly instead of over SSH.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub ip: String,
    pub user: String,
    pub pass: String,
    pub platform: Platform,
    #[serde(default)]
    pub localhost: bool,
    #[serde(default)]
    pub use_sshpass: bool,
}

impl Login {
    /// Re-evaluate the `localhost` flag against the coordinator addresses.
    pub fn refresh_localhost(&mut self, local_ips: &[Ipv4Addr]) {
        if self.ip == "localhost" {
            self.localhost = true;
            return;
        }

        self.localhost = match self.ip.parse::<Ipv4Addr>() {
            Ok(ip) => local_ips.contains(&ip),
            Err(_) => false,
        };
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
