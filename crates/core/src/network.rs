// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build network description: the shared drive and the runner hosts.

use crate::login::{Login, Platform};
use crate::macos::MacosVersion;
use crate::workflow::Job;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

/// The shared storage node. Must be a Linux machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub name: String,
    pub path: String,
    pub login: Login,
}

/// How a runner host is powered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    /// Physical machine, cannot be powered on remotely.
    Metal,
    /// VirtualBox guest started from a parent host.
    Vbox,
    /// UTM guest started from a parent macOS host.
    Utm,
    /// VMware guest started from a parent macOS host.
    Vmware,
    /// macOS boot volume blessed from another volume of the same Mac.
    Macos,
}

/// A runner host descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub workpath: String,
    #[serde(rename = "type")]
    pub kind: HostKind,
    #[serde(default)]
    pub vbox_uuid: String,
    #[serde(default)]
    pub vbox_host: String,
    #[serde(default)]
    pub utm_uuid: String,
    #[serde(default)]
    pub utm_host: String,
    #[serde(default)]
    pub vmware_path: String,
    #[serde(default)]
    pub vmware_host: String,
    #[serde(default)]
    pub macos_host: String,
    #[serde(default)]
    pub macos_volume: String,
    #[serde(default)]
    pub mingw_path: String,
    pub login: Login,
    #[serde(default)]
    pub generators: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Host {
    /// Whether this host can run `job`: it must list the job's generator
    /// and carry every tag the job requires.
    pub fn matches_job(&self, job: &Job) -> bool {
        if !self.generators.iter().any(|g| g == &job.generator) {
            return false;
        }

        job.tags
            .iter()
            .all(|tag| self.tags.iter().any(|htag| htag == tag))
    }

    /// The macOS release advertised by this host's tags, for macOS hosts.
    pub fn macos_version(&self) -> Option<MacosVersion> {
        if self.login.platform != Platform::Macos {
            return None;
        }
        MacosVersion::from_tags(&self.tags)
    }
}

/// Index of the host with the given name.
pub fn host_index(hosts: &[Host], name: &str) -> Option<usize> {
    hosts.iter().position(|h| h.name == name)
}

/// First host in declared order capable of running `job`.
pub fn match_job(hosts: &[Host], job: &Job) -> Option<usize> {
    hosts.iter().position(|h| h.matches_job(job))
}

/// Errors found when validating a loaded network file.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("drive must be a linux machine")]
    DriveNotLinux,
    #[error("duplicated host '{0}'")]
    DuplicateHost(String),
}

/// The whole build network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub drive: Drive,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

impl Network {
    /// Check load-time invariants: Linux drive, unique host names.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.drive.login.platform != Platform::Linux {
            return Err(NetworkError::DriveNotLinux);
        }

        for (i, host) in self.hosts.iter().enumerate() {
            if self.hosts[i + 1..].iter().any(|h| h.name == host.name) {
                return Err(NetworkError::DuplicateHost(host.name.clone()));
            }
        }

        Ok(())
    }

    /// Re-evaluate every login's `localhost` flag.
    pub fn refresh_localhost(&mut self, local_ips: &[Ipv4Addr]) {
        self.drive.login.refresh_localhost(local_ips);
        for host in &mut self.hosts {
            host.login.refresh_localhost(local_ips);
        }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
