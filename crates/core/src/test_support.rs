// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders for other crates' tests.

use crate::login::{Login, Platform};
use crate::network::{Drive, Host, HostKind, Network};
use crate::workflow::{Global, Job, Target, Workflow};

pub fn linux_login(ip: &str) -> Login {
    Login {
        ip: ip.to_string(),
        user: "ci".to_string(),
        pass: "secret".to_string(),
        platform: Platform::Linux,
        localhost: false,
        use_sshpass: true,
    }
}

pub fn host(name: &str, generators: &[&str], tags: &[&str]) -> Host {
    Host {
        name: name.to_string(),
        workpath: "/home/ci/build".to_string(),
        kind: HostKind::Metal,
        vbox_uuid: String::new(),
        vbox_host: String::new(),
        utm_uuid: String::new(),
        utm_host: String::new(),
        vmware_path: String::new(),
        vmware_host: String::new(),
        macos_host: String::new(),
        macos_volume: String::new(),
        mingw_path: String::new(),
        login: linux_login("10.0.0.11"),
        generators: generators.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn job(name: &str, priority: u32, generator: &str, tags: &[&str]) -> Job {
    Job {
        id: 0,
        priority,
        name: name.to_string(),
        config: "Debug".to_string(),
        generator: generator.to_string(),
        opts: String::new(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn target(name: &str) -> Target {
    Target {
        name: name.to_string(),
        dest: String::new(),
        url: String::new(),
        exec: String::new(),
        legal: false,
        format: true,
        analyzer: false,
        repo_vers: None,
    }
}

pub fn network(hosts: Vec<Host>) -> Network {
    Network {
        drive: Drive {
            name: "store".to_string(),
            path: "/data/ci".to_string(),
            login: linux_login("10.0.0.10"),
        },
        hosts,
    }
}

pub fn workflow(jobs: Vec<Job>) -> Workflow {
    Workflow {
        global: Global {
            project: "Proj".to_string(),
            flowid: "flow".to_string(),
            repo_url: "svn://10.0.0.10/svn/PROJ".to_string(),
            repo_branch: "trunk".to_string(),
            ..Global::default()
        },
        version: "prj/version.txt".to_string(),
        build: "prj/build.txt".to_string(),
        ignore: Vec::new(),
        sources: vec![target("src")],
        tests: Vec::new(),
        jobs,
    }
}
