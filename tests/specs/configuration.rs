//! Network and workflow files parse, validate, and round-trip.

use nb_core::{host_index, match_job, Network, Workflow};

const NETWORK: &str = r#"{
    "drive": {
        "name": "store",
        "path": "/data/ci",
        "login": {"ip": "10.0.0.10", "user": "ci", "pass": "s", "platform": "linux", "use_sshpass": true}
    },
    "hosts": [
        {
            "name": "ubuntu",
            "workpath": "/home/ci/build",
            "type": "metal",
            "login": {"ip": "10.0.0.11", "user": "ci", "pass": "s", "platform": "linux", "use_sshpass": true},
            "generators": ["Unix Makefiles", "Ninja"],
            "tags": ["x64", "ubuntu"]
        },
        {
            "name": "win11",
            "workpath": "c:/ci/build",
            "type": "vbox",
            "vbox_uuid": "0aa3c1de-5b81-4d6e-9f10-222233334444",
            "vbox_host": "ubuntu",
            "login": {"ip": "10.0.0.12", "user": "ci", "pass": "s", "platform": "windows"},
            "generators": ["Visual Studio 17 2022"],
            "tags": ["x64", "msvc2022"]
        }
    ]
}"#;

const WORKFLOW: &str = r#"{
    "global": {
        "project": "Proj",
        "description": "Cross-platform SDK",
        "start_year": 2015,
        "author": "Someone",
        "license": ["MIT Licence"],
        "flowid": "proj_flow",
        "repo_url": "svn://10.0.0.10/svn/PROJ",
        "repo_branch": "trunk",
        "repo_user": "ci",
        "repo_pass": "s"
    },
    "version": "prj/version.txt",
    "build": "prj/build.txt",
    "ignore": ["\\.bak$"],
    "sources": [{"name": "src", "legal": true}],
    "tests": [{"name": "test", "exec": "alltests"}],
    "jobs": [
        {"priority": 1, "name": "debug-x64", "config": "Debug", "generator": "Unix Makefiles", "tags": ["x64", "ubuntu"]},
        {"priority": 2, "name": "msvc-release", "config": "Release", "generator": "Visual Studio 17 2022", "tags": ["x64", "msvc2022"]}
    ]
}"#;

#[test]
fn network_file_loads_and_validates() {
    let network: Network = serde_json::from_str(NETWORK).unwrap();
    assert!(network.validate().is_ok());
    assert_eq!(network.hosts.len(), 2);
    assert_eq!(host_index(&network.hosts, "win11"), Some(1));
}

#[test]
fn workflow_file_loads_and_validates() {
    let mut workflow: Workflow = serde_json::from_str(WORKFLOW).unwrap();
    workflow.validate().unwrap();
    assert_eq!(workflow.jobs[1].id, 1);
    assert!(workflow.with_test_execs());
}

#[test]
fn jobs_match_declared_hosts() {
    let network: Network = serde_json::from_str(NETWORK).unwrap();
    let mut workflow: Workflow = serde_json::from_str(WORKFLOW).unwrap();
    workflow.validate().unwrap();

    // Each job lands on the host carrying its generator and tags
    assert_eq!(match_job(&network.hosts, &workflow.jobs[0]), Some(0));
    assert_eq!(match_job(&network.hosts, &workflow.jobs[1]), Some(1));

    // A job demanding an absent tag matches nothing
    let mut job = workflow.jobs[0].clone();
    job.tags.push("arm64".to_string());
    assert_eq!(match_job(&network.hosts, &job), None);
}

#[test]
fn localhost_flag_follows_coordinator_addresses() {
    let mut network: Network = serde_json::from_str(NETWORK).unwrap();
    network.refresh_localhost(&["10.0.0.11".parse().unwrap()]);
    assert!(!network.drive.login.localhost);
    assert!(network.hosts[0].login.localhost);
    assert!(!network.hosts[1].login.localhost);
}
