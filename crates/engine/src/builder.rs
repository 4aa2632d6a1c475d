// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build and test driver for one job on one runner host.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use nb_core::{Drive, Generator, Host, Job, Login, MacosVersion, Platform, Target, Vers, WorkPaths};
use nb_remote::{cmake, ssh};
use nb_report::StepOutput;
use tracing::{error, info, warn};

/// First build-tool release with `cmake --install`.
const MODERN_CMAKE: Vers = Vers::new(3, 15, 0);

/// Parallel level exported for build commands.
const BUILD_JOBS: u32 = 4;

const BUILD_WARN_TOKENS: [&str; 2] = ["warning:", "warning LNK"];
const BUILD_ERROR_TOKENS: [&str; 2] = ["error:", "error LNK"];
const TEST_WARN_TOKENS: [&str; 1] = ["[WARN]"];
const TEST_ERROR_TOKENS: [&str; 1] = ["[FAIL]"];

/// Outcome of one driver step.
#[derive(Debug, Default)]
pub struct StepResult {
    pub ok: bool,
    pub error_msg: Option<String>,
    pub output: StepOutput,
}

impl StepResult {
    fn fail(&mut self, msg: String) {
        self.ok = false;
        self.error_msg = Some(msg);
    }
}

/// Lines of `log` containing any of `tokens`, plus their count.
pub(crate) fn count_messages(log: &str, tokens: &[&str]) -> (u32, String) {
    let mut n = 0;
    let mut picked = String::new();
    for line in log.lines() {
        if tokens.iter().any(|t| line.contains(t)) {
            picked.push_str(line);
            picked.push('\n');
            n += 1;
        }
    }
    (n, picked)
}

fn has_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t == tag)
}

fn ninja_on_windows(generator: Generator, login: &Login) -> bool {
    matches!(generator, Generator::Ninja | Generator::NinjaMultiConfig)
        && login.platform == Platform::Windows
}

/// Visual Studio environment script selected by compiler and arch tags.
pub(crate) fn vcvars(tags: &[String]) -> Option<String> {
    let arch = if has_tag(tags, "x64") {
        "x64"
    } else if has_tag(tags, "x86") {
        "x86"
    } else {
        return None;
    };

    for year in ["2022", "2019", "2017", "2015", "2013", "2012", "2010"] {
        if has_tag(tags, &format!("msvc{}", year)) {
            return Some(format!("vs{}_{}_vars", year, arch));
        }
    }
    None
}

/// Environment-variable prologue for configure/build commands.
pub(crate) fn cmake_envvars(
    host: &Host,
    tags: &[String],
    generator: Generator,
    njobs: Option<u32>,
) -> String {
    let mut vars = String::new();
    let platform = host.login.platform;

    if generator == Generator::Mingw && platform == Platform::Windows {
        vars.push_str(&format!("PATH={}\\bin;%PATH%", host.mingw_path));
    }

    if let Some(njobs) = njobs {
        if !vars.is_empty() {
            vars.push_str(platform.cmd_sep());
        }
        if platform == Platform::Windows {
            vars.push_str(&format!("set CMAKE_BUILD_PARALLEL_LEVEL={}", njobs));
        } else {
            vars.push_str(&format!("export CMAKE_BUILD_PARALLEL_LEVEL={}", njobs));
        }
    }

    // Ninja on Windows needs the Visual Studio environment to find cl
    if ninja_on_windows(generator, &host.login) {
        if let Some(script) = vcvars(tags) {
            if !vars.is_empty() {
                vars.push('&');
            }
            vars.push_str(&script);
        }
    }

    vars
}

/// Configure-time options for a job.
pub(crate) fn configure_opts(job: &Job, generator: Generator, login: &Login) -> String {
    let mut opts = format!("{} ", job.opts);

    if !generator.is_multi_config() {
        opts.push_str(&format!("-DCMAKE_BUILD_TYPE={} ", job.config));
    }

    if ninja_on_windows(generator, login) {
        opts.push_str("-DCMAKE_C_COMPILER=cl -DCMAKE_CXX_COMPILER=cl ");
    }

    if generator == Generator::VisualStudio {
        if has_tag(&job.tags, "x64") {
            opts.push_str("-A x64 ");
        } else if has_tag(&job.tags, "x86") {
            opts.push_str("-A Win32 ");
        }
    }

    opts
}

/// Library-path export for running test executables.
pub(crate) fn test_envvars(host: &Host, generator: Generator, instpath: &str) -> String {
    match host.login.platform {
        Platform::Windows => {
            let mut vars = format!("PATH={}\\bin;", instpath);
            if generator == Generator::Mingw {
                vars.push_str(&format!("{}\\bin;", host.mingw_path));
            }
            vars.push_str("%PATH%");
            vars
        }
        Platform::Macos => format!(
            "export DYLD_LIBRARY_PATH={}/bin:$DYLD_LIBRARY_PATH",
            instpath
        ),
        Platform::Linux => format!("export LD_LIBRARY_PATH={}/bin:$LD_LIBRARY_PATH", instpath),
    }
}

/// Extract the make-program path printed by the discovery stub project.
pub(crate) fn make_program_from_log(log: &str, envvar: &str) -> Option<String> {
    let marker = format!("{}=", envvar);
    let start = log.find(&marker)? + marker.len();
    let rest = &log[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

/// Native install command for old build tools without `--install`.
pub(crate) fn native_install_cmd(
    generator: Generator,
    make_program: &str,
    instpath: &str,
    config: &str,
) -> Option<String> {
    match generator {
        Generator::Ninja | Generator::UnixMakefiles => {
            Some(format!("DESTDIR={} {} install", instpath, make_program))
        }
        Generator::Xcode => Some(format!(
            "DESTDIR={} {} -target install -config {}",
            instpath, make_program, config
        )),
        Generator::VisualStudio
        | Generator::NinjaMultiConfig
        | Generator::Mingw
        | Generator::Msys => None,
    }
}

/// Apple tools print a `➜` arrow that breaks downstream text encoding.
pub(crate) fn normalize_build_log(host: &Host, log: String) -> String {
    match host.macos_version() {
        Some(vers) if vers >= MacosVersion::Sonoma => log.replace('➜', "->"),
        _ => log,
    }
}

/// Concatenate two diagnostic pick-outs into one base64 blob.
pub(crate) fn unify_b64(a: &str, b: &str, na: u32, nb: u32) -> (Option<String>, u32) {
    let total = na + nb;
    let joined = match (a.is_empty(), b.is_empty()) {
        (false, false) => format!("{}\n{}", a, b),
        (false, true) => a.to_string(),
        (true, false) => b.to_string(),
        (true, true) => return (None, total),
    };
    (Some(B64.encode(joined)), total)
}

struct BuildPaths {
    flowpath: String,
    srcpath: String,
    buildpath: String,
    instpath: String,
}

fn build_paths(host: &Host, flowid: &str, job: &Job, test: bool) -> BuildPaths {
    let p = host.login.platform;
    let flowpath = p.path(&format!("{}/{}/{}", host.workpath, flowid, job.name));
    let (src, build) = if test {
        ("test", "test_build")
    } else {
        ("src", "build")
    };
    BuildPaths {
        srcpath: p.path(&format!("{}/{}", flowpath, src)),
        buildpath: p.path(&format!("{}/{}", flowpath, build)),
        instpath: p.path(&format!("{}/install", flowpath)),
        flowpath,
    }
}

async fn create_build_dirs(host: &Host, flowpath: &str, runner_id: usize) -> Result<(), String> {
    let login = &host.login;
    if !ssh::create_dir(login, &host.workpath).await {
        return Err(format!(
            "Error creating host '{}' directory '{}'",
            host.name, host.workpath
        ));
    }

    if ssh::dir_exists(login, flowpath).await && !ssh::delete_dir(login, flowpath).await {
        return Err(format!(
            "Error removing host '{}' directory '{}'",
            host.name, flowpath
        ));
    }

    if !ssh::create_dir(login, flowpath).await {
        return Err(format!(
            "Error creating host '{}' directory '{}'",
            host.name, flowpath
        ));
    }

    info!(
        "Runner [{}] '{}' created '{}' build directory",
        runner_id, host.name, flowpath
    );
    Ok(())
}

/// Push a staged tarball to the host and unpack it.
async fn fetch_package(
    host: &Host,
    wpaths: &WorkPaths,
    flowpath: &str,
    tarname: &str,
    destpath: &str,
    runner_id: usize,
) -> Result<(), String> {
    let login = &host.login;
    let tmp = wpaths.tmp_path.to_string_lossy();

    if !ssh::copy(None, &tmp, tarname, Some(login), flowpath, tarname).await {
        return Err(format!("Error copying '{}' to '{}'", tarname, flowpath));
    }

    if !ssh::create_dir(login, destpath).await {
        return Err(format!("Error creating '{}'", destpath));
    }

    let tarpath = login.platform.path(&format!("{}/{}", flowpath, tarname));
    if !cmake::untar(Some(login), destpath, &tarpath).await {
        return Err(format!(
            "Error uncompressing '{}' into '{}'",
            tarname, destpath
        ));
    }

    info!("Runner [{}] '{}' source code ready", runner_id, host.name);
    Ok(())
}

/// Discover the generator's native make program by configuring a stub
/// project whose only output is the make-program variable.
async fn discover_make_program(
    host: &Host,
    job: &Job,
    tempath: &str,
) -> Result<String, String> {
    const MAKE_ENVVAR: &str = "CMAKE_MAKE_PROGRAM";
    let login = &host.login;

    if !ssh::create_dir(login, tempath).await {
        return Err(format!(
            "Error creating host '{}' directory '{}'",
            host.name, tempath
        ));
    }

    let stub = format!("message(\"{0}=${{{0}}}\")\n", MAKE_ENVVAR);
    if !ssh::to_file(Some(login), tempath, "CMakeLists.txt", stub.as_bytes()).await {
        return Err(format!(
            "Error creating host '{}' CMakeLists.txt '{}'",
            host.name, tempath
        ));
    }

    let (ret, log) =
        cmake::configure(Some(login), "", tempath, tempath, &job.generator, "").await;
    if ret != 0 {
        return Err("Error running cmake, in make_program".to_string());
    }

    make_program_from_log(&log, MAKE_ENVVAR)
        .ok_or_else(|| format!("'{}' not found in make_program", MAKE_ENVVAR))
}

#[allow(clippy::too_many_arguments)]
async fn configure_step(
    host: &Host,
    job: &Job,
    generator: Generator,
    srcpath: &str,
    buildpath: &str,
    extra_opts: &str,
    runner_id: usize,
    result: &mut StepResult,
) -> bool {
    let login = &host.login;

    if !ssh::dir_exists(login, buildpath).await && !ssh::create_dir(login, buildpath).await {
        result.fail(format!("Error creating build dir '{}'", buildpath));
        return false;
    }

    let envvars = cmake_envvars(host, &job.tags, generator, None);
    let mut opts = configure_opts(job, generator, login);
    opts.push_str(extra_opts);

    let (ret, log) = cmake::configure(
        Some(login),
        &envvars,
        srcpath,
        buildpath,
        &job.generator,
        &opts,
    )
    .await;
    result.output.cmake_log = Some(log);

    if ret != 0 {
        result.fail("Error running cmake".to_string());
        return false;
    }

    info!("Runner [{}] '{}' cmake generate", runner_id, host.name);
    true
}

struct BuildDiag {
    ok: bool,
    warns: String,
    errors: String,
    nwarns: u32,
    nerrors: u32,
}

async fn build_step(
    host: &Host,
    job: &Job,
    generator: Generator,
    buildpath: &str,
    runner_id: usize,
    result: &mut StepResult,
) -> BuildDiag {
    let login = &host.login;
    let envvars = cmake_envvars(host, &job.tags, generator, Some(BUILD_JOBS));
    let opts = if generator.is_multi_config() {
        format!("--config {}", job.config)
    } else {
        String::new()
    };

    let (_, log) = cmake::build(Some(login), &envvars, buildpath, &opts).await;
    let log = normalize_build_log(host, log);

    let (nwarns, warns) = count_messages(&log, &BUILD_WARN_TOKENS);
    let (nerrors, errors) = count_messages(&log, &BUILD_ERROR_TOKENS);
    result.output.build_log = Some(log);

    if nerrors > 0 {
        result.fail(format!("Build with '{}' errors", nerrors));
        error!(
            "Runner [{}] '{}' build with '{}' errors",
            runner_id, host.name, nerrors
        );
    } else if nwarns > 0 {
        warn!(
            "Runner [{}] '{}' build with '{}' warnings",
            runner_id, host.name, nwarns
        );
    } else {
        info!("Runner [{}] '{}' build", runner_id, host.name);
    }

    BuildDiag {
        ok: nerrors == 0,
        warns,
        errors,
        nwarns,
        nerrors,
    }
}

#[allow(clippy::too_many_arguments)]
async fn install_step(
    host: &Host,
    job: &Job,
    generator: Generator,
    cmake_vers: Vers,
    make_program: &str,
    buildpath: &str,
    instpath: &str,
    runner_id: usize,
    result: &mut StepResult,
) -> bool {
    let login = &host.login;

    if cmake_vers >= MODERN_CMAKE {
        let opts = if generator.is_multi_config() {
            format!("--config {} --prefix {}", job.config, instpath)
        } else {
            format!("--prefix {}", instpath)
        };
        let (_, log) = cmake::install(Some(login), buildpath, &opts).await;
        result.output.install_log = Some(log);
    } else {
        let Some(cmd) = native_install_cmd(generator, make_program, instpath, &job.config)
        else {
            result.fail(format!(
                "No supported native install for '{}' generator ({})",
                job.generator, make_program
            ));
            return false;
        };
        let (_, log) = cmake::install_with(Some(login), buildpath, &cmd).await;
        result.output.install_log = Some(log);
    }

    info!("Runner [{}] '{}' installed", runner_id, host.name);
    true
}

async fn copy_install_to_drive(
    host: &Host,
    drive: &Drive,
    job: &Job,
    flowpath: &str,
    instpath: &str,
    wpaths: &WorkPaths,
    runner_id: usize,
) -> Result<(), String> {
    let login = &host.login;
    let tarname = format!("{}.tar.gz", job.name);
    let tarpath = login.platform.path(&format!("{}/{}", flowpath, tarname));

    if !cmake::tar(Some(login), instpath, &tarpath).await {
        return Err(format!("Error creating '{}'", tarpath));
    }

    if !ssh::copy(
        Some(login),
        flowpath,
        &tarname,
        Some(&drive.login),
        &wpaths.drive_path,
        &tarname,
    )
    .await
    {
        return Err(format!(
            "Error copying '{}' into '{}'",
            tarname, wpaths.drive_path
        ));
    }

    info!(
        "Runner [{}] '{}' '{}' copied into drive",
        runner_id, host.name, tarname
    );
    Ok(())
}

/// Run the build step of one job: fetch sources, configure, build,
/// install, and archive the install tree on the drive.
pub(crate) async fn run_build(
    host: &Host,
    drive: &Drive,
    job: &Job,
    wpaths: &WorkPaths,
    flowid: &str,
    runner_id: usize,
) -> StepResult {
    let mut result = StepResult {
        ok: true,
        ..StepResult::default()
    };
    let paths = build_paths(host, flowid, job, false);

    let Some(generator) = Generator::classify(&job.generator) else {
        result.fail(format!("Unknown generator '{}'", job.generator));
        return result;
    };

    if let Err(msg) = create_build_dirs(host, &paths.flowpath, runner_id).await {
        result.fail(msg);
        return result;
    }

    if let Err(msg) = fetch_package(
        host,
        wpaths,
        &paths.flowpath,
        nb_core::SRC_TAR,
        &paths.srcpath,
        runner_id,
    )
    .await
    {
        result.fail(msg);
        return result;
    }

    let cmake_vers = cmake::version(Some(&host.login)).await.unwrap_or_default();

    // Old build tools have no `--install`; discover the native make
    // program up front so the install step can fall back to it.
    let mut make_program = String::new();
    if cmake_vers < MODERN_CMAKE {
        let tempath = host
            .login
            .platform
            .path(&format!("{}/makeprog", paths.flowpath));
        match discover_make_program(host, job, &tempath).await {
            Ok(program) => make_program = program,
            Err(msg) => {
                result.fail(msg);
                return result;
            }
        }
    }

    if !configure_step(
        host,
        job,
        generator,
        &paths.srcpath,
        &paths.buildpath,
        "",
        runner_id,
        &mut result,
    )
    .await
    {
        return result;
    }

    let diag = build_step(host, job, generator, &paths.buildpath, runner_id, &mut result).await;
    result.output.warns = Some(diag.warns);
    result.output.errors = Some(diag.errors);
    result.output.nwarns = diag.nwarns;
    result.output.nerrors = diag.nerrors;
    if !diag.ok {
        return result;
    }

    if !install_step(
        host,
        job,
        generator,
        cmake_vers,
        &make_program,
        &paths.buildpath,
        &paths.instpath,
        runner_id,
        &mut result,
    )
    .await
    {
        return result;
    }

    if let Err(msg) = copy_install_to_drive(
        host,
        drive,
        job,
        &paths.flowpath,
        &paths.instpath,
        wpaths,
        runner_id,
    )
    .await
    {
        result.fail(msg);
    }

    result
}

async fn run_one_test(
    host: &Host,
    job: &Job,
    buildpath: &str,
    envvars: &str,
    exec: &str,
) -> Result<String, String> {
    let login = &host.login;
    let mut cmd = login
        .platform
        .path(&format!("{}/{}/bin/{}", buildpath, job.config, exec));
    if !envvars.is_empty() {
        cmd = format!("{}{}{}", envvars, login.platform.cmd_sep(), cmd);
    }

    let (ret, log) = cmake::run_test(Some(login), &cmd).await;
    if ret == 0 {
        Ok(log)
    } else {
        Err(format!("{}: Fatal error running test '{}'", exec, log))
    }
}

/// Run the test step of one job: fetch the test tree, build it against
/// the installed artefacts, then execute every test binary.
pub(crate) async fn run_test(
    host: &Host,
    job: &Job,
    tests: &[Target],
    wpaths: &WorkPaths,
    flowid: &str,
    runner_id: usize,
) -> StepResult {
    let mut result = StepResult {
        ok: true,
        ..StepResult::default()
    };
    let paths = build_paths(host, flowid, job, true);

    let Some(generator) = Generator::classify(&job.generator) else {
        result.fail(format!("Unknown generator '{}'", job.generator));
        return result;
    };

    if let Err(msg) = fetch_package(
        host,
        wpaths,
        &paths.flowpath,
        nb_core::TEST_TAR,
        &paths.srcpath,
        runner_id,
    )
    .await
    {
        result.fail(msg);
        return result;
    }

    // Tests link against the build step's installed tree
    let extra = format!("-DCMAKE_INSTALL_PREFIX={} ", paths.instpath);
    if !configure_step(
        host,
        job,
        generator,
        &paths.srcpath,
        &paths.buildpath,
        &extra,
        runner_id,
        &mut result,
    )
    .await
    {
        return result;
    }

    let diag = build_step(host, job, generator, &paths.buildpath, runner_id, &mut result).await;

    let mut test_log = String::new();
    if diag.ok {
        let envvars = test_envvars(host, generator, &paths.instpath);
        for test in tests {
            if test.exec.is_empty() {
                continue;
            }
            match run_one_test(host, job, &paths.buildpath, &envvars, &test.exec).await {
                Ok(log) => {
                    test_log.push_str(&log);
                    test_log.push('\n');
                }
                Err(msg) => {
                    result.fail(msg);
                    break;
                }
            }
        }
    }

    let (n_test_warns, test_warns) = count_messages(&test_log, &TEST_WARN_TOKENS);
    let (n_test_errors, test_errors) = count_messages(&test_log, &TEST_ERROR_TOKENS);

    if !test_log.is_empty() {
        result.output.install_log = Some(B64.encode(&test_log));
    }

    let (warns, nwarns) = unify_b64(&diag.warns, &test_warns, diag.nwarns, n_test_warns);
    let (errors, nerrors) = unify_b64(&diag.errors, &test_errors, diag.nerrors, n_test_errors);
    result.output.warns = warns;
    result.output.errors = errors;
    result.output.nwarns = nwarns;
    result.output.nerrors = nerrors;

    result
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
