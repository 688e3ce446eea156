//! The launch pipeline: hosts, SSH check, launcher lookup, membership file, exec.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use void::Void;

use crate::config::{Config, LaunchConfig};
use crate::error::LaunchError;
use crate::exec;
use crate::invocation::{assemble, InterpreterTable, LaunchInvocation};
use crate::locate::find_launcher;
use crate::membership::MembershipFile;
use crate::probe::{check_all, Prober, PROBE_TIMEOUT};

/// The parts of the process environment a launch depends on.
#[derive(Debug, Clone)]
pub struct LaunchEnvironment {
    /// Search path for the launcher and the local interpreter.
    pub path_var: OsString,
    /// Relative `PATH` entries are taken relative to this.
    pub working_dir: PathBuf,
    /// Where the membership file is written.
    pub scratch_dir: PathBuf,
}

impl LaunchEnvironment {
    pub fn current() -> Result<Self, LaunchError> {
        let working_dir = env::current_dir().map_err(|e| {
            LaunchError::Configuration(format!("Cannot read the working directory: {}", e))
        })?;
        Ok(Self {
            path_var: env::var_os("PATH").unwrap_or_default(),
            working_dir,
            scratch_dir: env::temp_dir(),
        })
    }
}

/// Everything checked and written, ready to hand over to the launcher.
pub struct PreparedLaunch {
    config: LaunchConfig,
    launcher: PathBuf,
    membership: MembershipFile,
}

impl PreparedLaunch {
    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn launcher(&self) -> &Path {
        &self.launcher
    }

    pub fn membership(&self) -> &MembershipFile {
        &self.membership
    }

    /// The command line with the membership file named by its path on disk.
    pub fn invocation(&self) -> Result<LaunchInvocation, LaunchError> {
        assemble(&self.config, &self.launcher, self.membership.path())
    }

    /// Exec the launcher. Only returns on failure, and by then the file is gone from disk.
    #[cfg(target_os = "linux")]
    pub fn launch(self) -> Result<Void, LaunchError> {
        let membership = self.membership.into_inherited()?;
        let invocation = assemble(&self.config, &self.launcher, &membership.path())?;
        eprintln!("[distlaunch] Running `{}`", invocation);
        exec::replace(invocation)
    }

    /// Run the launcher as a child, then exit with its status once the file is removed.
    #[cfg(not(target_os = "linux"))]
    pub fn launch(self) -> Result<Void, LaunchError> {
        let invocation = self.invocation()?;
        eprintln!("[distlaunch] Running `{}`", invocation);
        let status = exec::run_to_completion(invocation)?;
        drop(self.membership);
        std::process::exit(status.code().unwrap_or(1))
    }
}

/// Resolve and check everything up to the point of launching.
///
/// The launcher is looked up before the membership file is written, so a missing launcher
/// leaves nothing behind.
pub async fn prepare(
    cli: Config,
    prober: &dyn Prober,
    environment: &LaunchEnvironment,
) -> Result<PreparedLaunch, LaunchError> {
    let launcher_name = cli.launcher.clone();
    let interpreters = InterpreterTable::resolve(&environment.path_var, &environment.working_dir);
    let config = cli.into_launch_config(interpreters)?;
    eprintln!("[distlaunch] Hosts detected: {}", config.hosts);

    if config.skip_ssh_check {
        eprintln!("[distlaunch] Skipping the ssh check.");
    } else {
        check_all(prober, &config.hosts, PROBE_TIMEOUT).await?;
    }

    let launcher = find_launcher(&launcher_name, &environment.path_var)?;
    let membership = MembershipFile::build_in(&environment.scratch_dir, &config.hosts)?;

    Ok(PreparedLaunch {
        config,
        launcher,
        membership,
    })
}

/// Run the whole pipeline. With `--dry-run` the command line is printed instead of run.
///
/// Otherwise this only returns if the launch failed.
pub async fn run(
    cli: Config,
    prober: &dyn Prober,
    environment: &LaunchEnvironment,
) -> Result<(), LaunchError> {
    let dry_run = cli.dry_run;
    let prepared = prepare(cli, prober, environment).await?;

    if dry_run {
        println!("{}", prepared.invocation()?);
        return Ok(());
    }

    void::unreachable(prepared.launch()?)
}
