//! End-to-end tests for the launch pipeline, driven through the same `run`/`prepare` as the binary.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::Mutex;

use distlaunch::{
    assemble, prepare, run, Config, HostList, LaunchEnvironment, LaunchError,
    LaunchInvocation, MembershipFile, ProbeFailure, Prober,
};

/// Mock prober for testing that doesn't actually open SSH sessions.
pub struct MockProber {
    unreachable: Vec<String>,
    probed: Arc<Mutex<Vec<String>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self {
            unreachable: vec![],
            probed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_unreachable(mut self, host: &str) -> Self {
        self.unreachable.push(host.to_string());
        self
    }

    pub fn probed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.probed)
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, host: &str) -> Result<(), ProbeFailure> {
        self.probed.lock().await.push(host.to_string());
        if self.unreachable.iter().any(|h| h == host) {
            Err(ProbeFailure::Exit(Some(255)))
        } else {
            Ok(())
        }
    }
}

/// A private `PATH` directory and a private scratch directory for membership files.
struct Sandbox {
    bin: TempDir,
    scratch: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            bin: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
        }
    }

    fn environment(&self) -> LaunchEnvironment {
        LaunchEnvironment {
            path_var: OsString::from(self.bin.path()),
            working_dir: self.bin.path().to_owned(),
            scratch_dir: self.scratch.path().to_owned(),
        }
    }

    /// Membership files currently on disk.
    fn scratch_files(&self) -> Vec<PathBuf> {
        fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| name.starts_with("distlaunch-hosts-"))
            })
            .collect()
    }

    /// Install an executable `mpirun` that exits successfully.
    #[cfg(unix)]
    fn install_launcher(&self) -> PathBuf {
        self.install("mpirun", "#!/bin/sh\nexit 0\n")
    }

    /// Install an executable `mpirun` that exec cannot start.
    #[cfg(unix)]
    fn install_broken_launcher(&self) -> PathBuf {
        self.install("mpirun", "#!/nonexistent/distlaunch-interpreter\n")
    }

    #[cfg(unix)]
    fn install(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.bin.path().join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

fn cli(args: &[&str]) -> Config {
    Config::try_parse_from(std::iter::once("distlaunch").chain(args.iter().copied())).unwrap()
}

fn strings(invocation: &LaunchInvocation) -> Vec<String> {
    invocation
        .argv()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[cfg(unix)]
#[tokio::test]
async fn test_e2e_two_hosts_python_job() {
    let sandbox = Sandbox::new();
    let launcher = sandbox.install_launcher();
    let prober = MockProber::new();

    let prepared = prepare(
        cli(&[
            "--hosts",
            "m1,m2",
            "--interpreter",
            "python=/opt/venv/bin/python",
            "--",
            "python",
            "train.py",
            "--epochs",
            "3",
        ]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap();

    let membership = prepared.membership().path().to_owned();
    assert_eq!(membership.parent(), Some(sandbox.scratch.path()));
    assert_eq!(
        fs::read_to_string(&membership).unwrap(),
        "m1 slots=1\nm2 slots=1\n"
    );
    assert_eq!(*prober.probed().lock().await, vec!["m1", "m2"]);
    assert_eq!(
        strings(&prepared.invocation().unwrap()),
        vec![
            launcher.to_string_lossy().into_owned(),
            "--mca".to_string(),
            "btl_tcp_links".to_string(),
            "4".to_string(),
            "--hostfile".to_string(),
            membership.to_string_lossy().into_owned(),
            "--".to_string(),
            "/opt/venv/bin/python".to_string(),
            "train.py".to_string(),
            "--epochs".to_string(),
            "3".to_string(),
        ]
    );

    drop(prepared);
    assert!(sandbox.scratch_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_e2e_host_file_order_is_kept() {
    let sandbox = Sandbox::new();
    sandbox.install_launcher();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "node-b").unwrap();
    writeln!(file, "node-a").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "node-b").unwrap();
    let hostfile = file.path().to_string_lossy().into_owned();
    let prober = MockProber::new();

    let prepared = prepare(
        cli(&["--hostfile", &hostfile, "./job"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap();

    assert_eq!(
        fs::read_to_string(prepared.membership().path()).unwrap(),
        "node-b slots=1\nnode-a slots=1\nnode-b slots=1\n"
    );
}

#[tokio::test]
async fn test_e2e_unreachable_host_aborts_launch() {
    let sandbox = Sandbox::new();
    let prober = MockProber::new().with_unreachable("m2");

    let err = run(
        cli(&["--hosts", "m1,m2,m3", "python", "train.py"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap_err();

    match err {
        LaunchError::UnreachableHost { host, .. } => assert_eq!(host, "m2"),
        other => panic!("unexpected error: {:?}", other),
    }
    // Fail fast: "m3" is never checked.
    assert_eq!(*prober.probed().lock().await, vec!["m1", "m2"]);
    assert!(sandbox.scratch_files().is_empty());
}

#[tokio::test]
async fn test_e2e_whitespace_in_hosts_is_not_masked() {
    let sandbox = Sandbox::new();
    let prober = MockProber::new().with_unreachable(" m2");

    let err = run(
        cli(&["--hosts", "m1, m2", "./job"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LaunchError::UnreachableHost { host, .. } if host == " m2"));
}

#[tokio::test]
async fn test_e2e_missing_launcher_writes_no_membership_file() {
    let sandbox = Sandbox::new();
    let prober = MockProber::new();

    let err = run(
        cli(&["--hosts", "m1,m2", "python", "train.py"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LaunchError::LauncherNotFound(ref name) if name == "mpirun"));
    assert_eq!(*prober.probed().lock().await, vec!["m1", "m2"]);
    assert!(sandbox.scratch_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_e2e_skip_ssh_check_never_contacts_hosts() {
    let sandbox = Sandbox::new();
    sandbox.install_launcher();
    let prober = MockProber::new().with_unreachable("m1");

    run(
        cli(&["--hosts", "m1,m2", "--skip-ssh-check", "--dry-run", "./job"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap();

    assert!(prober.probed().lock().await.is_empty());
    assert!(sandbox.scratch_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_e2e_failed_exec_leaves_no_membership_file() {
    let sandbox = Sandbox::new();
    let launcher = sandbox.install_broken_launcher();
    let prober = MockProber::new();

    let err = run(
        cli(&["--hosts", "m1", "./job"]),
        &prober,
        &sandbox.environment(),
    )
    .await
    .unwrap_err();

    match err {
        LaunchError::LaunchExec { program, .. } => {
            assert_eq!(program, launcher.to_string_lossy())
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(sandbox.scratch_files().is_empty());
}

/// Builds the membership file and assembles, reporting the file path it created.
fn assemble_with_membership(
    hosts: &HostList,
    scratch: &Path,
    created: &mut Option<PathBuf>,
) -> Result<LaunchInvocation, LaunchError> {
    let membership = MembershipFile::build_in(scratch, hosts)?;
    *created = Some(membership.path().to_owned());
    let mut config = cli(&["--hosts", "m1", "job"]).into_launch_config(Default::default())?;
    config.command.clear();
    assemble(&config, Path::new("mpirun"), membership.path())
}

#[test]
fn test_e2e_membership_file_removed_when_assembly_fails() {
    let sandbox = Sandbox::new();
    let hosts = HostList::new(vec!["m1".to_string()]).unwrap();

    let mut created = None;
    let result = assemble_with_membership(&hosts, sandbox.scratch.path(), &mut created);

    assert!(matches!(result, Err(LaunchError::Configuration(_))));
    let path = created.expect("membership file was never built");
    assert!(!path.exists());
    assert!(sandbox.scratch_files().is_empty());
}
