//! SSH reachability checks.
//!
//! Every host must answer a trivial remote command before anything is launched. Hosts are
//! probed one after another and the first failure aborts the launch.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use colourado::{ColorPalette, PaletteType};
use openssh::{KnownHosts, SessionBuilder, Stdio};

use crate::error::LaunchError;
use crate::host::{prettify, HostList};

/// How long a single host gets to connect and run the probe command.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a probe did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Could not open the SSH session.
    Connect(String),
    /// The remote command exited with a non-zero status (`None` if killed by a signal).
    Exit(Option<i32>),
    /// The probe did not finish in time.
    Timeout(Duration),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbeFailure::Connect(reason) => write!(f, "{}", reason),
            ProbeFailure::Exit(Some(code)) => write!(f, "'ls' exited with status {}", code),
            ProbeFailure::Exit(None) => write!(f, "'ls' was terminated by a signal"),
            ProbeFailure::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
        }
    }
}

/// Runs a trivial command on a remote host.
#[async_trait]
pub trait Prober {
    async fn probe(&self, host: &str) -> Result<(), ProbeFailure>;
}

/// Probes hosts by running `ls` over SSH.
pub struct SshProber {
    connect_timeout: Duration,
}

impl SshProber {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Prober for SshProber {
    async fn probe(&self, host: &str) -> Result<(), ProbeFailure> {
        let session = SessionBuilder::default()
            .known_hosts_check(KnownHosts::Add)
            .connect_timeout(self.connect_timeout)
            .connect_mux(host)
            .await
            .map_err(|e| ProbeFailure::Connect(e.to_string()))?;
        let status = session
            .command("ls")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        // The probe result is already decided at this point.
        let _ = session.close().await;
        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ProbeFailure::Exit(status.code())),
            Err(e) => Err(ProbeFailure::Connect(e.to_string())),
        }
    }
}

/// Probe every host in order, stopping at the first one that fails or exceeds `timeout`.
pub async fn check_all<P>(
    prober: &P,
    hosts: &HostList,
    timeout: Duration,
) -> Result<(), LaunchError>
where
    P: Prober + ?Sized,
{
    let colors = ColorPalette::new(hosts.len() as u32, PaletteType::Pastel, false).colors;
    for (host, color) in hosts.iter().zip(colors) {
        let colorhost = prettify(host, color);
        let outcome = match tokio::time::timeout(timeout, prober.probe(host)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        };
        match outcome {
            Ok(()) => eprintln!("{} Reachable via ssh.", colorhost),
            Err(failure) => {
                eprintln!("{} Unreachable: {}", colorhost, failure);
                return Err(LaunchError::UnreachableHost {
                    host: host.clone(),
                    reason: failure.to_string(),
                });
            }
        }
    }
    Ok(())
}
