//! Distlaunch: A Checked Multi-Host MPI Job Launcher.

// Command line arguments and configuration.
pub mod config;
// How to parse and represent hosts.
pub mod host;
// SSH reachability checks.
pub mod probe;
// Finding executables on the search path.
pub mod locate;
// The host membership file given to the launcher.
pub mod membership;
// Assembling the launcher command line.
pub mod invocation;
// Replacing this process with the launcher.
pub mod exec;
// The launch pipeline.
pub mod launch;
// Error handling.
pub mod error;

pub use config::{Config, EnvVars, KeyValue, LaunchConfig};
pub use error::LaunchError;
pub use host::{resolve, HostList, HostSpec};
pub use invocation::{assemble, InterpreterTable, LaunchInvocation};
pub use launch::{prepare, run, LaunchEnvironment, PreparedLaunch};
pub use locate::{find_absolute, find_executable, find_launcher, DEFAULT_LAUNCHER};
pub use membership::MembershipFile;
pub use probe::{check_all, ProbeFailure, Prober, SshProber, PROBE_TIMEOUT};
