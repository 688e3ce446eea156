//! Configuration for distlaunch.
//!
//! Holds the clap struct for command line arguments and flags, and the validated
//! `LaunchConfig` the launch pipeline runs on.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::error::LaunchError;
use crate::host::{self, HostList, HostSpec};
use crate::invocation::InterpreterTable;
use crate::locate::DEFAULT_LAUNCHER;

const EXAMPLES: &str = "\
The goal of this helper is to make it a bit easier to launch MPI jobs across
machines. It makes sure that every host is reachable with ssh and that mpirun
is available before handing over to it.

Examples:

    # Launch with host names
    distlaunch --hosts studio-0,studio-1 -- python -m mlx_lm.lora --train ...

    # Launch with IPs
    distlaunch --hosts 1.2.3.4,1.2.3.5 -- python -m mlx_lm.lora --train ...

    # More complicated launch which sets various MPI parameters
    distlaunch --hosts studio-0,studio-1 --connections-per-peer 4 \\
        --env MY_ENV_VAR=1 --env MY_ENV_VAR=2 -- python -m mlx_lm.lora --train ...";

#[derive(Parser, Debug)]
#[command(version, about = "Checked launcher for multi-host MPI jobs", after_help = EXAMPLES)]
pub struct Config {
    /// Hosts to run the command on with MPI, comma separated
    #[arg(long)]
    pub hosts: Option<String>,

    /// A plaintext file with one host per line
    #[arg(long)]
    pub hostfile: Option<PathBuf>,

    /// Set environment variables to all nodes (NAME=VALUE)
    #[arg(long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<KeyValue>,

    /// How many TCP connections to open between hosts
    #[arg(long, default_value = "4")]
    pub connections_per_peer: NonZeroU32,

    /// Do not check for ssh connectivity before launching
    #[arg(long)]
    pub skip_ssh_check: bool,

    /// Do not use the local interpreter path for `python`
    #[arg(long)]
    pub skip_python_path: bool,

    /// Pin a generic interpreter name to an executable (NAME=PATH). By default `python` is
    /// pinned to the first `python` on the local PATH, which may be a wrapper such as a pyenv
    /// shim rather than the interpreter itself
    #[arg(long = "interpreter", value_name = "NAME=PATH")]
    pub interpreters: Vec<KeyValue>,

    /// Distributed process launcher to use
    #[arg(long, default_value = DEFAULT_LAUNCHER)]
    pub launcher: String,

    /// Print the launcher command line and exit without launching
    #[arg(long)]
    pub dry_run: bool,

    /// The command to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Config {
    pub fn host_spec(&self) -> Result<HostSpec, LaunchError> {
        HostSpec::from_args(self.hosts.clone(), self.hostfile.clone())
    }

    /// Resolve hosts and collect everything the launch needs.
    pub fn into_launch_config(
        self,
        mut interpreters: InterpreterTable,
    ) -> Result<LaunchConfig, LaunchError> {
        let hosts = host::resolve(self.host_spec()?)?;
        let mut env = EnvVars::default();
        for KeyValue { key, value } in self.env {
            env.insert(key, value);
        }
        for KeyValue { key, value } in self.interpreters {
            interpreters.insert(&key, PathBuf::from(value));
        }
        LaunchConfig::new(
            hosts,
            env,
            self.connections_per_peer,
            self.skip_ssh_check,
            self.skip_python_path,
            interpreters,
            self.command,
        )
    }
}

/// A `NAME=VALUE` command line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl FromStr for KeyValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, _)) if key.is_empty() => Err(format!("missing name in '{}'", s)),
            Some((key, value)) => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Err(format!("expected NAME=VALUE, got '{}'", s)),
        }
    }
}

/// Environment variables to propagate, in the order they were first given.
/// Setting a name again overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(Vec<(String, String)>);

impl EnvVars {
    pub fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything needed to assemble the launcher command line.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub hosts: HostList,
    pub env: EnvVars,
    pub connections_per_peer: NonZeroU32,
    pub skip_ssh_check: bool,
    pub skip_python_path: bool,
    pub interpreters: InterpreterTable,
    /// Executable followed by its arguments.
    pub command: Vec<String>,
}

impl LaunchConfig {
    pub fn new(
        hosts: HostList,
        env: EnvVars,
        connections_per_peer: NonZeroU32,
        skip_ssh_check: bool,
        skip_python_path: bool,
        interpreters: InterpreterTable,
        command: Vec<String>,
    ) -> Result<Self, LaunchError> {
        if command.is_empty() {
            return Err(LaunchError::Configuration(
                "No command to launch was given".to_string(),
            ));
        }
        Ok(Self {
            hosts,
            env,
            connections_per_peer,
            skip_ssh_check,
            skip_python_path,
            interpreters,
            command,
        })
    }
}
