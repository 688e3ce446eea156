use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("{0}")]
    Configuration(String),
    #[error("Failed to read host file {path}: {reason}")]
    HostFile { path: PathBuf, reason: String },
    #[error(
        "Failed to connect to '{host}' via ssh ({reason}). \
         Make sure that '{host}' is accessible without a password."
    )]
    UnreachableHost { host: String, reason: String },
    #[error("Couldn't find '{0}' in the path. Make sure you have MPI installed.")]
    LauncherNotFound(String),
    #[error("Failed to prepare the host membership file: {0}")]
    MembershipFile(#[from] std::io::Error),
    #[error("Failed to execute '{program}': {source}")]
    LaunchExec {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Name of the launch stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            LaunchError::Configuration(_) => "Configuration",
            LaunchError::HostFile { .. } => "Host resolution",
            LaunchError::UnreachableHost { .. } => "SSH check",
            LaunchError::LauncherNotFound(_) => "Launcher lookup",
            LaunchError::MembershipFile(_) => "Host membership file",
            LaunchError::LaunchExec { .. } => "Launch",
        }
    }
}
