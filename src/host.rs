//! Launch hosts.
//!
//! Hosts come either inline from `--hosts` or from a host file listing one host per line.

use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use colored::*;
use colourado::Color;
use itertools::Itertools;

use crate::error::LaunchError;

/// Where the host list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSpec {
    /// Comma-separated hosts, e.g. `studio-0,studio-1`.
    Inline(String),
    /// Path to a host file.
    File(PathBuf),
}

impl HostSpec {
    /// Exactly one of the two sources must be given.
    pub fn from_args(
        hosts: Option<String>,
        hostfile: Option<PathBuf>,
    ) -> Result<Self, LaunchError> {
        match (hosts, hostfile) {
            (Some(hosts), None) => Ok(HostSpec::Inline(hosts)),
            (None, Some(path)) => Ok(HostSpec::File(path)),
            (Some(_), Some(_)) => Err(LaunchError::Configuration(
                "Only one of --hosts or --hostfile can be provided".to_string(),
            )),
            (None, None) => Err(LaunchError::Configuration(
                "Either --hosts or --hostfile need to be provided".to_string(),
            )),
        }
    }
}

/// Ordered list of hosts. Never empty, and no entry is an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostList(Vec<String>);

impl HostList {
    pub fn new(hosts: Vec<String>) -> Result<Self, LaunchError> {
        if hosts.is_empty() {
            return Err(LaunchError::Configuration("No hosts were given".to_string()));
        }
        if let Some(index) = hosts.iter().position(|host| host.is_empty()) {
            return Err(LaunchError::Configuration(format!(
                "Host entry {} is empty",
                index
            )));
        }
        Ok(Self(hosts))
    }
}

impl Deref for HostList {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for HostList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

/// For pretty-printing a host name.
/// Surrounds with brackets and colors it with the given color.
pub fn prettify(host: &str, color: Color) -> ColoredString {
    let r = (color.red * 255.0) as u8;
    let g = (color.green * 255.0) as u8;
    let b = (color.blue * 255.0) as u8;
    format!("[{}]", host).truecolor(r, g, b)
}

/// Turn a host specification into the ordered host list.
pub fn resolve(spec: HostSpec) -> Result<HostList, LaunchError> {
    let hosts = match spec {
        // No trimming here. A stray space is a typo that should fail the SSH check.
        HostSpec::Inline(hosts) => hosts.split(',').map(str::to_string).collect(),
        HostSpec::File(path) => read_host_file(&path)?,
    };
    HostList::new(hosts)
}

fn read_host_file(path: &Path) -> Result<Vec<String>, LaunchError> {
    let contents = fs::read_to_string(path).map_err(|e| LaunchError::HostFile {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(parse_host_lines(&contents))
}

fn parse_host_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
