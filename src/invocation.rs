//! Launcher command line assembly.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::locate;

/// The interpreter name that gets pinned to a local absolute path by default.
pub const GENERIC_PYTHON: &str = "python";

/// Maps generic interpreter names to the exact executable the job should run.
///
/// Remote hosts would otherwise resolve e.g. `python` through their own `PATH`, which is
/// rarely the environment the user launched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterTable(Vec<(String, PathBuf)>);

impl InterpreterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `python` mapped to the absolute path it resolves to on `path_var`, if anything.
    ///
    /// This may be a wrapper such as a pyenv shim rather than the interpreter binary.
    pub fn resolve(path_var: &OsStr, working_dir: &Path) -> Self {
        let mut table = Self::new();
        if let Some(python) = locate::find_absolute(GENERIC_PYTHON, path_var, working_dir) {
            table.insert(GENERIC_PYTHON, python);
        }
        table
    }

    /// Later entries for the same name replace earlier ones.
    pub fn insert(&mut self, name: &str, path: PathBuf) {
        match self.0.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = path,
            None => self.0.push((name.to_string(), path)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, path)| path.as_path())
    }
}

/// A ready-to-run launcher command line. `argv[0]` is the launcher itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInvocation {
    argv: Vec<OsString>,
}

impl LaunchInvocation {
    pub fn program(&self) -> &OsStr {
        &self.argv[0]
    }

    pub fn args(&self) -> &[OsString] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }
}

/// Display only. What actually runs is the argument vector.
impl fmt::Display for LaunchInvocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.argv
                .iter()
                .map(|arg| shell_quote(&arg.to_string_lossy()))
                .join(" ")
        )
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r#"'\''"#))
    }
}

/// Build the launcher command line:
/// `<launcher> [-x NAME=VALUE]... --mca btl_tcp_links <n> --hostfile <membership> -- <command>`.
pub fn assemble(
    config: &LaunchConfig,
    launcher: &Path,
    membership: &Path,
) -> Result<LaunchInvocation, LaunchError> {
    let (executable, args) = config
        .command
        .split_first()
        .ok_or_else(|| LaunchError::Configuration("No command to launch was given".to_string()))?;

    let executable: OsString = match config.interpreters.get(executable) {
        Some(pinned) if !config.skip_python_path => pinned.into(),
        _ => executable.into(),
    };

    let mut argv: Vec<OsString> = vec![launcher.into()];
    for (name, value) in config.env.iter() {
        argv.push("-x".into());
        argv.push(format!("{}={}", name, value).into());
    }
    argv.push("--mca".into());
    argv.push("btl_tcp_links".into());
    argv.push(config.connections_per_peer.to_string().into());
    argv.push("--hostfile".into());
    argv.push(membership.into());
    argv.push("--".into());
    argv.push(executable);
    argv.extend(args.iter().map(OsString::from));

    Ok(LaunchInvocation { argv })
}
