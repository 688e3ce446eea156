//! Search-path lookup for executables.

use std::env;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::LaunchError;

/// The distributed process launcher used when `--launcher` is not given.
pub const DEFAULT_LAUNCHER: &str = "mpirun";

/// Locate the launcher executable in `path_var`, `which`-style.
pub fn find_launcher(name: &str, path_var: &OsStr) -> Result<PathBuf, LaunchError> {
    find_executable(name, path_var).ok_or_else(|| LaunchError::LauncherNotFound(name.to_string()))
}

/// Look up `name` in the directories of `path_var`, first match wins.
/// A name that already contains a path separator is checked as is.
pub fn find_executable(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_owned());
    }
    search(name, env::split_paths(path_var))
}

/// Like `find_executable`, but relative `PATH` entries are taken from `working_dir`.
///
/// The result is absolute whenever `working_dir` is. Symlinks are kept as they are.
pub fn find_absolute(name: &str, path_var: &OsStr, working_dir: &Path) -> Option<PathBuf> {
    if name.is_empty() || Path::new(name).components().count() > 1 {
        return None;
    }
    let dirs = env::split_paths(path_var).map(|dir| {
        if dir.is_absolute() {
            dir
        } else {
            working_dir.join(
                dir.components()
                    .filter(|component| *component != Component::CurDir)
                    .collect::<PathBuf>(),
            )
        }
    });
    search(name, dirs)
}

fn search(name: &str, dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    dirs.filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match path.metadata() {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
