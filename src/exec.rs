//! Handing the process over to the launcher.

use std::process::Command;

#[cfg(unix)]
use void::Void;

use crate::error::LaunchError;
use crate::invocation::LaunchInvocation;

/// Replace the current process with the launcher.
///
/// Open descriptors and the environment are inherited. Only returns if exec itself failed.
#[cfg(unix)]
pub fn replace(invocation: LaunchInvocation) -> Result<Void, LaunchError> {
    use std::os::unix::process::CommandExt;

    let source = Command::new(invocation.program())
        .args(invocation.args())
        .exec();
    Err(LaunchError::LaunchExec {
        program: invocation.program().to_string_lossy().into_owned(),
        source,
    })
}

/// Run the launcher as a child and wait for it.
///
/// The caller is expected to exit with the returned status, after cleaning up.
pub fn run_to_completion(
    invocation: LaunchInvocation,
) -> Result<std::process::ExitStatus, LaunchError> {
    Command::new(invocation.program())
        .args(invocation.args())
        .status()
        .map_err(|source| LaunchError::LaunchExec {
            program: invocation.program().to_string_lossy().into_owned(),
            source,
        })
}
