//! The host membership file handed to the launcher.
//!
//! One `<host> slots=1` line per host. The file lives in a scratch directory and is removed
//! when the guard is dropped, so early returns never leave it behind.
//!
//! On Linux the file is unlinked before exec and the launcher reads it through `/dev/fd/<n>`,
//! which there reopens the file with its own offset. Elsewhere `/dev/fd/<n>` duplicates the
//! descriptor and shares its offset, so a second read would come back empty; those platforms
//! keep the named file and wait for the launcher instead.

use std::io::Write;
use std::path::Path;
#[cfg(target_os = "linux")]
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::error::LaunchError;
use crate::host::HostList;

/// Every host gets exactly one process slot.
pub const SLOTS_PER_HOST: usize = 1;

/// File name prefix of every membership file.
pub const MEMBERSHIP_PREFIX: &str = "distlaunch-hosts-";

pub struct MembershipFile {
    file: NamedTempFile,
}

impl MembershipFile {
    /// Write the host list into the system temp directory.
    pub fn build(hosts: &HostList) -> Result<Self, LaunchError> {
        Self::build_in(&std::env::temp_dir(), hosts)
    }

    /// Write the host list out and flush it so the launcher sees every line.
    pub fn build_in(dir: &Path, hosts: &HostList) -> Result<Self, LaunchError> {
        let mut file = tempfile::Builder::new()
            .prefix(MEMBERSHIP_PREFIX)
            .suffix(".txt")
            .tempfile_in(dir)?;
        for host in hosts.iter() {
            writeln!(file, "{} slots={}", host, SLOTS_PER_HOST)?;
        }
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Unlink the file and hand its open descriptor over to the next program image.
    ///
    /// The returned handle names the file as `/dev/fd/<n>`. The descriptor is rewound and
    /// left open across exec, so the launcher can still read it while nothing remains on disk.
    #[cfg(target_os = "linux")]
    pub fn into_inherited(self) -> Result<InheritedMembership, LaunchError> {
        use std::io::{Seek, SeekFrom};
        use std::os::unix::io::AsRawFd;

        use nix::fcntl::{fcntl, FcntlArg, FdFlag};

        let (mut file, path) = self.file.into_parts();
        file.seek(SeekFrom::Start(0))?;
        fcntl(file.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::empty()))
            .map_err(std::io::Error::from)?;
        path.close()?;
        Ok(InheritedMembership { file })
    }
}

/// An unlinked membership file whose descriptor survives exec.
#[cfg(target_os = "linux")]
pub struct InheritedMembership {
    file: std::fs::File,
}

#[cfg(target_os = "linux")]
impl InheritedMembership {
    pub fn path(&self) -> PathBuf {
        use std::os::unix::io::AsRawFd;

        PathBuf::from(format!("/dev/fd/{}", self.file.as_raw_fd()))
    }
}
