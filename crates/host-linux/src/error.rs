//! Run-level failures. Per-field read failures never show up here; they
//! collapse to defaults inside [`crate::sysfs`].

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The PCI enumeration tool could not be started
    #[error("failed to run PCI tool `{program}`: {source}")]
    PciToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The PCI enumeration tool ran but reported failure
    #[error("PCI tool `{program}` exited with {status}: {stderr}")]
    PciToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to list block devices in {}: {source}", path.display())]
    ReadBlockRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A top-level block entry is not a readable symbolic link
    #[error("failed to resolve block device link {}: {source}", path.display())]
    UnresolvedLink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
