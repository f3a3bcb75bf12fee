use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Which I/O step failed. Carried by [`ArchiveError::IoFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Open,
    Stat,
    Read,
    Write,
    Seek,
    Truncate,
    Flush,
    Remove,
    CreateDir,
    SetPermissions,
    SetMtime,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Open => "open",
            Step::Stat => "stat",
            Step::Read => "read",
            Step::Write => "write",
            Step::Seek => "seek",
            Step::Truncate => "truncate",
            Step::Flush => "flush",
            Step::Remove => "remove",
            Step::CreateDir => "create directory",
            Step::SetPermissions => "set permissions",
            Step::SetMtime => "set mtime",
        };
        f.write_str(s)
    }
}

/// Why an archive stream was rejected. `offset` is the byte offset of the
/// header block being examined.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("lone zero block at offset {offset} is not followed by a second zero block")]
    UnexpectedEndMarker { offset: u64 },

    #[error("archive ends at offset {offset} in the middle of a {what}")]
    TruncatedArchive { offset: u64, what: &'static str },

    #[error("bad checksum for header at offset {offset}: stored {stored:o}, computed {computed:o}")]
    BadChecksum {
        offset: u64,
        stored: u64,
        computed: u64,
    },

    #[error("unparsable {field} field in header at offset {offset}")]
    BadNumericField { field: &'static str, offset: u64 },

    #[error("entry {name:?} at offset {offset} would escape the destination directory")]
    UnsafeEntryPath { name: String, offset: u64 },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to look up {what} for {}", path.display())]
    MetadataLookupFailed { path: PathBuf, what: &'static str },

    #[error("{step} failed on {}", path.display())]
    IoFailure {
        path: PathBuf,
        step: Step,
        #[source]
        source: io::Error,
    },

    #[error("malformed archive: {0}")]
    MalformedArchive(MalformedReason),

    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is {len} bytes long, the name field holds at most {max}", path.display())]
    NameTooLong { path: PathBuf, len: usize, max: usize },

    #[error("{field} value {value} of {} does not fit in {width} bytes", path.display())]
    FieldOverflow {
        path: PathBuf,
        field: &'static str,
        value: u64,
        width: usize,
    },

    #[error("{} has no relative entry name", path.display())]
    UnsafeName { path: PathBuf },

    #[error("{} is not a regular file", path.display())]
    NotRegularFile { path: PathBuf },

    #[error("{} is not in the archive", path.display())]
    NotInArchive { path: PathBuf },
}

impl From<MalformedReason> for ArchiveError {
    fn from(reason: MalformedReason) -> Self {
        ArchiveError::MalformedArchive(reason)
    }
}

impl ArchiveError {
    /// Wraps an I/O error with the path and step it came from. A missing file
    /// on open or stat is reported as [`ArchiveError::NotFound`].
    pub fn io(path: &Path, step: Step, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound && matches!(step, Step::Open | Step::Stat) {
            return ArchiveError::NotFound {
                path: path.to_path_buf(),
            };
        }

        ArchiveError::IoFailure {
            path: path.to_path_buf(),
            step,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ArchiveError::NotFound { .. })
    }
}

/// Shorthand for `.map_err(|e| ArchiveError::io(path, step, e))`.
pub trait IoContext<T> {
    fn at(self, path: &Path, step: Step) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path, step: Step) -> Result<T> {
        self.map_err(|e| ArchiveError::io(path, step, e))
    }
}
