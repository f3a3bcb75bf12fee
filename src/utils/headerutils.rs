use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path};

use tracing::debug;

use crate::models::errormodels::{ArchiveError, Result};
use crate::models::headermodels::{Block, FieldError, HeaderRecord, NAME_LEN, REGTYPE};
use crate::utils::sysutils::System;

/// The name `path` is stored under. Entry names are relative, so leading `/`
/// are removed. Paths with a `..` component have no such name.
pub fn entry_name(path: &Path) -> Result<Vec<u8>> {
    let bytes = path.as_os_str().as_bytes();
    let relative = &bytes[bytes.iter().take_while(|&&b| b == b'/').count()..];
    let climbs = path.components().any(|c| c == Component::ParentDir);
    if relative.is_empty() || climbs {
        return Err(ArchiveError::UnsafeName {
            path: path.to_path_buf(),
        });
    }

    if relative.len() < bytes.len() {
        debug!(path = %path.display(), "removing leading '/' from entry name");
    }
    Ok(relative.to_vec())
}

/// Gathers everything a header for `path` needs, failing if the file is not a
/// regular file, its name does not fit, or its owner or group has no name.
pub fn header_record(path: &Path, sys: System<'_>) -> Result<HeaderRecord> {
    let name = entry_name(path)?;
    if name.len() > NAME_LEN {
        return Err(ArchiveError::NameTooLong {
            path: path.to_path_buf(),
            len: name.len(),
            max: NAME_LEN,
        });
    }

    let st = sys.metadata.stat(path)?;
    if !st.is_regular {
        return Err(ArchiveError::NotRegularFile {
            path: path.to_path_buf(),
        });
    }

    let uname = sys
        .identity
        .uid_to_name(st.uid)
        .ok_or_else(|| ArchiveError::MetadataLookupFailed {
            path: path.to_path_buf(),
            what: "owner name",
        })?;
    let gname = sys
        .identity
        .gid_to_name(st.gid)
        .ok_or_else(|| ArchiveError::MetadataLookupFailed {
            path: path.to_path_buf(),
            what: "group name",
        })?;

    Ok(HeaderRecord {
        name,
        mode: u64::from(st.mode & 0o7777),
        uid: u64::from(st.uid),
        gid: u64::from(st.gid),
        size: st.size,
        mtime: st.mtime,
        typeflag: REGTYPE,
        uname,
        gname,
        devmajor: st.dev_major,
        devminor: st.dev_minor,
    })
}

/// Serializes `record`, attributing any field that does not fit to `path`.
pub fn encode_header(record: &HeaderRecord, path: &Path) -> Result<Block> {
    record.to_block().map_err(|e| match e {
        FieldError::TooLong { field: "name", len, max } => ArchiveError::NameTooLong {
            path: path.to_path_buf(),
            len,
            max,
        },
        FieldError::TooLong { field, len, max } => ArchiveError::FieldOverflow {
            path: path.to_path_buf(),
            field,
            value: len as u64,
            width: max,
        },
        FieldError::Overflow {
            field,
            value,
            width,
        } => ArchiveError::FieldOverflow {
            path: path.to_path_buf(),
            field,
            value,
            width,
        },
    })
}

/// Builds the complete 512-byte header for `path`, checksum included.
pub fn build_header(path: &Path, sys: System<'_>) -> Result<Block> {
    let record = header_record(path, sys)?;
    encode_header(&record, path)
}
