use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::{ArchiveError, Result};
use crate::ops::list::list;
use crate::utils::headerutils::entry_name;
use crate::utils::sysutils::System;
use crate::utils::writerutils::{write_entries, WriteMode};

/// Appends new versions of files the archive already holds, but only those
/// modified after the newest archived copy with the same name. Fails without
/// writing if any path is not in the archive. Returns the paths appended.
pub fn update<P: AsRef<Path>>(archive: &Path, paths: &[P], config: ArchiveConfig) -> Result<Vec<PathBuf>> {
    update_with(archive, paths, System::os(), config)
}

pub fn update_with<P: AsRef<Path>>(
    archive: &Path,
    paths: &[P],
    sys: System<'_>,
    config: ArchiveConfig,
) -> Result<Vec<PathBuf>> {
    let mut newest: HashMap<String, u64> = HashMap::new();
    for meta in list(archive, config)? {
        let mtime = newest.entry(meta.name).or_insert(meta.mtime);
        *mtime = (*mtime).max(meta.mtime);
    }

    let mut changed = vec![];
    for p in paths {
        let path = p.as_ref();
        let name = String::from_utf8_lossy(&entry_name(path)?).into_owned();
        let archived = newest
            .get(&name)
            .copied()
            .ok_or_else(|| ArchiveError::NotInArchive {
                path: path.to_path_buf(),
            })?;

        let st = sys.metadata.stat(path)?;
        if st.mtime > archived {
            changed.push(path.to_path_buf());
        } else {
            info!(path = %path.display(), "not modified since archived; skipping");
        }
    }

    if !changed.is_empty() {
        write_entries(archive, &changed, WriteMode::Append, sys, config)?;
    }

    info!(archive = %archive.display(), updated = changed.len(), "updated archive");
    Ok(changed)
}
