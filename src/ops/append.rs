use std::path::Path;

use tracing::info;

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::Result;
use crate::utils::sysutils::System;
use crate::utils::writerutils::{write_entries, WriteMode};

/// Adds `paths` after the last entry of an existing, well-formed archive.
pub fn append<P: AsRef<Path>>(archive: &Path, paths: &[P], config: ArchiveConfig) -> Result<()> {
    append_with(archive, paths, System::os(), config)
}

pub fn append_with<P: AsRef<Path>>(
    archive: &Path,
    paths: &[P],
    sys: System<'_>,
    config: ArchiveConfig,
) -> Result<()> {
    let len = write_entries(archive, paths, WriteMode::Append, sys, config)?;
    info!(archive = %archive.display(), entries = paths.len(), len, "appended to archive");
    Ok(())
}
