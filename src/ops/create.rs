use std::path::Path;

use tracing::info;

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::Result;
use crate::utils::sysutils::System;
use crate::utils::writerutils::{write_entries, WriteMode};

/// Writes a fresh archive holding `paths` in the order given, replacing any
/// file already at `archive`. Every header is built before the archive is
/// opened, so a file that cannot be described leaves it untouched.
pub fn create<P: AsRef<Path>>(archive: &Path, paths: &[P]) -> Result<()> {
    create_with(archive, paths, System::os(), ArchiveConfig::default())
}

pub fn create_with<P: AsRef<Path>>(
    archive: &Path,
    paths: &[P],
    sys: System<'_>,
    config: ArchiveConfig,
) -> Result<()> {
    let len = write_entries(archive, paths, WriteMode::Create, sys, config)?;
    info!(archive = %archive.display(), entries = paths.len(), len, "created archive");
    Ok(())
}
