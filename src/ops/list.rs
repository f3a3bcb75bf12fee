use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::{IoContext, Result, Step};
use crate::models::headermodels::EntryMeta;
use crate::utils::readerutils::BlockReader;

/// Opens `archive` for a lazy, metadata-only walk. Each call starts a new walk.
pub fn entries(archive: &Path, config: ArchiveConfig) -> Result<BlockReader<BufReader<File>>> {
    let file = File::open(archive).at(archive, Step::Open)?;
    Ok(BlockReader::new(BufReader::new(file), archive, config))
}

/// Every entry of `archive`, in archive order.
pub fn list(archive: &Path, config: ArchiveConfig) -> Result<Vec<EntryMeta>> {
    let listed = entries(archive, config)?.collect::<Result<Vec<_>>>()?;
    info!(archive = %archive.display(), entries = listed.len(), "listed archive");
    Ok(listed)
}
