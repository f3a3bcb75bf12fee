use std::fs::{self, File, Permissions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, info, warn};

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::{ArchiveError, IoContext, MalformedReason, Result, Step};
use crate::models::headermodels::EntryMeta;
use crate::utils::readerutils::BlockReader;

/// Where `meta` lands under `dest`. Names that are empty, absolute or climb
/// out with `..` are refused.
fn destination(dest: &Path, meta: &EntryMeta) -> Result<PathBuf> {
    let name = Path::new(&meta.name);
    let contained = name
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if meta.name.is_empty() || !contained {
        return Err(MalformedReason::UnsafeEntryPath {
            name: meta.name.clone(),
            offset: meta.offset,
        }
        .into());
    }

    Ok(dest.join(name))
}

fn remove_existing(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(ArchiveError::io(path, Step::Remove, e)),
        _ => Ok(()),
    }
}

/// Writes every regular-file entry of `archive` below `dest`, in archive
/// order, restoring permission bits and mtime. Later entries with the same
/// name replace earlier ones. Returns the entries extracted.
pub fn extract(archive: &Path, dest: &Path, config: ArchiveConfig) -> Result<Vec<EntryMeta>> {
    let file = File::open(archive).at(archive, Step::Open)?;
    let mut reader = BlockReader::new(BufReader::new(file), archive, config);
    let mut extracted = vec![];

    while let Some(meta) = reader.next_entry()? {
        if !meta.is_regular() {
            warn!(name = %meta.name, typeflag = meta.typeflag, "not a regular file; skipping");
            continue;
        }

        let out_path = destination(dest, &meta)?;
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).at(parent, Step::CreateDir)?;
        }
        remove_existing(&out_path)?;

        let mut out = BufWriter::new(File::create(&out_path).at(&out_path, Step::Open)?);
        reader.copy_content(&mut out, &out_path)?;
        out.flush().at(&out_path, Step::Flush)?;
        drop(out);

        fs::set_permissions(&out_path, Permissions::from_mode((meta.mode & 0o7777) as u32))
            .at(&out_path, Step::SetPermissions)?;
        filetime::set_file_mtime(&out_path, FileTime::from_unix_time(meta.mtime as i64, 0))
            .at(&out_path, Step::SetMtime)?;

        debug!(name = %meta.name, size = meta.size, "extracted entry");
        extracted.push(meta);
    }

    info!(archive = %archive.display(), entries = extracted.len(), "extracted archive");
    Ok(extracted)
}
