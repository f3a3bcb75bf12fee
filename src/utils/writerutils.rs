//! Serializes entries into a block-aligned archive stream.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::{IoContext, Result, Step};
use crate::models::headermodels::{Block, HeaderRecord, BLOCK_SIZE, END_MARKER_BLOCKS};
use crate::utils::headerutils::{encode_header, header_record};
use crate::utils::ioutils::read_full;
use crate::utils::readerutils::BlockReader;
use crate::utils::sysutils::{file_id, System};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate the archive and write from empty.
    Create,
    /// Write over the existing end marker of a well-formed archive.
    Append,
}

/// A header built and encoded ahead of writing, paired with its source.
#[derive(Debug, Clone)]
pub struct PreparedEntry {
    pub path: PathBuf,
    pub record: HeaderRecord,
    pub block: Block,
}

/// Builds every header and checks every source can be opened before anything
/// is written, so a file that cannot be archived aborts the operation with the
/// archive untouched. `archive` itself is skipped if it appears in `paths`.
pub fn prepare_entries<P: AsRef<Path>>(
    paths: &[P],
    archive: &Path,
    sys: System<'_>,
) -> Result<Vec<PreparedEntry>> {
    let archive_id = file_id(archive);

    paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|path| {
            let is_archive = archive_id.is_some() && file_id(path) == archive_id;
            if is_archive {
                warn!(path = %path.display(), "file is the archive; not dumped");
            }
            !is_archive
        })
        .map(|path| {
            let record = header_record(path, sys)?;
            let block = encode_header(&record, path)?;
            File::open(path).at(path, Step::Open)?;
            Ok(PreparedEntry {
                path: path.to_path_buf(),
                record,
                block,
            })
        })
        .collect()
}

pub struct BlockWriter<W: Write> {
    inner: W,
    archive: PathBuf,
    position: u64,
}

impl<W: Write> BlockWriter<W> {
    /// `position` is the stream offset `inner` currently writes at.
    pub fn new(inner: W, archive: &Path, position: u64) -> Self {
        Self {
            inner,
            archive: archive.to_path_buf(),
            position,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn write_block(&mut self, block: &Block) -> Result<()> {
        self.inner.write_all(block).at(&self.archive, Step::Write)?;
        self.position += BLOCK_SIZE as u64;
        Ok(())
    }

    /// Writes one header followed by exactly the content length it declares,
    /// padded to a block boundary. The source is opened before the header goes
    /// out. If it has shrunk since its header was built, the missing tail is
    /// written as zeros.
    pub fn write_entry(&mut self, entry: &PreparedEntry) -> Result<()> {
        let path = entry.path.as_path();
        let mut src = File::open(path).at(path, Step::Open)?;

        self.write_block(&entry.block)?;

        let mut remaining = entry.record.size;
        let mut chunk: Block = [0u8; BLOCK_SIZE];
        let mut shrank = false;
        while remaining > 0 {
            let want = remaining.min(BLOCK_SIZE as u64) as usize;
            let got = read_full(&mut src, &mut chunk[..want]).at(path, Step::Read)?;
            if got < want && !shrank {
                warn!(path = %path.display(), "file shrank while archiving; padding with zeros");
                shrank = true;
            }
            chunk[got..].fill(0);
            self.write_block(&chunk)?;
            remaining -= want as u64;
        }

        debug!(path = %path.display(), size = entry.record.size, "wrote entry");
        Ok(())
    }

    /// Writes the end marker, flushes, and returns the final stream length.
    pub fn finish(mut self) -> Result<u64> {
        let zero: Block = [0u8; BLOCK_SIZE];
        for _ in 0..END_MARKER_BLOCKS {
            self.write_block(&zero)?;
        }
        self.inner.flush().at(&self.archive, Step::Flush)?;
        Ok(self.position)
    }
}

/// Writes `paths` into the archive at `archive` in order, then a fresh end
/// marker. In [`WriteMode::Append`] the existing entries are walked (and their
/// checksums verified, if configured) to find where the end marker starts.
/// Returns the archive's final length.
pub fn write_entries<P: AsRef<Path>>(
    archive: &Path,
    paths: &[P],
    mode: WriteMode,
    sys: System<'_>,
    config: ArchiveConfig,
) -> Result<u64> {
    let entries = prepare_entries(paths, archive, sys)?;

    let mut file = match mode {
        WriteMode::Create => File::create(archive).at(archive, Step::Open)?,
        WriteMode::Append => OpenOptions::new()
            .read(true)
            .write(true)
            .open(archive)
            .at(archive, Step::Open)?,
    };

    let start = match mode {
        WriteMode::Create => 0,
        WriteMode::Append => {
            let (existing, end) = BlockReader::new(&mut file, archive, config).read_to_end_marker()?;
            debug!(entries = existing.len(), end, "located end marker");
            file.seek(SeekFrom::Start(end)).at(archive, Step::Seek)?;
            end
        }
    };

    let mut writer = BlockWriter::new(BufWriter::new(&mut file), archive, start);
    for entry in &entries {
        writer.write_entry(entry)?;
    }
    let len = writer.finish()?;

    // drop whatever followed the old end marker
    if mode == WriteMode::Append {
        file.set_len(len).at(archive, Step::Truncate)?;
    }

    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::headermodels::{content_blocks, is_zero_block};
    use std::fs;
    use std::io::Cursor;

    fn prepared(dir: &Path, name: &str, content: &[u8]) -> PreparedEntry {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        let record = HeaderRecord::regular(name, content.len() as u64);
        let block = record.to_block().unwrap();
        PreparedEntry {
            path,
            record,
            block,
        }
    }

    #[test]
    fn content_is_padded_to_block_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let entry = prepared(dir.path(), "a.txt", &[b'x'; 700]);

        let mut w = BlockWriter::new(Cursor::new(Vec::<u8>::new()), Path::new("t.tar"), 0);
        w.write_entry(&entry).unwrap();
        assert_eq!(w.position(), (1 + content_blocks(700)) * BLOCK_SIZE as u64);
        let len = w.finish().unwrap();
        assert_eq!(len, 5 * BLOCK_SIZE as u64);
    }

    #[test]
    fn exact_multiple_gets_no_padding() {
        let dir = tempfile::tempdir().unwrap();
        let entry = prepared(dir.path(), "b.bin", &[7u8; 1024]);

        let mut buf: Vec<u8> = vec![];
        let mut w = BlockWriter::new(&mut buf, Path::new("t.tar"), 0);
        w.write_entry(&entry).unwrap();
        w.finish().unwrap();

        assert_eq!(buf.len(), (1 + 2 + 2) * BLOCK_SIZE);
        assert!(buf[BLOCK_SIZE..3 * BLOCK_SIZE].iter().all(|&b| b == 7));
    }

    #[test]
    fn empty_file_is_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let entry = prepared(dir.path(), "empty", b"");

        let mut buf: Vec<u8> = vec![];
        let mut w = BlockWriter::new(&mut buf, Path::new("t.tar"), 0);
        w.write_entry(&entry).unwrap();
        w.finish().unwrap();

        assert_eq!(buf.len(), 3 * BLOCK_SIZE);
        let tail: &Block = buf[BLOCK_SIZE..2 * BLOCK_SIZE].try_into().unwrap();
        assert!(is_zero_block(tail));
    }

    #[test]
    fn shrunk_file_still_fills_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut entry = prepared(dir.path(), "s.txt", b"abc");
        entry.record.size = 600;

        let mut buf: Vec<u8> = vec![];
        let mut w = BlockWriter::new(&mut buf, Path::new("t.tar"), 0);
        w.write_entry(&entry).unwrap();
        w.finish().unwrap();

        assert_eq!(buf.len(), (1 + 2 + 2) * BLOCK_SIZE);
        assert_eq!(&buf[BLOCK_SIZE..BLOCK_SIZE + 3], b"abc");
        assert!(buf[BLOCK_SIZE + 3..3 * BLOCK_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn missing_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut entry = prepared(dir.path(), "gone.txt", b"abc");
        fs::remove_file(&entry.path).unwrap();
        entry.record.size = 3;

        let mut buf: Vec<u8> = vec![];
        let mut w = BlockWriter::new(&mut buf, Path::new("t.tar"), 0);
        let err = w.write_entry(&entry).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(w.position(), 0);
        drop(w);
        assert!(buf.is_empty());
    }
}
