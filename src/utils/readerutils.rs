//! Forward-only walk over an archive stream, one header at a time.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::models::configmodels::ArchiveConfig;
use crate::models::errormodels::{ArchiveError, IoContext, MalformedReason, Result, Step};
use crate::models::headermodels::{
    content_blocks, is_zero_block, Block, EntryMeta, HeaderRecord, BLOCK_SIZE,
};
use crate::utils::ioutils::read_full;

/// Yields each entry's metadata in archive order, skipping content unless
/// [`BlockReader::copy_content`] is called for the entry just returned.
///
/// The walk stops for good at the end marker or at the first error.
pub struct BlockReader<R> {
    inner: R,
    archive: PathBuf,
    config: ArchiveConfig,
    /// offset of the next unread byte
    position: u64,
    /// current entry: (header offset, content size), while its content is unread
    current: Option<(u64, u64)>,
    end_marker: Option<u64>,
    done: bool,
}

impl<R: Read + Seek> BlockReader<R> {
    /// `archive` names the stream in errors. The stream must be positioned at
    /// its start.
    pub fn new(inner: R, archive: &Path, config: ArchiveConfig) -> Self {
        Self {
            inner,
            archive: archive.to_path_buf(),
            config,
            position: 0,
            current: None,
            end_marker: None,
            done: false,
        }
    }

    /// Offset of the first end-marker block, once the walk has reached it.
    pub fn end_marker(&self) -> Option<u64> {
        self.end_marker
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn next_entry(&mut self) -> Result<Option<EntryMeta>> {
        if self.done {
            return Ok(None);
        }

        let res = self.advance();
        if !matches!(res, Ok(Some(_))) {
            self.done = true;
        }
        res
    }

    fn advance(&mut self) -> Result<Option<EntryMeta>> {
        self.skip_content()?;

        let offset = self.position;
        let mut block: Block = [0u8; BLOCK_SIZE];
        if self.read_block(&mut block)? < BLOCK_SIZE {
            return Err(MalformedReason::TruncatedArchive {
                offset,
                what: "header",
            }
            .into());
        }

        if is_zero_block(&block) {
            let mut second: Block = [0u8; BLOCK_SIZE];
            if self.read_block(&mut second)? == BLOCK_SIZE && is_zero_block(&second) {
                debug!(offset, "reached end marker");
                self.end_marker = Some(offset);
                return Ok(None);
            }
            return Err(MalformedReason::UnexpectedEndMarker { offset }.into());
        }

        if self.config.verify_checksums {
            HeaderRecord::verify(&block, offset)?;
        }
        let record = HeaderRecord::parse(&block, offset)?;
        self.current = Some((offset, record.size));

        let meta = record.entry_meta(offset);
        debug!(name = %meta.name, size = meta.size, offset, "read header");
        Ok(Some(meta))
    }

    fn read_block(&mut self, block: &mut Block) -> Result<usize> {
        let n = read_full(&mut self.inner, block).at(&self.archive, Step::Read)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Moves past the content blocks of the entry last returned, if they
    /// have not been consumed.
    fn skip_content(&mut self) -> Result<()> {
        if let Some((_, size)) = self.current.take() {
            let len = content_blocks(size) * BLOCK_SIZE as u64;
            self.inner
                .seek(SeekFrom::Current(len as i64))
                .at(&self.archive, Step::Seek)?;
            self.position += len;
        }
        Ok(())
    }

    /// Copies the content of the entry last returned into `out`, then
    /// consumes its padding. `out_path` names `out` in errors. Returns the
    /// number of content bytes copied.
    pub fn copy_content<W: Write + ?Sized>(&mut self, out: &mut W, out_path: &Path) -> Result<u64> {
        let Some((offset, size)) = self.current.take() else {
            return Ok(0);
        };

        let mut remaining = size;
        let mut chunk: Block = [0u8; BLOCK_SIZE];
        while remaining > 0 {
            if self.read_block(&mut chunk)? < BLOCK_SIZE {
                self.done = true;
                return Err(MalformedReason::TruncatedArchive {
                    offset,
                    what: "content",
                }
                .into());
            }
            let n = remaining.min(BLOCK_SIZE as u64) as usize;
            out.write_all(&chunk[..n]).at(out_path, Step::Write)?;
            remaining -= n as u64;
        }

        Ok(size)
    }

    /// Walks to the end marker and returns its offset, with the metadata of
    /// every entry passed on the way.
    pub fn read_to_end_marker(&mut self) -> Result<(Vec<EntryMeta>, u64)> {
        let mut entries = vec![];
        while let Some(meta) = self.next_entry()? {
            entries.push(meta);
        }

        match self.end_marker {
            Some(offset) => Ok((entries, offset)),
            // only reachable after an earlier error ended the walk
            None => Err(ArchiveError::from(MalformedReason::TruncatedArchive {
                offset: self.position,
                what: "header",
            })),
        }
    }
}

impl<R: Read + Seek> Iterator for BlockReader<R> {
    type Item = Result<EntryMeta>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(name: &str, size: u64) -> Block {
        HeaderRecord::regular(name, size).to_block().unwrap()
    }

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = vec![];
        for (name, content) in entries {
            out.extend_from_slice(&header(name, content.len() as u64));
            out.extend_from_slice(content);
            out.resize(out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
        }
        out.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        out
    }

    fn reader(bytes: Vec<u8>) -> BlockReader<Cursor<Vec<u8>>> {
        BlockReader::new(Cursor::new(bytes), Path::new("test.tar"), ArchiveConfig::default())
    }

    fn names(bytes: Vec<u8>) -> Result<Vec<(String, u64)>> {
        reader(bytes)
            .map(|m| m.map(|m| (m.name, m.size)))
            .collect()
    }

    #[test]
    fn lists_entries_in_order() {
        let bytes = archive(&[("a.txt", b"hello"), ("b.txt", &[]), ("c.bin", &[1u8; 1500])]);
        assert_eq!(
            names(bytes).unwrap(),
            vec![
                ("a.txt".to_string(), 5),
                ("b.txt".to_string(), 0),
                ("c.bin".to_string(), 1500)
            ]
        );
    }

    #[test]
    fn empty_archive_consumes_exactly_two_blocks() {
        let mut r = reader(vec![0u8; 2 * BLOCK_SIZE]);
        assert!(r.next_entry().unwrap().is_none());
        assert_eq!(r.position(), 2 * BLOCK_SIZE as u64);
        assert_eq!(r.end_marker(), Some(0));
    }

    #[test]
    fn block_multiple_sizes_land_on_the_next_header() {
        let bytes = archive(&[("exact", &[3u8; 1024]), ("next", b"x")]);
        let mut r = reader(bytes);

        let first = r.next_entry().unwrap().unwrap();
        assert_eq!(first.content_blocks(), 2);
        let second = r.next_entry().unwrap().unwrap();
        assert_eq!(second.name, "next");
        assert_eq!(second.offset, 3 * BLOCK_SIZE as u64);
        assert!(r.next_entry().unwrap().is_none());
        assert_eq!(r.end_marker(), Some(5 * BLOCK_SIZE as u64));
    }

    #[test]
    fn lone_zero_block_is_malformed() {
        let mut bytes = archive(&[("a", b"1")]);
        // replace the end marker with one zero block and another header
        bytes.truncate(2 * BLOCK_SIZE);
        bytes.extend_from_slice(&[0u8; BLOCK_SIZE]);
        bytes.extend_from_slice(&header("b", 0));

        let err = names(bytes).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedArchive(MalformedReason::UnexpectedEndMarker { offset: 1024 })
        ));
    }

    #[test]
    fn zero_block_at_end_of_stream_is_malformed() {
        let mut bytes = archive(&[]);
        bytes.truncate(BLOCK_SIZE);
        let err = names(bytes).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedArchive(MalformedReason::UnexpectedEndMarker { offset: 0 })
        ));
    }

    #[test]
    fn short_header_is_truncation() {
        let mut bytes = archive(&[("a", b"1")]);
        bytes.truncate(2 * BLOCK_SIZE + 100);
        let err = names(bytes).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedArchive(MalformedReason::TruncatedArchive {
                offset: 1024,
                what: "header"
            })
        ));
    }

    #[test]
    fn name_starting_with_nul_is_not_an_end_marker() {
        let mut bytes = archive(&[("a", b"1")]);
        bytes[0] = 0;
        let mut r = BlockReader::new(
            Cursor::new(bytes),
            Path::new("t.tar"),
            ArchiveConfig::default().with_verify_checksums(false),
        );
        let meta = r.next_entry().unwrap().unwrap();
        assert_eq!(meta.name, "");
        assert_eq!(meta.size, 1);
        assert!(r.next_entry().unwrap().is_none());
    }

    #[test]
    fn checksum_mismatch_is_reported_unless_disabled() {
        let mut bytes = archive(&[("a.txt", b"1")]);
        bytes[0] = b'b';

        let err = names(bytes.clone()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedArchive(MalformedReason::BadChecksum { offset: 0, .. })
        ));

        let r = BlockReader::new(
            Cursor::new(bytes),
            Path::new("t.tar"),
            ArchiveConfig::default().with_verify_checksums(false),
        );
        let listed: Vec<_> = r.map(|m| m.unwrap().name).collect();
        assert_eq!(listed, vec!["b.txt".to_string()]);
    }

    #[test]
    fn iterator_stops_after_an_error() {
        let mut r = reader(vec![0u8; BLOCK_SIZE]);
        assert!(r.next().unwrap().is_err());
        assert!(r.next().is_none());
    }

    #[test]
    fn copy_content_returns_exact_bytes() {
        let payload: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        let bytes = archive(&[("one", &payload), ("two", b"second")]);
        let mut r = reader(bytes);

        r.next_entry().unwrap().unwrap();
        let mut out: Vec<u8> = vec![];
        assert_eq!(r.copy_content(&mut out, Path::new("one")).unwrap(), 700);
        assert_eq!(out, payload);

        let two = r.next_entry().unwrap().unwrap();
        let mut out: Vec<u8> = vec![];
        r.copy_content(&mut out, Path::new("two")).unwrap();
        assert_eq!(two.name, "two");
        assert_eq!(out, b"second");
    }

    #[test]
    fn truncated_content_is_reported() {
        let mut bytes = archive(&[("big", &[1u8; 2000])]);
        bytes.truncate(BLOCK_SIZE * 3);
        let mut r = reader(bytes);
        r.next_entry().unwrap().unwrap();
        let err = r.copy_content(&mut Vec::<u8>::new(), Path::new("big")).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedArchive(MalformedReason::TruncatedArchive {
                offset: 0,
                what: "content"
            })
        ));
    }

    #[test]
    fn read_to_end_marker_reports_marker_offset() {
        let bytes = archive(&[("a", b"abc"), ("b", &[0u8; 512])]);
        let (entries, end) = reader(bytes).read_to_end_marker().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(end, 4 * BLOCK_SIZE as u64);
    }
}
