use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::models::errormodels::{ArchiveError, Result, Step};

/// Reads until `buf` is full or the stream ends, returning the byte count.
/// Unlike `read_exact`, a short count is not an error.
pub fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Replaces every directory in `paths` with the regular files below it,
/// in file-name order. Other paths pass through untouched, missing ones
/// included, so the engine reports them.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = vec![];

    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| walk_error(path, e))?;
            if entry.file_type().is_file() {
                expanded.push(entry.into_path());
            }
        }
    }

    Ok(expanded)
}

fn walk_error(root: &Path, e: walkdir::Error) -> ArchiveError {
    let path = e.path().unwrap_or(root).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(ErrorKind::Other, "filesystem loop"));
    ArchiveError::io(&path, Step::Read, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    /// Hands out at most three bytes per read.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.0.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_full_keeps_reading_short_chunks() {
        let data = [9u8; 20];
        let mut buf = [0u8; 16];
        assert_eq!(read_full(&mut Trickle(&data), &mut buf).unwrap(), 16);
        assert_eq!(buf, [9u8; 16]);
    }

    #[test]
    fn read_full_stops_at_end_of_stream() {
        let mut buf = [0u8; 16];
        let n = read_full(&mut Cursor::new(vec![1u8; 5]), &mut buf).unwrap();
        assert_eq!(n, 5);
    }

    #[test]
    fn directories_expand_to_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("sub").join("c.txt"), b"c").unwrap();
        let loose = dir.path().join("loose.txt");
        fs::write(&loose, b"l").unwrap();
        let missing = dir.path().join("missing.txt");

        let got = expand_paths(&[loose.clone(), root.clone(), missing.clone()]).unwrap();
        assert_eq!(
            got,
            vec![
                loose,
                root.join("a.txt"),
                root.join("b.txt"),
                root.join("sub").join("c.txt"),
                missing,
            ]
        );
    }
}
