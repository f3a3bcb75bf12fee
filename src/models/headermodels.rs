use crate::models::errormodels::MalformedReason;
use crate::utils::octalutils::{get_str, parse_octal, put_octal, put_str};

pub const BLOCK_SIZE: usize = 512;
pub const END_MARKER_BLOCKS: usize = 2;

pub const NAME_LEN: usize = 100;
pub const OWNER_NAME_LEN: usize = 32;

pub const MAGIC: &[u8; 6] = b"ustar\0";
pub const VERSION: &[u8; 2] = b"00";
pub const REGTYPE: u8 = b'0';

pub type Block = [u8; BLOCK_SIZE];

// byte ranges of the header fields we read or write
const NAME: (usize, usize) = (0, 100);
const MODE: (usize, usize) = (100, 108);
const UID: (usize, usize) = (108, 116);
const GID: (usize, usize) = (116, 124);
const SIZE: (usize, usize) = (124, 136);
const MTIME: (usize, usize) = (136, 148);
const CHKSUM: (usize, usize) = (148, 156);
const TYPEFLAG: usize = 156;
const MAGIC_FIELD: (usize, usize) = (257, 263);
const VERSION_FIELD: (usize, usize) = (263, 265);
const UNAME: (usize, usize) = (265, 297);
const GNAME: (usize, usize) = (297, 329);
const DEVMAJOR: (usize, usize) = (329, 337);
const DEVMINOR: (usize, usize) = (337, 345);

/// A value that could not be placed in its fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    Overflow {
        field: &'static str,
        value: u64,
        width: usize,
    },
}

/// One 512-byte USTAR header, as named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub name: Vec<u8>,
    pub mode: u64,
    pub uid: u64,
    pub gid: u64,
    pub size: u64,
    pub mtime: u64,
    pub typeflag: u8,
    pub uname: String,
    pub gname: String,
    pub devmajor: u64,
    pub devminor: u64,
}

/// What listing an entry reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub name: String,
    pub size: u64,
    pub mode: u64,
    pub mtime: u64,
    pub typeflag: u8,
    /// byte offset of the entry's header in the archive
    pub offset: u64,
}

impl EntryMeta {
    /// Regular files are marked `'0'`, or NUL by pre-POSIX writers.
    pub fn is_regular(&self) -> bool {
        self.typeflag == REGTYPE || self.typeflag == 0
    }

    /// Number of 512-byte blocks holding the content.
    pub fn content_blocks(&self) -> u64 {
        content_blocks(self.size)
    }
}

pub fn content_blocks(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64)
}

/// Zero bytes needed after `size` bytes of content to reach a block boundary.
pub fn padding_len(size: u64) -> usize {
    (content_blocks(size) * BLOCK_SIZE as u64 - size) as usize
}

pub fn is_zero_block(block: &Block) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Unsigned byte sum of `block` with the checksum field counted as eight spaces.
pub fn checksum(block: &Block) -> u64 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (CHKSUM.0..CHKSUM.1).contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(b)
            }
        })
        .sum()
}

fn octal_field(block: &mut Block, range: (usize, usize), field: &'static str, value: u64) -> Result<(), FieldError> {
    put_octal(&mut block[range.0..range.1], value).ok_or(FieldError::Overflow {
        field,
        value,
        width: range.1 - range.0,
    })
}

fn str_field(block: &mut Block, range: (usize, usize), field: &'static str, value: &[u8]) -> Result<(), FieldError> {
    put_str(&mut block[range.0..range.1], value).ok_or(FieldError::TooLong {
        field,
        len: value.len(),
        max: range.1 - range.0,
    })
}

fn read_octal(block: &Block, range: (usize, usize), field: &'static str, offset: u64) -> Result<u64, MalformedReason> {
    parse_octal(&block[range.0..range.1]).ok_or(MalformedReason::BadNumericField { field, offset })
}

impl HeaderRecord {
    /// A regular-file header with empty ownership and device fields.
    pub fn regular(name: impl Into<Vec<u8>>, size: u64) -> Self {
        Self {
            name: name.into(),
            mode: 0o644,
            uid: 0,
            gid: 0,
            size,
            mtime: 0,
            typeflag: REGTYPE,
            uname: String::new(),
            gname: String::new(),
            devmajor: 0,
            devminor: 0,
        }
    }

    /// Serializes the record. The checksum is computed last, over the fully
    /// populated block.
    pub fn to_block(&self) -> Result<Block, FieldError> {
        let mut block = [0u8; BLOCK_SIZE];

        str_field(&mut block, NAME, "name", &self.name)?;
        octal_field(&mut block, MODE, "mode", self.mode)?;
        octal_field(&mut block, UID, "uid", self.uid)?;
        octal_field(&mut block, GID, "gid", self.gid)?;
        octal_field(&mut block, SIZE, "size", self.size)?;
        octal_field(&mut block, MTIME, "mtime", self.mtime)?;
        block[TYPEFLAG] = self.typeflag;
        block[MAGIC_FIELD.0..MAGIC_FIELD.1].copy_from_slice(MAGIC);
        block[VERSION_FIELD.0..VERSION_FIELD.1].copy_from_slice(VERSION);
        str_field(&mut block, UNAME, "uname", self.uname.as_bytes())?;
        str_field(&mut block, GNAME, "gname", self.gname.as_bytes())?;
        octal_field(&mut block, DEVMAJOR, "devmajor", self.devmajor)?;
        octal_field(&mut block, DEVMINOR, "devminor", self.devminor)?;

        let sum = checksum(&block);
        octal_field(&mut block, CHKSUM, "chksum", sum)?;
        Ok(block)
    }

    /// Parses a header block found at `offset` in the archive.
    pub fn parse(block: &Block, offset: u64) -> Result<Self, MalformedReason> {
        Ok(Self {
            name: get_str(&block[NAME.0..NAME.1]).to_vec(),
            mode: read_octal(block, MODE, "mode", offset)?,
            uid: read_octal(block, UID, "uid", offset)?,
            gid: read_octal(block, GID, "gid", offset)?,
            size: read_octal(block, SIZE, "size", offset)?,
            mtime: read_octal(block, MTIME, "mtime", offset)?,
            typeflag: block[TYPEFLAG],
            uname: String::from_utf8_lossy(get_str(&block[UNAME.0..UNAME.1])).into_owned(),
            gname: String::from_utf8_lossy(get_str(&block[GNAME.0..GNAME.1])).into_owned(),
            devmajor: read_octal(block, DEVMAJOR, "devmajor", offset)?,
            devminor: read_octal(block, DEVMINOR, "devminor", offset)?,
        })
    }

    /// Checks the stored checksum against a fresh recomputation.
    pub fn verify(block: &Block, offset: u64) -> Result<(), MalformedReason> {
        let stored = read_octal(block, CHKSUM, "chksum", offset)?;
        let computed = checksum(block);
        if stored != computed {
            return Err(MalformedReason::BadChecksum {
                offset,
                stored,
                computed,
            });
        }
        Ok(())
    }

    pub fn stored_checksum(block: &Block) -> Option<u64> {
        parse_octal(&block[CHKSUM.0..CHKSUM.1])
    }

    pub fn entry_meta(&self, offset: u64) -> EntryMeta {
        EntryMeta {
            name: String::from_utf8_lossy(&self.name).into_owned(),
            size: self.size,
            mode: self.mode,
            mtime: self.mtime,
            typeflag: self.typeflag,
            offset,
        }
    }
}
