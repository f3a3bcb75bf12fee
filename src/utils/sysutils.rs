//! The OS collaborators header building draws on: file metadata and
//! uid/gid to name resolution. Both sit behind traits so tests can
//! substitute their own answers.

use std::ffi::CStr;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::models::errormodels::{IoContext, Result, Step};

/// The subset of `stat(2)` a header needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: u64,
    pub dev_major: u64,
    pub dev_minor: u64,
    pub is_regular: bool,
}

pub trait MetadataProvider {
    fn stat(&self, path: &Path) -> Result<FileStat>;
}

pub trait IdentityResolver {
    fn uid_to_name(&self, uid: u32) -> Option<String>;
    fn gid_to_name(&self, gid: u32) -> Option<String>;
}

/// Both collaborators, borrowed for the length of one operation.
#[derive(Clone, Copy)]
pub struct System<'a> {
    pub metadata: &'a dyn MetadataProvider,
    pub identity: &'a dyn IdentityResolver,
}

impl System<'static> {
    pub fn os() -> Self {
        System {
            metadata: &OsMetadata,
            identity: &OsIdentity,
        }
    }
}

impl<'a> System<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider, identity: &'a dyn IdentityResolver) -> Self {
        System { metadata, identity }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsMetadata;

impl MetadataProvider for OsMetadata {
    fn stat(&self, path: &Path) -> Result<FileStat> {
        let md = fs::metadata(path).at(path, Step::Stat)?;
        let (dev_major, dev_minor) = split_dev(md.dev());

        Ok(FileStat {
            size: md.size(),
            mode: md.mode(),
            uid: md.uid(),
            gid: md.gid(),
            // pre-epoch timestamps have no octal representation
            mtime: md.mtime().max(0) as u64,
            dev_major,
            dev_minor,
            is_regular: md.file_type().is_file(),
        })
    }
}

/// `(st_dev, st_ino)` of `path`, or `None` if it cannot be stat'ed.
pub fn file_id(path: &Path) -> Option<(u64, u64)> {
    fs::metadata(path).ok().map(|md| (md.dev(), md.ino()))
}

/// Splits `st_dev` into (major, minor) using the Linux encoding.
pub fn split_dev(dev: u64) -> (u64, u64) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff);
    (major, minor)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsIdentity;

const INITIAL_BUF_LEN: usize = 1024;
const MAX_BUF_LEN: usize = 1 << 20;

/// Drives one of the reentrant `get*_r` lookups, doubling the scratch
/// buffer while the C library reports `ERANGE`.
fn lookup_name<T>(
    mut lookup: impl FnMut(&mut T, &mut [libc::c_char], &mut *mut T) -> libc::c_int,
    name_of: impl Fn(&T) -> *const libc::c_char,
) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; INITIAL_BUF_LEN];

    loop {
        // SAFETY: `passwd` and `group` are C structs of integers and pointers,
        // for which all-zero is a valid value.
        let mut entry: T = unsafe { std::mem::zeroed() };
        let mut result: *mut T = std::ptr::null_mut();

        let rc = lookup(&mut entry, &mut buf, &mut result);
        if rc == libc::ERANGE && buf.len() < MAX_BUF_LEN {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 || result.is_null() {
            return None;
        }

        let name = name_of(&entry);
        if name.is_null() {
            return None;
        }
        // SAFETY: on success the name points into `buf` and is NUL-terminated.
        let name = unsafe { CStr::from_ptr(name) };
        return Some(name.to_string_lossy().into_owned());
    }
}

impl IdentityResolver for OsIdentity {
    fn uid_to_name(&self, uid: u32) -> Option<String> {
        lookup_name(
            |pwd: &mut libc::passwd, buf: &mut [libc::c_char], result: &mut *mut libc::passwd| {
                // SAFETY: every pointer is valid for the duration of the call and
                // `buf.len()` is the true buffer length.
                unsafe { libc::getpwuid_r(uid, pwd, buf.as_mut_ptr(), buf.len(), result) }
            },
            |pwd: &libc::passwd| pwd.pw_name.cast_const(),
        )
    }

    fn gid_to_name(&self, gid: u32) -> Option<String> {
        lookup_name(
            |grp: &mut libc::group, buf: &mut [libc::c_char], result: &mut *mut libc::group| {
                // SAFETY: as above.
                unsafe { libc::getgrgid_r(gid, grp, buf.as_mut_ptr(), buf.len(), result) }
            },
            |grp: &libc::group| grp.gr_name.cast_const(),
        )
    }
}
