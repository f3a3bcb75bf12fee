//! A minimal archiver for the USTAR tar format.
//!
//! Regular files are packed into one archive, each as a 512-byte header
//! followed by its content padded to a block boundary, and the archive ends
//! with two all-zero blocks. Archives can be created, appended to, listed,
//! updated by modification time, and extracted.
//!
//! ```no_run
//! use std::path::Path;
//! use minitar::ArchiveConfig;
//!
//! let archive = Path::new("backup.tar");
//! minitar::create(archive, &["notes.txt", "todo.txt"])?;
//! minitar::append(archive, &["later.txt"], ArchiveConfig::default())?;
//!
//! for entry in minitar::list(archive, ArchiveConfig::default())? {
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//! # Ok::<(), minitar::ArchiveError>(())
//! ```

pub mod cli;
pub mod models;
pub mod ops;
pub mod utils;

pub use models::configmodels::ArchiveConfig;
pub use models::errormodels::{ArchiveError, MalformedReason, Result, Step};
pub use models::headermodels::{EntryMeta, HeaderRecord, BLOCK_SIZE};
pub use ops::append::{append, append_with};
pub use ops::create::{create, create_with};
pub use ops::extract::extract;
pub use ops::list::{entries, list};
pub use ops::update::{update, update_with};
pub use utils::sysutils::{FileStat, IdentityResolver, MetadataProvider, System};
