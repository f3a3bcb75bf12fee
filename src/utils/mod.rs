pub mod headerutils;
pub mod ioutils;
pub mod octalutils;
pub mod readerutils;
pub mod sysutils;
pub mod writerutils;
