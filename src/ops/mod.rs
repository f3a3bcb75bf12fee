pub mod append;
pub mod create;
pub mod extract;
pub mod list;
pub mod update;
