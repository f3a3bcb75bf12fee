pub mod commands;
pub mod exec;
