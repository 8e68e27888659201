pub mod blocks;
pub mod file;
pub mod idmap;

#[cfg(feature = "cli")]
pub mod cli;

pub use file::*;
