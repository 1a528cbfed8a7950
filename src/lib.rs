pub mod audio;
pub mod cli;
pub mod config;
pub mod conversion;
pub mod error;
pub mod global;
pub mod session;
pub mod storage;
