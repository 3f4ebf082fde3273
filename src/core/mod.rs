pub mod types;
pub mod sync;
pub mod config;
pub mod error;
pub mod stats;
