//! Common utilities and types shared across minireg

pub mod config;
pub mod error;
pub mod hash;

pub use config::{EngineConfig, JournalConfig, RegistryConfig, SyncPolicy};
pub use error::{Error, Result};
pub use hash::{content_hash, crc32, partition_for_key};
