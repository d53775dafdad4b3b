//! # minireg
//!
//! A clustered schema/metadata registry with:
//! - A partitioned, append-only, key-compacted journal as the single
//!   source of truth
//! - Deterministic replay: every node rebuilds the same state from the
//!   same records
//! - Synchronous writes bridged over asynchronous replication with
//!   correlation ids
//! - In-memory materialized state per node, read locally with no
//!   coordination
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │              Shared journal               │
//! │   (partitioned, append-only, compacted)   │
//! │    p0 ──▶  p1 ──▶  p2 ──▶  p3 ──▶         │
//! └──────────┬───────────────────┬────────────┘
//!            │ subscribe          │ subscribe
//!  ┌─────────▼─────────┐ ┌───────▼───────────┐
//!  │  Node A           │ │  Node B           │
//!  │  dispatch ─▶ sink │ │  dispatch ─▶ sink │
//!  │  ─▶ store (mem)   │ │  ─▶ store (mem)   │
//!  └───────────────────┘ └───────────────────┘
//! ```
//!
//! Every mutation is appended to the journal and applied by each
//! node's own dispatch loop; the submitting node blocks until its loop
//! has applied the record, so a caller always reads its own writes.
//!
//! ## Usage
//!
//! ### Start a node
//! ```bash
//! minireg-server serve \
//!   --config ./minireg.toml \
//!   --node-id node-1 \
//!   --data-dir ./minireg-data
//! ```
//!
//! ### Compact the journal offline
//! ```bash
//! minireg-server compact --data-dir ./minireg-data
//! ```
//!
//! ### Embed a node
//! ```no_run
//! use bytes::Bytes;
//! use minireg::store::model::ArtifactType;
//! use minireg::{Journal, RegistryConfig, RegistryStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> minireg::Result<()> {
//!     let config = RegistryConfig::default();
//!     let journal = Arc::new(Journal::open(&config.journal)?);
//!     let registry = RegistryStorage::start(journal, &config)?;
//!
//!     let meta = registry
//!         .create_artifact("default", "prices", ArtifactType::Avro, Bytes::from_static(b"{}"))
//!         .await?;
//!     println!("created version {} (global id {})", meta.version, meta.global_id);
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod engine;
pub mod journal;
pub mod store;

// Re-export commonly used types
pub use common::{Error, RegistryConfig, Result};
pub use engine::RegistryStorage;
pub use journal::Journal;
pub use store::{MemoryStore, RegistryStore};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
