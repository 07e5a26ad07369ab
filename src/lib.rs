//! # treesync - Two-Tree Directory Reconciler
//!
//! treesync keeps two directory trees consistent without a central server,
//! tolerating independent edits on either side between runs. Each run detects
//! what changed on each side since the previous successful run, resolves the
//! changes under one of three policies (bidirectional sync, mirror, backup),
//! and persists a baseline so the next run can repeat the process.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use treesync::{run, Mode, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SyncOptions::new(Mode::Sync, "./dir1".into(), "./dir2".into());
//!     let report = run(&options).await?;
//!     println!("Copied {} files, {} conflicts", report.copied, report.conflicts);
//!     Ok(())
//! }
//! ```
//!
//! Conflicts (both sides changed to different content) are not errors: both
//! versions stay on disk, the path is marked in the baseline, and the mark
//! clears by itself once the two sides agree again.

pub mod baseline;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod execute;
pub mod fingerprint;
pub mod fsops;
pub mod logging;
pub mod reconcile;
pub mod scan;

// Re-export commonly used types and functions
pub use engine::{run, run_with_providers, SyncOptions, SyncReport};
pub use error::{StateError, SyncError};
pub use fingerprint::Fingerprint;
pub use reconcile::{Action, Mode};

// vim: ts=4
