//! Directory tree scanner
//!
//! Walks one root through its file-operations provider and produces a
//! [`Snapshot`]: relative path -> signature, for regular files and
//! directories. Symbolic links are excluded by policy (cycles and ambiguous
//! semantics), as are the store's reserved temporary names and anything under
//! the state directory. The two per-side scans share no mutable state and run
//! concurrently.

use globset::GlobSet;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, warn};

use crate::baseline::Baseline;
use crate::fingerprint::{hash_reader, Fingerprint};
use crate::fsops::{EntryKind, FileOps, TMP_SUFFIX};

/// One live tree entry
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
	pub is_dir: bool,
	pub fingerprint: Fingerprint,
}

/// State of one root at scan time; rebuilt every run, discarded after use
#[derive(Debug, Default)]
pub struct Snapshot {
	entries: BTreeMap<String, SnapshotEntry>,
	/// Paths (and with them their subtrees) that could not be read this run
	skipped: BTreeSet<String>,
}

impl Snapshot {
	pub fn get(&self, path: &str) -> Option<&SnapshotEntry> {
		self.entries.get(path)
	}

	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(|k| k.as_str())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// True if the path or any of its ancestors failed to scan
	pub fn is_skipped(&self, path: &str) -> bool {
		if self.skipped.is_empty() {
			return false;
		}
		if self.skipped.contains(path) {
			return true;
		}
		let mut prefix = path;
		while let Some(pos) = prefix.rfind('/') {
			prefix = &prefix[..pos];
			if self.skipped.contains(prefix) {
				return true;
			}
		}
		false
	}

	pub fn skipped(&self) -> impl Iterator<Item = &str> {
		self.skipped.iter().map(|k| k.as_str())
	}
}

/// Scanner configuration shared by both sides
pub struct ScanOptions {
	/// User-supplied exclude patterns
	pub exclude: GlobSet,

	/// Absolute paths never scanned (the baseline state directory)
	pub reserved: Vec<PathBuf>,

	/// Rehash every file even when (size, mtime) match the baseline
	pub checksum_always: bool,
}

/// Walk one root and produce its snapshot
///
/// Fails only when the root itself cannot be listed; deeper read failures are
/// logged and recorded in `Snapshot::skipped`, so the affected paths are left
/// alone this run instead of being misread as deletions.
pub async fn scan(
	ops: &dyn FileOps,
	baseline: &Baseline,
	options: &ScanOptions,
) -> io::Result<Snapshot> {
	let mut snapshot = Snapshot::default();
	let entries = ops.list_dir(Path::new("")).await?;
	walk(ops, baseline, options, String::new(), entries, &mut snapshot).await;
	debug!("Scanned {}: {} entries", ops.root().display(), snapshot.len());
	Ok(snapshot)
}

fn walk<'a>(
	ops: &'a dyn FileOps,
	baseline: &'a Baseline,
	options: &'a ScanOptions,
	prefix: String,
	entries: Vec<crate::fsops::DirEntry>,
	snapshot: &'a mut Snapshot,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
	Box::pin(async move {
		for entry in entries {
			let key = if prefix.is_empty() {
				entry.name.clone()
			} else {
				format!("{}/{}", prefix, entry.name)
			};

			if entry.name.ends_with(TMP_SUFFIX) {
				continue;
			}
			if options.exclude.is_match(&key) {
				debug!("Excluded by pattern: {}", key);
				continue;
			}
			let abs = ops.root().join(&key);
			if options.reserved.iter().any(|r| abs.starts_with(r)) {
				continue;
			}

			match entry.meta.kind {
				EntryKind::SymLink => {
					debug!("Skipping symlink {}", key);
				}
				EntryKind::Other => {
					debug!("Skipping special file {}", key);
				}
				EntryKind::Dir => {
					snapshot
						.entries
						.insert(key.clone(), SnapshotEntry { is_dir: true, fingerprint: Fingerprint::Dir });
					match ops.list_dir(Path::new(&key)).await {
						Ok(children) => {
							walk(ops, baseline, options, key, children, snapshot).await;
						}
						Err(e) => {
							warn!("Cannot read directory {}: {}", key, e);
							snapshot.skipped.insert(key);
						}
					}
				}
				EntryKind::File => match file_fingerprint(ops, baseline, options, &key, &entry.meta).await {
					Ok(fingerprint) => {
						snapshot.entries.insert(key, SnapshotEntry { is_dir: false, fingerprint });
					}
					Err(e) => {
						warn!("Cannot read {}: {}", key, e);
						snapshot.skipped.insert(key);
					}
				},
			}
		}
	})
}

/// Fingerprint one file, reusing the baseline hash when (size, mtime) match
async fn file_fingerprint(
	ops: &dyn FileOps,
	baseline: &Baseline,
	options: &ScanOptions,
	key: &str,
	meta: &crate::fsops::EntryMeta,
) -> io::Result<Fingerprint> {
	if !options.checksum_always {
		if let Some(Fingerprint::File { size, mtime, hash }) =
			baseline.get(key).and_then(|r| r.fingerprint.as_ref())
		{
			if *size == meta.size && *mtime == meta.mtime {
				return Ok(Fingerprint::File { size: *size, mtime: *mtime, hash: *hash });
			}
		}
	}

	let reader = ops.open_read(Path::new(key)).await?;
	let (size, hash) = hash_reader(reader).await?;
	Ok(Fingerprint::File { size, mtime: meta.mtime, hash })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_skipped_covers_subtrees() {
		let mut snap = Snapshot::default();
		snap.skipped.insert("a/b".to_string());

		assert!(snap.is_skipped("a/b"));
		assert!(snap.is_skipped("a/b/c"));
		assert!(snap.is_skipped("a/b/c/d.txt"));
		assert!(!snap.is_skipped("a"));
		assert!(!snap.is_skipped("a/bc"));
	}
}

// vim: ts=4
