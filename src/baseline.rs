//! Baseline store: the last agreed state per path, persisted between runs
//!
//! One JSON file per working-directory pair, keyed by an order-independent
//! hash of both canonical roots, lives under the state directory (outside the
//! synchronized trees). The file is replaced with a write-temp-then-rename
//! discipline, so a crash mid-flush leaves either the old or the new baseline
//! intact. An advisory lock file serializes concurrent invocations on the
//! same pair.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StateError;
use crate::fingerprint::Fingerprint;

/// Last agreed state of one tracked path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
	/// Signature both sides agreed on; `None` marks a known-deleted path
	pub fingerprint: Option<Fingerprint>,

	/// Both sides diverged from this record and neither may be touched
	#[serde(default)]
	pub conflicted: bool,
}

impl BaselineRecord {
	pub fn agreed(fingerprint: Fingerprint) -> Self {
		BaselineRecord { fingerprint: Some(fingerprint), conflicted: false }
	}
}

/// Full baseline for one pair, keyed by relative path
pub type Baseline = BTreeMap<String, BaselineRecord>;

/// On-disk shape of the baseline file
#[derive(Serialize, Deserialize)]
struct BaselineFile {
	version: u32,
	records: Baseline,
}

const BASELINE_VERSION: u32 = 1;

/// Identity of a directory pair, independent of argument order
pub fn pair_key(left: &Path, right: &Path) -> String {
	use std::os::unix::ffi::OsStrExt;

	let (a, b) = if left.as_os_str().as_bytes() <= right.as_os_str().as_bytes() {
		(left, right)
	} else {
		(right, left)
	};

	let mut hasher = blake3::Hasher::new();
	hasher.update(a.as_os_str().as_bytes());
	hasher.update(b"\0");
	hasher.update(b.as_os_str().as_bytes());
	URL_SAFE_NO_PAD.encode(&hasher.finalize().as_bytes()[..16])
}

/// Owner of the persisted baseline for one pair
///
/// Holds the advisory lock for its whole lifetime; all mutation goes through
/// [`BaselineStore::commit`] and durability through [`BaselineStore::flush`].
pub struct BaselineStore {
	state_dir: PathBuf,
	pair_key: String,
	records: Baseline,
	dirty: bool,
	_lock: StateLock,
}

impl BaselineStore {
	/// Lock and load the baseline for a pair of canonical roots
	///
	/// A missing baseline file means a first run and yields an empty baseline;
	/// an unparsable one is fatal and aborts before any tree is touched.
	pub async fn open(
		state_dir: &Path,
		left: &Path,
		right: &Path,
	) -> Result<BaselineStore, StateError> {
		afs::create_dir_all(state_dir).await.map_err(|_| StateError::InvalidDirectory {
			path: state_dir.display().to_string(),
		})?;

		let key = pair_key(left, right);
		let lock = StateLock::acquire(state_dir.join(format!("{}.lock", key))).await?;

		let path = state_dir.join(format!("{}.json", key));
		let records = match afs::read_to_string(&path).await {
			Ok(contents) => {
				let file: BaselineFile =
					serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
						message: format!("{}: {}", path.display(), e),
					})?;
				file.records
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!("No baseline at {}, starting empty", path.display());
				Baseline::new()
			}
			Err(e) => return Err(StateError::LoadFailed { source: Box::new(e) }),
		};

		Ok(BaselineStore {
			state_dir: state_dir.to_path_buf(),
			pair_key: key,
			records,
			dirty: false,
			_lock: lock,
		})
	}

	pub fn records(&self) -> &Baseline {
		&self.records
	}

	/// Update or remove one record; safe to call many times during a run
	pub fn commit(&mut self, path: &str, record: Option<BaselineRecord>) {
		match record {
			Some(record) => {
				self.records.insert(path.to_string(), record);
			}
			None => {
				self.records.remove(path);
			}
		}
		self.dirty = true;
	}

	/// Durably persist the baseline (write temp, fsync, rename)
	pub async fn flush(&mut self) -> Result<(), StateError> {
		if !self.dirty {
			return Ok(());
		}

		let path = self.state_path();
		let tmp_path = self.state_dir.join(format!("{}.json.tmp", self.pair_key));
		let file = BaselineFile { version: BASELINE_VERSION, records: self.records.clone() };
		let json = serde_json::to_vec_pretty(&file)
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;

		let save_err = |e: std::io::Error| StateError::SaveFailed { source: Box::new(e) };
		let mut out = afs::File::create(&tmp_path).await.map_err(save_err)?;
		out.write_all(&json).await.map_err(save_err)?;
		out.sync_all().await.map_err(save_err)?;
		drop(out);
		afs::rename(&tmp_path, &path).await.map_err(save_err)?;

		self.dirty = false;
		Ok(())
	}

	pub fn state_path(&self) -> PathBuf {
		self.state_dir.join(format!("{}.json", self.pair_key))
	}
}

/// RAII guard for exclusive access to one pair's baseline
pub struct StateLock {
	path: PathBuf,
}

impl StateLock {
	async fn acquire(path: PathBuf) -> Result<StateLock, StateError> {
		let mut options = afs::OpenOptions::new();
		options.write(true).create_new(true);

		match options.open(&path).await {
			Ok(mut file) => {
				let _ = file.write_all(std::process::id().to_string().as_bytes()).await;
				Ok(StateLock { path })
			}
			Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
				Err(StateError::LockFailed {
					message: format!(
						"Sync already in progress (lock file exists). If stale, delete: {}",
						path.display()
					),
				})
			}
			Err(e) => Err(StateError::LockFailed {
				message: format!("Failed to create lock file: {}", e),
			}),
		}
	}
}

impl Drop for StateLock {
	fn drop(&mut self) {
		// Remove lock file on drop (whether success or failure)
		let _ = std::fs::remove_file(&self.path);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fingerprint::hash_bytes;
	use tempfile::TempDir;

	fn fp(content: &[u8]) -> Fingerprint {
		Fingerprint::File { size: content.len() as u64, mtime: 1000, hash: hash_bytes(content) }
	}

	#[test]
	fn test_pair_key_is_order_independent() {
		let a = Path::new("/tmp/dir1");
		let b = Path::new("/tmp/dir2");
		assert_eq!(pair_key(a, b), pair_key(b, a));
		assert_ne!(pair_key(a, b), pair_key(a, Path::new("/tmp/dir3")));
	}

	#[tokio::test]
	async fn test_commit_flush_reload() {
		let state = TempDir::new().unwrap();
		let left = Path::new("/l");
		let right = Path::new("/r");

		let mut store = BaselineStore::open(state.path(), left, right).await.unwrap();
		assert!(store.records().is_empty());
		store.commit("a.txt", Some(BaselineRecord::agreed(fp(b"a"))));
		store.commit("gone.txt", Some(BaselineRecord::agreed(fp(b"g"))));
		store.commit("gone.txt", None);
		store.flush().await.unwrap();
		drop(store);

		let store = BaselineStore::open(state.path(), right, left).await.unwrap();
		assert_eq!(store.records().len(), 1);
		assert_eq!(store.records()["a.txt"], BaselineRecord::agreed(fp(b"a")));
		// No leftover temp file from the flush
		let names: Vec<_> = std::fs::read_dir(state.path())
			.unwrap()
			.map(|e| e.unwrap().file_name().into_string().unwrap())
			.collect();
		assert!(names.iter().all(|n| !n.ends_with(".tmp")), "leftover temp: {:?}", names);
	}

	#[tokio::test]
	async fn test_corrupt_baseline_is_fatal() {
		let state = TempDir::new().unwrap();
		let left = Path::new("/l");
		let right = Path::new("/r");
		let key = pair_key(left, right);
		std::fs::write(state.path().join(format!("{}.json", key)), b"{not json").unwrap();

		match BaselineStore::open(state.path(), left, right).await {
			Err(StateError::Corrupted { .. }) => {}
			other => panic!("expected Corrupted, got {:?}", other.map(|_| ())),
		}
	}

	#[tokio::test]
	async fn test_lock_rejects_second_invocation() {
		let state = TempDir::new().unwrap();
		let left = Path::new("/l");
		let right = Path::new("/r");

		let store = BaselineStore::open(state.path(), left, right).await.unwrap();
		match BaselineStore::open(state.path(), left, right).await {
			Err(StateError::LockFailed { .. }) => {}
			other => panic!("expected LockFailed, got {:?}", other.map(|_| ())),
		}
		drop(store);

		// Lock is released on drop
		BaselineStore::open(state.path(), left, right).await.unwrap();
	}
}

// vim: ts=4
