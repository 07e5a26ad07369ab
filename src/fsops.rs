//! File-operations provider abstraction
//!
//! The engine core never touches `std::fs` directly: every stat, read, write
//! and delete goes through the [`FileOps`] trait, so a remote-backed provider
//! can be dropped in without changing the reconciliation logic. [`LocalFileOps`]
//! is the shipped local-disk implementation.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::fs as afs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::fingerprint::{Fingerprint, IO_BUF_SIZE};

/// Suffix for in-flight temporary files; the scanner always excludes these
pub const TMP_SUFFIX: &str = ".TreeSync-TmP";

/// Entry kind as seen by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	File,
	Dir,
	SymLink,
	Other,
}

/// Stat result for one directory entry
#[derive(Debug, Clone)]
pub struct EntryMeta {
	pub kind: EntryKind,
	pub size: u64,
	pub mtime: i64,
}

/// One listed child of a directory
#[derive(Debug, Clone)]
pub struct DirEntry {
	pub name: String,
	pub meta: EntryMeta,
}

/// Byte stream handed out by a provider
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Primitive file operations against one tree root
#[async_trait]
pub trait FileOps: Send + Sync {
	/// Absolute root this provider serves (for logging and reserved-path checks)
	fn root(&self) -> &Path;

	/// Stat a relative path; `None` if it does not exist
	async fn metadata(&self, rel: &Path) -> io::Result<Option<EntryMeta>>;

	/// List the children of a relative directory path
	async fn list_dir(&self, rel: &Path) -> io::Result<Vec<DirEntry>>;

	/// Open a relative file path for reading
	async fn open_read(&self, rel: &Path) -> io::Result<FileReader>;

	/// Write a file from a byte stream, atomically (temp + rename)
	///
	/// The stream is hashed while it is written; if the digest or size does
	/// not match `expect`, the temporary file is removed and no rename
	/// happens, so a half-copied or concurrently mutated source never becomes
	/// visible. The destination mtime is set to the fingerprint's mtime so
	/// that both sides agree on the signature afterwards.
	async fn write_file(
		&self,
		rel: &Path,
		reader: FileReader,
		expect: &Fingerprint,
	) -> io::Result<()>;

	/// Create a directory and any missing parents
	async fn create_dir_all(&self, rel: &Path) -> io::Result<()>;

	/// Remove a file or an (empty) directory; absent paths count as removed
	async fn remove_entry(&self, rel: &Path) -> io::Result<()>;
}

/// Local filesystem provider
pub struct LocalFileOps {
	root: PathBuf,
}

impl LocalFileOps {
	pub fn new(root: PathBuf) -> Self {
		LocalFileOps { root }
	}

	fn full(&self, rel: &Path) -> PathBuf {
		self.root.join(rel)
	}
}

fn meta_of(meta: &std::fs::Metadata) -> EntryMeta {
	use std::os::unix::fs::MetadataExt;

	let kind = if meta.is_dir() {
		EntryKind::Dir
	} else if meta.is_file() {
		EntryKind::File
	} else if meta.file_type().is_symlink() {
		EntryKind::SymLink
	} else {
		EntryKind::Other
	};
	EntryMeta { kind, size: meta.size(), mtime: meta.mtime() }
}

#[async_trait]
impl FileOps for LocalFileOps {
	fn root(&self) -> &Path {
		&self.root
	}

	async fn metadata(&self, rel: &Path) -> io::Result<Option<EntryMeta>> {
		match afs::symlink_metadata(self.full(rel)).await {
			Ok(meta) => Ok(Some(meta_of(&meta))),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e),
		}
	}

	async fn list_dir(&self, rel: &Path) -> io::Result<Vec<DirEntry>> {
		let mut entries = Vec::new();
		let mut dir = afs::read_dir(self.full(rel)).await?;

		while let Some(entry) = dir.next_entry().await? {
			let name = match entry.file_name().into_string() {
				Ok(name) => name,
				Err(name) => {
					debug!("Skipping non-UTF8 name {:?} in {}", name, rel.display());
					continue;
				}
			};
			// symlink_metadata so links are reported as links, not followed
			let meta = afs::symlink_metadata(entry.path()).await?;
			entries.push(DirEntry { name, meta: meta_of(&meta) });
		}

		Ok(entries)
	}

	async fn open_read(&self, rel: &Path) -> io::Result<FileReader> {
		let file = afs::File::open(self.full(rel)).await?;
		Ok(Box::new(file))
	}

	async fn write_file(
		&self,
		rel: &Path,
		mut reader: FileReader,
		expect: &Fingerprint,
	) -> io::Result<()> {
		let (want_size, want_hash, mtime) = match expect {
			Fingerprint::File { size, hash, mtime } => (*size, *hash, *mtime),
			Fingerprint::Dir => {
				return Err(io::Error::new(
					io::ErrorKind::InvalidInput,
					"write_file called with a directory fingerprint",
				))
			}
		};

		let full_path = self.full(rel);
		let mut tmp_name = full_path
			.file_name()
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no filename"))?
			.to_os_string();
		tmp_name.push(TMP_SUFFIX);
		let tmp_path = full_path.with_file_name(tmp_name);

		let mut file = afs::File::create(&tmp_path).await?;
		let mut hasher = blake3::Hasher::new();
		let mut buf = vec![0u8; IO_BUF_SIZE];
		let mut total: u64 = 0;

		let result = loop {
			let n = match reader.read(&mut buf).await {
				Ok(n) => n,
				Err(e) => break Err(e),
			};
			if n == 0 {
				break Ok(());
			}
			hasher.update(&buf[..n]);
			total += n as u64;
			if let Err(e) = file.write_all(&buf[..n]).await {
				break Err(e);
			}
		};

		if let Err(e) = result {
			drop(file);
			let _ = afs::remove_file(&tmp_path).await;
			return Err(e);
		}

		let digest = *hasher.finalize().as_bytes();
		if total != want_size || digest != want_hash {
			drop(file);
			let _ = afs::remove_file(&tmp_path).await;
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				format!("source changed during copy of {}", rel.display()),
			));
		}

		file.flush().await?;
		file.sync_all().await?;

		// Propagate the source mtime so the signature matches on both sides
		let std_file = file.into_std().await;
		if mtime >= 0 {
			let _ = std_file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime as u64));
		}
		drop(std_file);

		afs::rename(&tmp_path, &full_path).await
	}

	async fn create_dir_all(&self, rel: &Path) -> io::Result<()> {
		afs::create_dir_all(self.full(rel)).await
	}

	async fn remove_entry(&self, rel: &Path) -> io::Result<()> {
		let full_path = self.full(rel);

		match afs::symlink_metadata(&full_path).await {
			Ok(meta) if meta.is_dir() => afs::remove_dir(&full_path).await,
			Ok(_) => afs::remove_file(&full_path).await,
			// Already gone counts as removed
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fingerprint::hash_bytes;
	use std::io::Cursor;
	use tempfile::TempDir;

	fn fp_of(content: &[u8], mtime: i64) -> Fingerprint {
		Fingerprint::File { size: content.len() as u64, mtime, hash: hash_bytes(content) }
	}

	#[tokio::test]
	async fn test_write_then_read_round_trip() {
		let dir = TempDir::new().unwrap();
		let ops = LocalFileOps::new(dir.path().to_path_buf());
		let content = b"round trip".to_vec();

		ops.write_file(Path::new("f.txt"), Box::new(Cursor::new(content.clone())), &fp_of(&content, 1000))
			.await
			.unwrap();

		let meta = ops.metadata(Path::new("f.txt")).await.unwrap().unwrap();
		assert_eq!(meta.kind, EntryKind::File);
		assert_eq!(meta.size, 10);
		assert_eq!(meta.mtime, 1000);

		let mut reader = ops.open_read(Path::new("f.txt")).await.unwrap();
		let mut back = Vec::new();
		reader.read_to_end(&mut back).await.unwrap();
		assert_eq!(back, content);
	}

	#[tokio::test]
	async fn test_write_rejects_mismatched_content() {
		let dir = TempDir::new().unwrap();
		let ops = LocalFileOps::new(dir.path().to_path_buf());
		let content = b"actual bytes".to_vec();

		let err = ops
			.write_file(Path::new("f.txt"), Box::new(Cursor::new(content)), &fp_of(b"expected", 0))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidData);

		// Neither the file nor its temporary may survive
		assert!(ops.metadata(Path::new("f.txt")).await.unwrap().is_none());
		let leftovers = ops.list_dir(Path::new("")).await.unwrap();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn test_remove_entry_is_idempotent() {
		let dir = TempDir::new().unwrap();
		let ops = LocalFileOps::new(dir.path().to_path_buf());

		ops.create_dir_all(Path::new("d")).await.unwrap();
		ops.remove_entry(Path::new("d")).await.unwrap();
		ops.remove_entry(Path::new("d")).await.unwrap();
		ops.remove_entry(Path::new("never-existed")).await.unwrap();
	}
}

// vim: ts=4
