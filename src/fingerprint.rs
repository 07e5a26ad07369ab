//! File fingerprints used to detect change without full byte comparison
//!
//! A fingerprint is compared only for equality, never ordered. For regular
//! files it carries the BLAKE3 content hash plus the size, so two fingerprints
//! are equal exactly when the contents are equal. The modification time rides
//! along so the scanner can skip rehashing files whose (size, mtime) still
//! match the baseline; it does not participate in equality, because the same
//! content on two sides legitimately carries two different timestamps until a
//! copy propagates it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer size for hashing and copying
pub const IO_BUF_SIZE: usize = 65536;

/// Content signature of one tree entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fingerprint {
	/// Directories carry no content; they all compare equal
	Dir,

	/// Regular file signature
	File {
		size: u64,
		mtime: i64,
		#[serde(with = "hex::serde")]
		hash: [u8; 32],
	},
}

impl PartialEq for Fingerprint {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Fingerprint::Dir, Fingerprint::Dir) => true,
			(
				Fingerprint::File { size: s1, hash: h1, .. },
				Fingerprint::File { size: s2, hash: h2, .. },
			) => s1 == s2 && h1 == h2,
			_ => false,
		}
	}
}

impl Eq for Fingerprint {}

impl Fingerprint {
	pub fn is_dir(&self) -> bool {
		matches!(self, Fingerprint::Dir)
	}

	/// Modification time carried by a file fingerprint
	pub fn mtime(&self) -> Option<i64> {
		match self {
			Fingerprint::File { mtime, .. } => Some(*mtime),
			Fingerprint::Dir => None,
		}
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Fingerprint::Dir => write!(f, "dir"),
			Fingerprint::File { size, hash, .. } => {
				write!(f, "file:{}:{}", size, &hex::encode(hash)[..12])
			}
		}
	}
}

/// Hash a byte stream, returning the number of bytes read and the digest
pub async fn hash_reader<R: AsyncRead + Unpin>(
	mut reader: R,
) -> std::io::Result<(u64, [u8; 32])> {
	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; IO_BUF_SIZE];
	let mut total: u64 = 0;

	loop {
		let n = reader.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
		total += n as u64;
	}

	Ok((total, *hasher.finalize().as_bytes()))
}

/// Hash a byte slice (used by tests and small writes)
pub fn hash_bytes(buf: &[u8]) -> [u8; 32] {
	*blake3::hash(buf).as_bytes()
}


// vim: ts=4
