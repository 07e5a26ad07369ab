//! Configuration file support
//!
//! Settings follow a priority chain: built-in defaults, then
//! `~/.config/treesync/config.toml`, then CLI flags (highest priority). The
//! file is optional; a missing file yields the defaults, a malformed one is
//! an error rather than a silent fallback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SyncError;

/// On-disk configuration, merged under the CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Baseline state directory (defaults to ~/.treesync)
	pub state_dir: Option<PathBuf>,

	/// Glob patterns to exclude from both trees
	pub exclude: Vec<String>,

	/// Worker pool width for copies
	pub parallel_transfers: usize,

	/// Always hash file contents instead of trusting (size, mtime)
	pub checksum_always: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			state_dir: None,
			exclude: Vec::new(),
			parallel_transfers: 4,
			checksum_always: false,
		}
	}
}

impl Config {
	/// Default config file location, if a home directory is known
	pub fn path() -> Option<PathBuf> {
		std::env::var_os("HOME")
			.map(|home| PathBuf::from(home).join(".config").join("treesync").join("config.toml"))
	}

	/// Load the config file if present, defaults otherwise
	pub fn load() -> Result<Config, SyncError> {
		let path = match Config::path() {
			Some(path) if path.exists() => path,
			_ => return Ok(Config::default()),
		};

		let contents = std::fs::read_to_string(&path).map_err(|e| SyncError::InvalidConfig {
			message: format!("Cannot read {}: {}", path.display(), e),
		})?;
		toml::from_str(&contents).map_err(|e| SyncError::InvalidConfig {
			message: format!("Cannot parse {}: {}", path.display(), e),
		})
	}
}


// vim: ts=4
