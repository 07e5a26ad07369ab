//! Error types for treesync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for reconciliation runs
#[derive(Debug)]
pub enum SyncError {
	/// A scanned root is missing or unreadable (fatal, nothing touched)
	RootUnavailable { path: String, source: io::Error },

	/// Baseline state error (nested)
	State(StateError),

	/// Invalid configuration or command line
	InvalidConfig { message: String },

	/// I/O error outside the per-path recovery scope
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::RootUnavailable { path, source } => {
				write!(f, "Root {} is not available: {}", path, source)
			}
			SyncError::State(e) => write!(f, "State error: {}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<StateError> for SyncError {
	fn from(e: StateError) -> Self {
		SyncError::State(e)
	}
}

/// Baseline store errors
#[derive(Debug)]
pub enum StateError {
	/// Failed to load the baseline
	LoadFailed { source: Box<dyn Error + Send + Sync> },

	/// Failed to persist the baseline
	SaveFailed { source: Box<dyn Error + Send + Sync> },

	/// The persisted baseline cannot be parsed (fatal, aborts the run)
	Corrupted { message: String },

	/// Another invocation holds the pair lock
	LockFailed { message: String },

	/// State directory cannot be used
	InvalidDirectory { path: String },
}

impl fmt::Display for StateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateError::LoadFailed { source } => write!(f, "Failed to load baseline: {}", source),
			StateError::SaveFailed { source } => write!(f, "Failed to save baseline: {}", source),
			StateError::Corrupted { message } => write!(f, "Baseline corrupted: {}", message),
			StateError::LockFailed { message } => write!(f, "Lock failed: {}", message),
			StateError::InvalidDirectory { path } => {
				write!(f, "Invalid state directory: {}", path)
			}
		}
	}
}

impl Error for StateError {}

// vim: ts=4
