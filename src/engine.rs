//! Run orchestration: scan both sides, plan, execute, persist
//!
//! One logical run per invocation. The two scans run concurrently with no
//! shared mutable state; their results are joined per path by the reconciler;
//! the executor applies the plan and the baseline is flushed exactly once at
//! the end, whether or not the run was interrupted.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs as afs;
use tracing::{info, warn};

use crate::baseline::BaselineStore;
use crate::error::SyncError;
use crate::execute::Executor;
use crate::fsops::{FileOps, LocalFileOps};
use crate::reconcile::{plan, BaselineUpdate, Mode, Plan};
use crate::scan::{scan, ScanOptions};

/// Options for one reconciliation run
#[derive(Debug, Clone)]
pub struct SyncOptions {
	pub mode: Mode,

	/// Master side in Mirror/Backup mode
	pub left: PathBuf,
	pub right: PathBuf,

	/// Baseline location; defaults to ~/.treesync
	pub state_dir: Option<PathBuf>,

	/// Glob patterns excluded from both trees
	pub exclude: Vec<String>,

	/// Worker pool width for copies
	pub parallel_transfers: usize,

	/// Rehash every file instead of trusting (size, mtime)
	pub checksum_always: bool,

	/// Plan and report, touch nothing
	pub dry_run: bool,
}

impl SyncOptions {
	pub fn new(mode: Mode, left: PathBuf, right: PathBuf) -> Self {
		SyncOptions {
			mode,
			left,
			right,
			state_dir: None,
			exclude: Vec::new(),
			parallel_transfers: 4,
			checksum_always: false,
			dry_run: false,
		}
	}
}

/// What a run did (or, for a dry run, would do)
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
	pub scanned_left: usize,
	pub scanned_right: usize,

	/// Non-NoOp actions in the plan
	pub pending: usize,

	pub copied: usize,
	pub deleted: usize,

	/// Paths left conflicted after the run
	pub conflicts: usize,

	/// Paths whose action failed or that could not be scanned
	pub failed: usize,

	pub interrupted: bool,
}

/// Execute one reconciliation run over two local roots
pub async fn run(options: &SyncOptions) -> Result<SyncReport, SyncError> {
	let left_root = canonical_root(&options.left).await?;
	let right_root = canonical_root(&options.right).await?;
	let left_ops = LocalFileOps::new(left_root);
	let right_ops = LocalFileOps::new(right_root);
	run_with_providers(options, &left_ops, &right_ops).await
}

/// Execute one run against injected file-operations providers
///
/// The core only ever talks to the providers, so remote-backed roots plug in
/// here without changing any of the reconciliation logic. The providers'
/// roots are taken as the pair identity.
pub async fn run_with_providers(
	options: &SyncOptions,
	left_ops: &dyn FileOps,
	right_ops: &dyn FileOps,
) -> Result<SyncReport, SyncError> {
	let state_dir = match &options.state_dir {
		Some(dir) => dir.clone(),
		None => default_state_dir()?,
	};
	let exclude = build_globset(&options.exclude)?;

	// Lock and load before anything is touched; a corrupt baseline aborts here
	let mut store = BaselineStore::open(&state_dir, left_ops.root(), right_ops.root()).await?;

	let scan_options = ScanOptions {
		exclude,
		reserved: vec![state_dir.clone()],
		checksum_always: options.checksum_always,
	};

	info!(
		"Reconciling {} <-> {} ({} mode)",
		left_ops.root().display(),
		right_ops.root().display(),
		options.mode.as_str()
	);

	let (left_snap, right_snap) = tokio::join!(
		scan(left_ops, store.records(), &scan_options),
		scan(right_ops, store.records(), &scan_options),
	);
	let left_snap = left_snap.map_err(|e| SyncError::RootUnavailable {
		path: left_ops.root().display().to_string(),
		source: e,
	})?;
	let right_snap = right_snap.map_err(|e| SyncError::RootUnavailable {
		path: right_ops.root().display().to_string(),
		source: e,
	})?;

	let plan = plan(options.mode, store.records(), &left_snap, &right_snap);
	for path in &plan.unscanned {
		warn!("Not reconciling {} this run (scan failure)", path);
	}

	let mut report = SyncReport {
		scanned_left: left_snap.len(),
		scanned_right: right_snap.len(),
		pending: plan.pending(),
		failed: plan.unscanned.len(),
		..SyncReport::default()
	};

	if options.dry_run {
		for decision in &plan.decisions {
			if !decision.action.is_noop() {
				info!("Would {:?} {}", decision.action, decision.path);
			}
		}
		report.conflicts = planned_conflicts(&plan, &store);
		return Ok(report);
	}

	let cancel = Arc::new(AtomicBool::new(false));
	let watcher = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("Interrupt received, finishing in-flight actions...");
				cancel.store(true, Ordering::Relaxed);
			}
		})
	};

	let stats = {
		let mut executor =
			Executor::new(left_ops, right_ops, &mut store, options.parallel_transfers, cancel);
		executor.apply(plan.decisions).await
	};
	watcher.abort();

	store.flush().await?;

	report.copied = stats.copied;
	report.deleted = stats.deleted;
	report.failed += stats.failed;
	report.interrupted = stats.interrupted;
	report.conflicts = store.records().values().filter(|r| r.conflicted).count();

	info!(
		"Done: {} copied, {} deleted, {} conflicts, {} failed",
		report.copied, report.deleted, report.conflicts, report.failed
	);
	Ok(report)
}

/// Conflict count a dry run would leave behind
fn planned_conflicts(plan: &Plan, store: &BaselineStore) -> usize {
	plan.decisions
		.iter()
		.filter(|d| match &d.update {
			BaselineUpdate::Set(record) => record.conflicted,
			BaselineUpdate::Drop => false,
			BaselineUpdate::Keep => {
				store.records().get(&d.path).map(|r| r.conflicted).unwrap_or(false)
			}
		})
		.count()
}

async fn canonical_root(path: &Path) -> Result<PathBuf, SyncError> {
	let canonical = afs::canonicalize(path).await.map_err(|e| SyncError::RootUnavailable {
		path: path.display().to_string(),
		source: e,
	})?;
	let meta = afs::metadata(&canonical).await.map_err(|e| SyncError::RootUnavailable {
		path: path.display().to_string(),
		source: e,
	})?;
	if !meta.is_dir() {
		return Err(SyncError::RootUnavailable {
			path: path.display().to_string(),
			source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
		});
	}
	Ok(canonical)
}

fn default_state_dir() -> Result<PathBuf, SyncError> {
	match std::env::var_os("HOME") {
		Some(home) => Ok(PathBuf::from(home).join(".treesync")),
		None => Err(SyncError::InvalidConfig {
			message: "Could not determine HOME directory!".to_string(),
		}),
	}
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, SyncError> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| SyncError::InvalidConfig {
			message: format!("Invalid exclude pattern '{}': {}", pattern, e),
		})?;
		builder.add(glob);
	}
	builder.build().map_err(|e| SyncError::InvalidConfig {
		message: format!("Invalid exclude patterns: {}", e),
	})
}

// vim: ts=4
