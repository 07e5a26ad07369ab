//! Action executor
//!
//! Applies a plan against both trees through the file-operations providers.
//! Copies run on a bounded worker pool; actions on distinct paths are
//! independent, and every file copy creates its own destination parents, so
//! the only intra-path ordering constraint holds without cross-task
//! coordination. All baseline commits happen on the single consumer loop that
//! owns the store, and a successful action commits its record immediately, so
//! an interrupted run keeps every bit of applied progress.

use futures::stream::{FuturesUnordered, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::baseline::BaselineStore;
use crate::fingerprint::Fingerprint;
use crate::fsops::{EntryKind, FileOps};
use crate::reconcile::{Action, BaselineUpdate, Decision};

/// Outcome counters for one run's execution
#[derive(Debug, Default, Clone)]
pub struct ExecStats {
	pub copied: usize,
	pub deleted: usize,
	pub failed: usize,
	pub interrupted: bool,
}

/// Applies decisions and owns all baseline commits for the run
pub struct Executor<'a> {
	left: &'a dyn FileOps,
	right: &'a dyn FileOps,
	store: &'a mut BaselineStore,
	parallel: usize,
	cancel: Arc<AtomicBool>,
}

impl<'a> Executor<'a> {
	pub fn new(
		left: &'a dyn FileOps,
		right: &'a dyn FileOps,
		store: &'a mut BaselineStore,
		parallel: usize,
		cancel: Arc<AtomicBool>,
	) -> Self {
		Executor { left, right, store, parallel: parallel.max(1), cancel }
	}

	/// Apply every decision; does not flush (the engine owns that boundary)
	pub async fn apply(&mut self, decisions: Vec<Decision>) -> ExecStats {
		let mut stats = ExecStats::default();
		let mut copies = Vec::new();
		let mut deletes = Vec::new();

		for decision in decisions {
			match decision.action {
				Action::NoOp => self.commit(&decision.path, decision.update),
				Action::MarkConflict => {
					warn!("Conflict: {} (both sides changed, leaving both in place)", decision.path);
					self.commit(&decision.path, decision.update);
				}
				Action::CopyLeftToRight { .. } | Action::CopyRightToLeft { .. } => {
					copies.push(decision)
				}
				Action::DeleteOnLeft | Action::DeleteOnRight => deletes.push(decision),
			}
		}

		self.run_copies(copies, &mut stats).await;
		self.run_deletes(deletes, &mut stats).await;

		if self.cancel.load(Ordering::Relaxed) {
			stats.interrupted = true;
			info!("Interrupted; applied work is committed, the rest is picked up next run");
		}
		stats
	}

	fn commit(&mut self, path: &str, update: BaselineUpdate) {
		match update {
			BaselineUpdate::Keep => {}
			BaselineUpdate::Set(record) => self.store.commit(path, Some(record)),
			BaselineUpdate::Drop => self.store.commit(path, None),
		}
	}

	/// Copies run concurrently; commits land on this single consumer loop
	async fn run_copies(&mut self, copies: Vec<Decision>, stats: &mut ExecStats) {
		let left = self.left;
		let right = self.right;
		let cancel = self.cancel.clone();
		let parallel = self.parallel;

		let mut queue = copies.into_iter();
		let mut in_flight = FuturesUnordered::new();

		loop {
			while in_flight.len() < parallel && !cancel.load(Ordering::Relaxed) {
				match queue.next() {
					Some(decision) => in_flight.push(copy_one(left, right, decision)),
					None => break,
				}
			}
			match in_flight.next().await {
				Some((decision, Ok(()))) => {
					stats.copied += 1;
					self.commit(&decision.path, decision.update);
				}
				Some((decision, Err(e))) => {
					warn!("Copy failed for {}: {}", decision.path, e);
					stats.failed += 1;
				}
				None => break,
			}
		}
	}

	/// Deletes run children-first so directories are empty when their turn comes
	async fn run_deletes(&mut self, mut deletes: Vec<Decision>, stats: &mut ExecStats) {
		deletes.sort_by_key(|d| std::cmp::Reverse(d.path.matches('/').count()));

		for decision in deletes {
			if self.cancel.load(Ordering::Relaxed) {
				break;
			}
			let ops = match decision.action {
				Action::DeleteOnLeft => self.left,
				Action::DeleteOnRight => self.right,
				_ => unreachable!("only deletes are queued here"),
			};
			debug!("{:?} {}", decision.action, decision.path);
			match ops.remove_entry(Path::new(&decision.path)).await {
				Ok(()) => {
					stats.deleted += 1;
					self.commit(&decision.path, decision.update);
				}
				Err(e) => {
					warn!("Delete failed for {}: {}", decision.path, e);
					stats.failed += 1;
				}
			}
		}
	}
}

/// Perform one copy action end to end
async fn copy_one(
	left: &dyn FileOps,
	right: &dyn FileOps,
	decision: Decision,
) -> (Decision, std::io::Result<()>) {
	let (src, dst, fingerprint) = match &decision.action {
		Action::CopyLeftToRight { fingerprint } => (left, right, fingerprint.clone()),
		Action::CopyRightToLeft { fingerprint } => (right, left, fingerprint.clone()),
		_ => unreachable!("only copies are queued here"),
	};

	debug!("{:?} {}", decision.action, decision.path);
	let result = transfer(src, dst, &decision.path, &fingerprint).await;
	(decision, result)
}

async fn transfer(
	src: &dyn FileOps,
	dst: &dyn FileOps,
	path: &str,
	fingerprint: &Fingerprint,
) -> std::io::Result<()> {
	let rel = Path::new(path);

	match fingerprint {
		Fingerprint::Dir => {
			// A plain file in the way of a directory is replaced
			if let Some(meta) = dst.metadata(rel).await? {
				if meta.kind != EntryKind::Dir {
					dst.remove_entry(rel).await?;
				}
			}
			dst.create_dir_all(rel).await
		}
		Fingerprint::File { .. } => {
			if let Some(parent) = rel.parent() {
				if !parent.as_os_str().is_empty() {
					dst.create_dir_all(parent).await?;
				}
			}
			let reader = src.open_read(rel).await?;
			dst.write_file(rel, reader, fingerprint).await
		}
	}
}

// vim: ts=4
