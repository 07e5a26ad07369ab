//! The resolution matrix: classification pairs + mode -> actions
//!
//! For each tracked path the two sides are classified independently against
//! the shared baseline record, then a single resolution function decides the
//! action and the baseline update. Mode is a closed enum consumed by that one
//! function; the conflict rule is shared and the per-mode differences stay
//! local to the match below.
//!
//! Conflict rule: a conflict exists only when BOTH sides changed since the
//! baseline AND their current fingerprints differ. Two sides that changed to
//! the identical result (both created the same file, both deleted it) are
//! simply agreed upon. A conflicted path is re-resolved from scratch every
//! run, so it heals itself once the sides converge; until then neither side
//! is touched.

use std::collections::BTreeSet;
use tracing::debug;

use crate::baseline::{Baseline, BaselineRecord};
use crate::classify::{classify, Change};
use crate::fingerprint::Fingerprint;
use crate::scan::{Snapshot, SnapshotEntry};

/// Reconciliation policy for a run
///
/// Mirror and Backup treat the left root as master; the CLI maps whichever
/// positional root was chosen as master onto the left slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Bidirectional: either side's change propagates to the other
	Sync,

	/// Left is authoritative; right follows, including deletions
	Mirror,

	/// Left is authoritative; right only ever gains or updates, never loses
	Backup,
}

impl Mode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Mode::Sync => "sync",
			Mode::Mirror => "mirror",
			Mode::Backup => "backup",
		}
	}
}

/// Concrete operation for one path
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
	/// Copies carry the source fingerprint, verified after the transfer
	CopyLeftToRight { fingerprint: Fingerprint },
	CopyRightToLeft { fingerprint: Fingerprint },
	DeleteOnLeft,
	DeleteOnRight,
	/// Record the divergence; touch neither side
	MarkConflict,
	NoOp,
}

impl Action {
	pub fn is_noop(&self) -> bool {
		matches!(self, Action::NoOp)
	}

	/// True for actions Mirror/Backup must never produce
	pub fn mutates_left(&self) -> bool {
		matches!(self, Action::CopyRightToLeft { .. } | Action::DeleteOnLeft)
	}
}

/// Baseline consequence of a decision
///
/// `Set` and `Drop` apply immediately for baseline-only outcomes; for
/// filesystem actions the executor commits them only after the action
/// succeeded, so a failed path keeps its old record and is retried next run.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineUpdate {
	Keep,
	Set(BaselineRecord),
	Drop,
}

/// Resolution result for one path
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
	pub path: String,
	pub action: Action,
	pub update: BaselineUpdate,
}

/// Full plan for a run
#[derive(Debug, Default)]
pub struct Plan {
	pub decisions: Vec<Decision>,
	/// Paths left untouched because a scanner could not read them
	pub unscanned: Vec<String>,
}

impl Plan {
	/// Number of non-NoOp actions (the idempotence measure)
	pub fn pending(&self) -> usize {
		self.decisions.iter().filter(|d| !d.action.is_noop()).count()
	}
}

/// Join both snapshots with the baseline and resolve every tracked path
pub fn plan(mode: Mode, baseline: &Baseline, left: &Snapshot, right: &Snapshot) -> Plan {
	let mut paths: BTreeSet<&str> = BTreeSet::new();
	paths.extend(baseline.keys().map(|k| k.as_str()));
	paths.extend(left.paths());
	paths.extend(right.paths());

	let mut plan = Plan::default();
	for path in paths {
		if left.is_skipped(path) || right.is_skipped(path) {
			plan.unscanned.push(path.to_string());
			continue;
		}
		let decision = resolve(mode, path, baseline.get(path), left.get(path), right.get(path));
		if !decision.action.is_noop() {
			debug!("{}: {:?}", path, decision.action);
		}
		plan.decisions.push(decision);
	}
	plan
}

/// Resolve one path
pub fn resolve(
	mode: Mode,
	path: &str,
	record: Option<&BaselineRecord>,
	left: Option<&SnapshotEntry>,
	right: Option<&SnapshotEntry>,
) -> Decision {
	let cl = classify(record, left);
	let cr = classify(record, right);

	let (action, update) = match (cl.is_changed(), cr.is_changed()) {
		(false, false) => unchanged(record, left),
		(true, true) => both_changed(record, left, right),
		(true, false) => left_changed(mode, cl, left),
		(false, true) => right_changed(mode, cr, right),
	};

	Decision { path: path.to_string(), action, update }
}

/// Neither side moved since the baseline
fn unchanged(
	record: Option<&BaselineRecord>,
	left: Option<&SnapshotEntry>,
) -> (Action, BaselineUpdate) {
	match record {
		// A conflicted record whose sides both match the baseline again has
		// converged (both reverted, or both ended up absent): clear it.
		Some(rec) if rec.conflicted => match (&rec.fingerprint, left) {
			(Some(fp), Some(_)) => {
				(Action::NoOp, BaselineUpdate::Set(BaselineRecord::agreed(fp.clone())))
			}
			_ => (Action::NoOp, BaselineUpdate::Drop),
		},
		_ => (Action::NoOp, BaselineUpdate::Keep),
	}
}

/// Only the left side changed; the matrix never conflicts here
fn left_changed(mode: Mode, cl: Change, left: Option<&SnapshotEntry>) -> (Action, BaselineUpdate) {
	match cl {
		Change::Added | Change::Modified => {
			let fp = left.expect("changed side present").fingerprint.clone();
			(
				Action::CopyLeftToRight { fingerprint: fp.clone() },
				BaselineUpdate::Set(BaselineRecord::agreed(fp)),
			)
		}
		Change::Deleted => match mode {
			// Backup never removes from the slave; keeping the record means a
			// later bidirectional run still sees left as Deleted and may then
			// propagate.
			Mode::Backup => (Action::NoOp, BaselineUpdate::Keep),
			Mode::Sync | Mode::Mirror => (Action::DeleteOnRight, BaselineUpdate::Drop),
		},
		Change::Unchanged => unreachable!("caller checked is_changed"),
	}
}

/// Only the right side changed
fn right_changed(mode: Mode, cr: Change, right: Option<&SnapshotEntry>) -> (Action, BaselineUpdate) {
	match mode {
		Mode::Sync => match cr {
			Change::Added | Change::Modified => {
				let fp = right.expect("changed side present").fingerprint.clone();
				(
					Action::CopyRightToLeft { fingerprint: fp.clone() },
					BaselineUpdate::Set(BaselineRecord::agreed(fp)),
				)
			}
			Change::Deleted => (Action::DeleteOnLeft, BaselineUpdate::Drop),
			Change::Unchanged => unreachable!("caller checked is_changed"),
		},
		// The slave's own non-conflicting drift is left in place, and the
		// baseline keeps the last agreed fingerprint: a later bidirectional
		// run then sees the drift as the only change and propagates it
		// master-ward, and a slave-only addition is never misread as a
		// master deletion on the next mirror run.
		Mode::Mirror | Mode::Backup => (Action::NoOp, BaselineUpdate::Keep),
	}
}

/// Both sides changed since the baseline: agree or conflict
fn both_changed(
	record: Option<&BaselineRecord>,
	left: Option<&SnapshotEntry>,
	right: Option<&SnapshotEntry>,
) -> (Action, BaselineUpdate) {
	match (left, right) {
		// Both deleted: the sides agree, the path is done; drop the record
		// so the baseline does not grow a permanent tombstone.
		(None, None) => (Action::NoOp, BaselineUpdate::Drop),

		// Both changed to the identical result: not a conflict.
		(Some(l), Some(r)) if l.fingerprint == r.fingerprint => (
			Action::NoOp,
			BaselineUpdate::Set(BaselineRecord::agreed(l.fingerprint.clone())),
		),

		// Genuine divergence. Keep the old agreed fingerprint so both sides
		// keep classifying as changed, and re-mark only when the flag is not
		// already set, so a standing conflict costs nothing per run.
		_ => {
			let already = record.map(|r| r.conflicted).unwrap_or(false);
			if already {
				(Action::NoOp, BaselineUpdate::Keep)
			} else {
				let old = record.and_then(|r| r.fingerprint.clone());
				(
					Action::MarkConflict,
					BaselineUpdate::Set(BaselineRecord { fingerprint: old, conflicted: true }),
				)
			}
		}
	}
}


// vim: ts=4
