//! Change classification: one side's snapshot entry against the baseline

use crate::baseline::BaselineRecord;
use crate::scan::SnapshotEntry;

/// What happened to a path on one side since the last agreed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
	Unchanged,
	Added,
	Modified,
	Deleted,
}

impl Change {
	pub fn is_changed(&self) -> bool {
		!matches!(self, Change::Unchanged)
	}
}

/// Classify one side of one path
///
/// A missing record and the explicit known-deleted marker are equivalent: in
/// both cases a present path is an addition and an absent one is unchanged.
pub fn classify(record: Option<&BaselineRecord>, entry: Option<&SnapshotEntry>) -> Change {
	let agreed = record.and_then(|r| r.fingerprint.as_ref());

	match (agreed, entry) {
		(None, None) => Change::Unchanged,
		(None, Some(_)) => Change::Added,
		(Some(_), None) => Change::Deleted,
		(Some(fp), Some(entry)) => {
			if *fp == entry.fingerprint {
				Change::Unchanged
			} else {
				Change::Modified
			}
		}
	}
}


// vim: ts=4
