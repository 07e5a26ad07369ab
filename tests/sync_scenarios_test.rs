//! Bidirectional sync scenarios
//!
//! The numbered contents follow the acceptance fixtures: file `a` starts at
//! 0 repeats of "o", `b` at 1, and every later update takes the next number.

mod common;

use common::{val, Pair, L, R};
use treesync::reconcile::Mode;

/// Left has a and b, right is empty; both land on the right
async fn seed_both_sides(pair: &mut Pair) {
	pair.upd(L, &["a", "b"]);
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.copied, 2);
	pair.assert_file(R, "a", 0);
	pair.assert_file(R, "b", 1);
}

#[tokio::test]
async fn test_one_sided_add_left_to_right() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;
	pair.assert_file(L, "a", 0);
	pair.assert_file(L, "b", 1);
}

#[tokio::test]
async fn test_one_sided_add_right_to_left() {
	let mut pair = Pair::new();
	pair.upd(R, &["a", "b"]);
	pair.run(Mode::Sync).await;
	pair.assert_file(L, "a", 0);
	pair.assert_file(L, "b", 1);
}

#[tokio::test]
async fn test_independent_edits_converge() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	pair.upd(L, &["a"]); // 2
	pair.upd(R, &["b"]); // 3
	pair.run(Mode::Sync).await;

	pair.assert_file(L, "a", 2);
	pair.assert_file(R, "a", 2);
	pair.assert_file(L, "b", 3);
	pair.assert_file(R, "b", 3);
}

#[tokio::test]
async fn test_deletes_propagate_both_ways() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	pair.del(L, "a");
	pair.del(R, "b");
	let report = pair.run(Mode::Sync).await;

	assert_eq!(report.deleted, 2);
	pair.assert_absent(L, &["a", "b"]);
	pair.assert_absent(R, &["a", "b"]);
}

#[tokio::test]
async fn test_conflicts_preserve_both_sides() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	pair.upd(L, &["a"]); // 2
	pair.upd(R, &["a"]); // 3
	pair.upd(L, &["b"]); // 4
	pair.del(R, "b");
	pair.upd(L, &["c"]); // 5

	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 2);
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 2);

	// No convergence, no data loss, on either run
	pair.assert_file(L, "a", 2);
	pair.assert_file(R, "a", 3);
	pair.assert_file(L, "b", 4);
	pair.assert_absent(R, &["b"]);

	// The non-conflicting addition still propagated
	pair.assert_file(R, "c", 5);
}

#[tokio::test]
async fn test_second_run_is_all_noops() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.pending, 0);
	assert_eq!(report.copied, 0);
	assert_eq!(report.deleted, 0);
	assert_eq!(report.conflicts, 0);
	assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_both_sides_create_identical_content() {
	let pair = Pair::new();
	pair.write(L, "same.txt", "identical");
	pair.write(R, "same.txt", "identical");

	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 0);
	assert_eq!(report.copied, 0);
	assert_eq!(pair.read(L, "same.txt"), "identical");
	assert_eq!(pair.read(R, "same.txt"), "identical");

	// And the agreement is remembered: editing one side now propagates
	pair.write(L, "same.txt", "edited");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.copied, 1);
	assert_eq!(pair.read(R, "same.txt"), "edited");
}

#[tokio::test]
async fn test_conflict_heals_once_sides_agree() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	pair.write(L, "a", "mine");
	pair.write(R, "a", "theirs");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 1);

	// A human makes both sides agree; the next run clears the mark
	pair.write(R, "a", "mine");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 0);

	// Normal propagation resumes afterwards
	pair.write(L, "a", "later edit");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.copied, 1);
	assert_eq!(pair.read(R, "a"), "later edit");
}

#[tokio::test]
async fn test_modify_vs_delete_heals_when_modified_side_is_deleted_too() {
	let mut pair = Pair::new();
	seed_both_sides(&mut pair).await;

	pair.upd(L, &["b"]);
	pair.del(R, "b");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 1);

	pair.del(L, "b");
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.conflicts, 0);
	pair.assert_absent(L, &["b"]);
	pair.assert_absent(R, &["b"]);
}

#[tokio::test]
async fn test_nested_directories_propagate() {
	let pair = Pair::new();
	pair.write(L, "docs/guide/intro.txt", "hello");
	std::fs::create_dir_all(pair.left.join("empty/inner")).unwrap();

	pair.run(Mode::Sync).await;

	assert_eq!(pair.read(R, "docs/guide/intro.txt"), "hello");
	assert!(pair.right.join("empty/inner").is_dir());
}

#[tokio::test]
async fn test_directory_tree_deletion_propagates() {
	let pair = Pair::new();
	pair.write(L, "d/one.txt", "1");
	pair.write(L, "d/sub/two.txt", "2");
	pair.run(Mode::Sync).await;
	assert!(pair.right.join("d/sub/two.txt").exists());

	std::fs::remove_dir_all(pair.left.join("d")).unwrap();
	let report = pair.run(Mode::Sync).await;
	assert_eq!(report.failed, 0);
	pair.assert_absent(R, &["d"]);
}

#[tokio::test]
async fn test_trees_identical_after_one_sided_changes() {
	let mut pair = Pair::new();
	pair.upd(L, &["x", "y"]);
	pair.write(L, "sub/z.bin", "zzz");
	pair.run(Mode::Sync).await;

	assert_eq!(pair.tree(L), pair.tree(R));

	pair.upd(R, &["x"]);
	pair.del(L, "y");
	pair.run(Mode::Sync).await;

	assert_eq!(pair.tree(L), pair.tree(R));
	assert_eq!(pair.read(L, "x"), val(2));
}

// vim: ts=4
