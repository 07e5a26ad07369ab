//! Shared fixture for reconciliation tests
//!
//! Mirrors the counter-based fixture style of the acceptance suite: each
//! updated file gets "o" repeated `counter` times, and the counter advances,
//! so every write produces distinct, recognizable content.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use treesync::engine::{run, SyncOptions, SyncReport};
use treesync::reconcile::Mode;

pub struct Pair {
	_temp: TempDir,
	pub left: PathBuf,
	pub right: PathBuf,
	pub state: PathBuf,
	counter: usize,
}

pub const L: &str = "left";
pub const R: &str = "right";

pub fn val(n: usize) -> String {
	"o".repeat(n)
}

impl Pair {
	pub fn new() -> Pair {
		let temp = TempDir::new().unwrap();
		let left = temp.path().join("dir1");
		let right = temp.path().join("dir2");
		let state = temp.path().join("state");
		fs::create_dir(&left).unwrap();
		fs::create_dir(&right).unwrap();
		Pair { _temp: temp, left, right, state, counter: 0 }
	}

	pub fn dir(&self, side: &str) -> &Path {
		match side {
			L => &self.left,
			R => &self.right,
			_ => panic!("side must be left or right"),
		}
	}

	/// Write `val(counter)` into each named file, advancing the counter
	pub fn upd(&mut self, side: &str, names: &[&str]) {
		for name in names {
			let path = self.dir(side).join(name);
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent).unwrap();
			}
			fs::write(path, val(self.counter)).unwrap();
			self.counter += 1;
		}
	}

	pub fn write(&self, side: &str, name: &str, content: &str) {
		let path = self.dir(side).join(name);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(path, content).unwrap();
	}

	pub fn del(&self, side: &str, name: &str) {
		fs::remove_file(self.dir(side).join(name)).unwrap();
	}

	pub fn read(&self, side: &str, name: &str) -> String {
		fs::read_to_string(self.dir(side).join(name)).unwrap()
	}

	pub fn assert_exists(&self, side: &str, names: &[&str]) {
		for name in names {
			assert!(self.dir(side).join(name).exists(), "{}/{} should exist", side, name);
		}
	}

	pub fn assert_absent(&self, side: &str, names: &[&str]) {
		for name in names {
			assert!(!self.dir(side).join(name).exists(), "{}/{} should not exist", side, name);
		}
	}

	pub fn assert_file(&self, side: &str, name: &str, n: usize) {
		self.assert_exists(side, &[name]);
		assert_eq!(self.read(side, name), val(n), "{}/{} content mismatch", side, name);
	}

	pub fn options(&self, mode: Mode) -> SyncOptions {
		let mut options = SyncOptions::new(mode, self.left.clone(), self.right.clone());
		options.state_dir = Some(self.state.clone());
		options
	}

	pub async fn run(&self, mode: Mode) -> SyncReport {
		run(&self.options(mode)).await.unwrap()
	}

	/// Recursive listing of one side: relative path -> contents (dirs -> None)
	pub fn tree(&self, side: &str) -> Vec<(String, Option<Vec<u8>>)> {
		let mut out = Vec::new();
		collect(self.dir(side), Path::new(""), &mut out);
		out.sort();
		out
	}
}

fn collect(root: &Path, rel: &Path, out: &mut Vec<(String, Option<Vec<u8>>)>) {
	for entry in fs::read_dir(root.join(rel)).unwrap() {
		let entry = entry.unwrap();
		let rel_path = rel.join(entry.file_name());
		let key = rel_path.to_string_lossy().to_string();
		let file_type = entry.file_type().unwrap();
		if file_type.is_dir() {
			out.push((key, None));
			collect(root, &rel_path, out);
		} else if file_type.is_file() {
			out.push((key, Some(fs::read(entry.path()).unwrap())));
		}
	}
}

// vim: ts=4
