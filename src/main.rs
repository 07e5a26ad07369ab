use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::error;

use treesync::config::Config;
use treesync::engine::{run, SyncOptions};
use treesync::logging::init_tracing;
use treesync::reconcile::Mode;

// Exit codes: 0 = completed (conflicts are not fatal), 1 = some paths failed,
// 2 = fatal (root unavailable, baseline corrupt, lock held, bad config),
// 130 = interrupted.

fn cli() -> Command {
	let dirs = [
		Arg::new("dir1").required(true).value_name("DIR1").help("First root directory"),
		Arg::new("dir2").required(true).value_name("DIR2").help("Second root directory"),
	];
	let master = Arg::new("master")
		.short('m')
		.long("master")
		.value_name("SIDE")
		.value_parser(["left", "right"])
		.default_value("left")
		.help("Which positional root is the master side");

	Command::new("treesync")
		.version("0.1.0")
		.about("2-way directory reconciler with sync, mirror and backup modes")
		.subcommand_required(true)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Verbose logging"),
		)
		.arg(
			Arg::new("state-dir")
				.long("state-dir")
				.value_name("DIR")
				.global(true)
				.help("Baseline state directory (default: ~/.treesync)"),
		)
		.arg(
			Arg::new("exclude")
				.long("exclude")
				.value_name("GLOB")
				.action(ArgAction::Append)
				.global(true)
				.help("Exclude paths matching this glob (repeatable)"),
		)
		.arg(
			Arg::new("checksum")
				.long("checksum")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Hash every file instead of trusting size and mtime"),
		)
		.arg(
			Arg::new("parallel")
				.long("parallel")
				.value_name("N")
				.value_parser(clap::value_parser!(usize))
				.global(true)
				.help("Number of parallel transfers"),
		)
		.arg(
			Arg::new("dry-run")
				.long("dry-run")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Plan and report without touching anything"),
		)
		.subcommand(
			Command::new("sync")
				.about("Bidirectional synchronization")
				.args(dirs.clone()),
		)
		.subcommand(
			Command::new("mirror")
				.about("Make the slave side follow the master, deletions included")
				.arg(master.clone())
				.args(dirs.clone()),
		)
		.subcommand(
			Command::new("backup")
				.about("Like mirror, but never delete from the slave side")
				.arg(master)
				.args(dirs),
		)
}

async fn run_cli() -> i32 {
	let matches = cli().get_matches();
	init_tracing(matches.get_flag("verbose"));

	let (mode, sub) = match matches.subcommand() {
		Some(("sync", sub)) => (Mode::Sync, sub),
		Some(("mirror", sub)) => (Mode::Mirror, sub),
		Some(("backup", sub)) => (Mode::Backup, sub),
		_ => unreachable!("subcommand is required"),
	};

	let config = match Config::load() {
		Ok(config) => config,
		Err(e) => {
			error!("{}", e);
			return 2;
		}
	};

	let dir1 = PathBuf::from(sub.get_one::<String>("dir1").expect("required"));
	let dir2 = PathBuf::from(sub.get_one::<String>("dir2").expect("required"));

	// Mirror/backup treat the left slot as master; swap if the user said so
	let (left, right) = match sub.try_get_one::<String>("master") {
		Ok(Some(side)) if side.as_str() == "right" => (dir2, dir1),
		_ => (dir1, dir2),
	};

	let mut options = SyncOptions::new(mode, left, right);
	options.state_dir =
		matches.get_one::<String>("state-dir").map(PathBuf::from).or(config.state_dir);
	options.exclude = config.exclude;
	if let Some(patterns) = matches.get_many::<String>("exclude") {
		options.exclude.extend(patterns.cloned());
	}
	options.parallel_transfers =
		matches.get_one::<usize>("parallel").copied().unwrap_or(config.parallel_transfers);
	options.checksum_always = matches.get_flag("checksum") || config.checksum_always;
	options.dry_run = matches.get_flag("dry-run");

	match run(&options).await {
		Ok(report) => {
			if report.interrupted {
				130
			} else if report.failed > 0 {
				1
			} else {
				0
			}
		}
		Err(e) => {
			error!("{}", e);
			2
		}
	}
}

#[tokio::main]
async fn main() {
	let code = run_cli().await;
	std::process::exit(code);
}

// vim: ts=4
