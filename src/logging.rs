//! Tracing subscriber setup
//!
//! Logs go to stderr. The default level is INFO, or DEBUG with `--verbose`;
//! `RUST_LOG` overrides both:
//!
//! ```bash
//! RUST_LOG=treesync=trace treesync sync dir1 dir2
//! ```

/// Initialize the tracing subscriber with environment filter support
pub fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
