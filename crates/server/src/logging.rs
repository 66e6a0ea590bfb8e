//! Tracing setup: human-readable stderr plus a plain append-only log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the global subscriber. `XPUB_LOG` overrides the
/// verbosity-derived filter when set.
pub fn init(verbose: u8, log_file: &Path) -> io::Result<()> {
	let default_filter = match verbose {
		0 => "info",
		1 => "xpub=debug,xpub_server=debug,info",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_env("XPUB_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

	if let Some(parent) = log_file.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let file: File = OpenOptions::new().create(true).append(true).open(log_file)?;

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(io::stderr).with_target(true))
		.with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
		.init();

	Ok(())
}
