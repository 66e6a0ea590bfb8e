use std::path::PathBuf;

use clap::Parser;
use xpub::Platform;

#[derive(Parser, Debug)]
#[command(name = "xpubd")]
#[command(about = "HTTP control surface for the xpub publishing engine")]
#[command(version)]
pub struct Cli {
	/// Target platform for this daemon instance
	#[arg(value_parser = parse_platform)]
	pub platform: Platform,

	/// Port to listen on
	#[arg(short, long, default_value = "8787")]
	pub port: u16,

	/// State directory (credentials, series cache, logs)
	#[arg(long, value_name = "DIR")]
	pub data_dir: Option<PathBuf>,

	/// Run the browser with a visible window even for publishes
	#[arg(long)]
	pub headful: bool,

	/// Seconds to wait for a human to complete an interactive login
	#[arg(long, default_value = "180", value_name = "SECS")]
	pub login_timeout: u64,

	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

fn parse_platform(raw: &str) -> Result<Platform, String> {
	raw.parse()
}
