use clap::Parser;

use crate::atlas::DEFAULT_API_URL;

/// Build an exclusion list of unreliable RIPE Atlas probes
#[derive(Parser, Debug)]
#[command(name = "probe-exclusion-generator")]
#[command(about = "Classify RIPE Atlas probes as unreliable and write a reason-tagged exclusion list")]
pub struct Cli {
	/// DNS measurement whose results are classified
	#[arg(short = 'm', long = "msm-id", default_value = "12016241")]
	pub msm_id: u64,

	/// Number of days of results to fetch, ending now
	#[arg(short = 'w', long = "window-days", default_value = "7")]
	pub window_days: u32,

	/// Country code whose probes are excluded (repeatable)
	#[arg(short = 'c', long = "country")]
	pub countries: Vec<String>,

	/// File with extra hijacked probe ids (one per line)
	#[arg(short = 'f', long = "hijack-file")]
	pub hijack_file: Option<String>,

	/// Do not include the built-in list of hijacked probes
	#[arg(long = "no-default-hijack")]
	pub no_default_hijack: bool,

	/// File holding the probes that timed out in the previous run
	#[arg(short = 's', long = "state", default_value = "timed-out.txt")]
	pub state: String,

	/// Output JSON file path
	#[arg(short = 'o', long = "output", default_value = "data.json")]
	pub output: String,

	/// Also write the report as CSV
	#[arg(long = "csv")]
	pub csv: Option<String>,

	/// Base URL of the Atlas API
	#[arg(long = "api-url", default_value = DEFAULT_API_URL)]
	pub api_url: String,

	/// HTTP request timeout in seconds
	#[arg(short = 't', long = "http-timeout", default_value = "60")]
	pub http_timeout: u64,

	/// Log debug output (overridden by RUST_LOG)
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,
}
