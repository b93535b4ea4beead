use std::io::Write;
use std::path::{Path, PathBuf};

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::info;

use crate::error::{FilterError, Result};
use crate::report::ExclusionReport;
use crate::state::TimeoutState;
use crate::types::RunConfig;

/// Print a summary of the run configuration before fetching anything.
pub fn print_config_summary(config: &RunConfig, static_count: usize, previous: &TimeoutState) {
	println!("Probe Exclusion Configuration");
	println!("=============================");
	println!("API:            {}", config.api_url);
	println!("Measurement:    {}", config.msm_id);
	println!("Window:         {} days", config.window_days);
	println!("Static list:    {} probes", static_count);
	if config.countries.is_empty() {
		println!("Countries:      none");
	} else {
		println!("Countries:      {}", config.countries.join(", "));
	}
	println!("Timed out last: {} probes", previous.len());
	println!("State file:     {}", config.state_path);
	println!("Output:         {}", config.output_path);
	println!();
}

/// Print the number of excluded probes per reason as a table.
pub fn print_summary_table(report: &ExclusionReport, timed_out_now: &TimeoutState) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Reason", "Probes"]);

	for (reason, count) in report.counts_by_reason() {
		table.add_row(vec![reason.to_string(), count.to_string()]);
	}
	table.add_row(vec!["total".to_string(), report.len().to_string()]);

	println!("\nExclusion Summary");
	println!("=================\n");
	println!("{table}");
	println!("Probes timing out this run: {}", timed_out_now.len());
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place.
///
/// The target holds either its old content or the complete new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
	let mut tmp = PathBuf::from(path);
	let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
	name.push(".tmp");
	tmp.set_file_name(name);

	let mut file = std::fs::File::create(&tmp).map_err(|e| FilterError::write(&tmp, e))?;
	file.write_all(bytes).map_err(|e| FilterError::write(&tmp, e))?;
	file.sync_all().map_err(|e| FilterError::write(&tmp, e))?;
	drop(file);
	std::fs::rename(&tmp, path).map_err(|e| FilterError::write(path, e))
}

/// Encode the report as a JSON array with four-space indentation.
pub fn report_json(report: &ExclusionReport) -> Result<Vec<u8>> {
	let mut buf = Vec::new();
	let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
	report.entries().serialize(&mut serializer)?;
	Ok(buf)
}

/// Write the report as JSON.
pub fn write_json(path: &str, report: &ExclusionReport) -> Result<()> {
	write_atomic(Path::new(path), &report_json(report)?)?;
	info!(path, entries = report.len(), "wrote exclusion report");
	Ok(())
}

/// Write the report as CSV with an `id,reason` header.
pub fn write_csv(path: &str, report: &ExclusionReport) -> Result<()> {
	let mut writer = csv::Writer::from_writer(Vec::new());
	writer.write_record(["id", "reason"])?;
	for entry in report.entries() {
		writer.write_record([entry.id.to_string(), entry.reason.to_string()])?;
	}
	let bytes = writer.into_inner()
		.map_err(|e| FilterError::write(path, e.into_error()))?;
	write_atomic(Path::new(path), &bytes)?;
	info!(path, entries = report.len(), "wrote CSV report");
	Ok(())
}
