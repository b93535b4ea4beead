mod atlas;
mod classify;
mod cli;
mod error;
mod output;
mod probes;
mod report;
mod run;
mod state;
mod types;

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::atlas::AtlasClient;
use crate::cli::Cli;
use crate::state::TimeoutState;
use crate::types::RunConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let default_level = if cli.verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();

	let config = RunConfig {
		api_url: cli.api_url.clone(),
		msm_id: cli.msm_id,
		window_days: cli.window_days,
		http_timeout: Duration::from_secs(cli.http_timeout),
		countries: cli.countries.clone(),
		state_path: cli.state.clone(),
		output_path: cli.output.clone(),
		csv_path: cli.csv.clone(),
	};

	// Collect the hand-curated hijack list
	let mut static_hijack = Vec::new();
	if !cli.no_default_hijack {
		static_hijack.extend(probes::default_hijack_probes());
	}
	if let Some(path) = &cli.hijack_file {
		static_hijack.extend(probes::read_probe_file(path)?);
	}

	let previous = TimeoutState::load(&config.state_path)
		.context("loading timeout state")?;

	output::print_config_summary(&config, static_hijack.len(), &previous);

	let client = AtlasClient::new(&config.api_url, config.http_timeout)?;
	let sources = run::collect_sources(&client, &config, static_hijack)
		.await
		.context("Atlas API request failed")?;

	let outcome = run::build_report(&sources, &previous);

	// Report first: a failed write must not advance the timeout window
	output::write_json(&config.output_path, &outcome.report)?;
	if let Some(path) = &config.csv_path {
		output::write_csv(path, &outcome.report)?;
	}
	outcome.next_state.save(&config.state_path)?;

	output::print_summary_table(&outcome.report, &outcome.next_state);
	info!(entries = outcome.report.len(), "done");

	Ok(())
}
