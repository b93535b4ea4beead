use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::atlas::AtlasClient;
use crate::classify::{classify_results, recovered_probes};
use crate::error::{FilterError, Result};
use crate::report::ExclusionReport;
use crate::state::TimeoutState;
use crate::types::{ExclusionReason, MeasurementResult, ProbeId, ProbeStatus, RunConfig};

/// Everything fetched for one run, before classification
#[derive(Debug, Clone, Default)]
pub struct Sources {
	/// Hand-curated probes known to be hijacked
	pub static_hijack: Vec<ProbeId>,
	/// Status and country batches, each with the reason it is reported under
	pub batches: Vec<(ExclusionReason, Vec<ProbeId>)>,
	pub results: Vec<MeasurementResult>,
}

/// Report and timeout state produced by one run
#[derive(Debug)]
pub struct RunOutcome {
	pub report: ExclusionReport,
	pub next_state: TimeoutState,
}

/// Fetch every remote source for a run.
///
/// Any failed request aborts the run so that no partial report or state
/// is ever written.
pub async fn collect_sources(
	client: &AtlasClient,
	config: &RunConfig,
	static_hijack: Vec<ProbeId>,
) -> Result<Sources> {
	let (start, stop) = results_window(Utc::now(), config.window_days)?;

	let mut batches = Vec::new();
	for cc in &config.countries {
		let probes = client.probes_in_country(cc).await?;
		batches.push((ExclusionReason::from(cc.as_str()), probes));
	}
	for status in ProbeStatus::EXCLUDED {
		let probes = client.probes_with_status(status).await?;
		batches.push((status.reason(), probes));
	}

	let results = client.measurement_results(config.msm_id, start, stop).await?;

	Ok(Sources { static_hijack, batches, results })
}

/// The `days`-long window of results ending at `stop`.
pub fn results_window(stop: DateTime<Utc>, days: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
	let start = Duration::try_days(i64::from(days))
		.and_then(|window| stop.checked_sub_signed(window))
		.ok_or(FilterError::InvalidWindow { days })?;
	Ok((start, stop))
}

/// Build the exclusion report and the next timeout state.
pub fn build_report(sources: &Sources, previous: &TimeoutState) -> RunOutcome {
	let mut report = ExclusionReport::new();
	report.extend_with_reason(sources.static_hijack.iter().copied(), &ExclusionReason::DnsHijack);
	for (reason, probes) in &sources.batches {
		report.extend_with_reason(probes.iter().copied(), reason);
	}

	let classification = classify_results(&sources.results, previous);
	let recovered = recovered_probes(previous, &classification.next_state);
	info!(
		excluded = classification.entries.len(),
		timing_out = classification.next_state.len(),
		recovered = recovered.len(),
		"classified measurement results",
	);
	report.extend(classification.entries);

	RunOutcome { report, next_state: classification.next_state }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ExclusionEntry;
	use serde_json::json;
	use std::time::Duration as StdDuration;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config(countries: &[&str], window_days: u32) -> RunConfig {
		RunConfig {
			api_url: String::new(),
			msm_id: 12016241,
			window_days,
			http_timeout: StdDuration::from_secs(5),
			countries: countries.iter().map(|cc| cc.to_string()).collect(),
			state_path: "timed-out.txt".to_string(),
			output_path: "data.json".to_string(),
			csv_path: None,
		}
	}

	fn client(server: &MockServer) -> AtlasClient {
		AtlasClient::new(&server.uri(), StdDuration::from_secs(5)).unwrap()
	}

	async fn mount_probe_page(server: &MockServer, key: &str, value: &str, ids: &[ProbeId]) {
		let results: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
		Mock::given(method("GET"))
			.and(path("/api/v2/probes/"))
			.and(query_param(key, value))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"count": ids.len(), "next": null, "results": results
			})))
			.mount(server)
			.await;
	}

	async fn mount_results(server: &MockServer, body: serde_json::Value) {
		Mock::given(method("GET"))
			.and(path("/api/v2/measurements/12016241/results/"))
			.respond_with(ResponseTemplate::new(200).set_body_json(body))
			.mount(server)
			.await;
	}

	fn requested_paths(requests: &[wiremock::Request]) -> Vec<String> {
		requests.iter()
			.map(|r| match r.url.query() {
				Some(q) if r.url.path() == "/api/v2/probes/" => format!("{}?{}", r.url.path(), q),
				_ => r.url.path().to_string(),
			})
			.collect()
	}

	#[test]
	fn test_end_to_end_with_history() {
		let sources = Sources {
			static_hijack: vec![101],
			batches: Vec::new(),
			results: vec![
				MeasurementResult::answered(202, 0, false),
				MeasurementResult::missing(303),
			],
		};
		let previous: TimeoutState = [303].into_iter().collect();

		let outcome = build_report(&sources, &previous);
		assert_eq!(outcome.report.entries(), &[
			ExclusionEntry::new(101, ExclusionReason::DnsHijack),
			ExclusionEntry::new(202, ExclusionReason::DnsHijack),
			ExclusionEntry::new(303, ExclusionReason::Timeout),
		]);
		assert_eq!(outcome.next_state, [303].into_iter().collect::<TimeoutState>());
	}

	#[test]
	fn test_end_to_end_first_run() {
		let sources = Sources {
			results: vec![MeasurementResult::missing(404)],
			..Sources::default()
		};
		let outcome = build_report(&sources, &TimeoutState::default());
		assert!(outcome.report.is_empty());
		assert_eq!(outcome.next_state, [404].into_iter().collect::<TimeoutState>());
	}

	#[test]
	fn test_three_runs_only_remember_one() {
		let run = |results: Vec<MeasurementResult>, previous: &TimeoutState| {
			build_report(&Sources { results, ..Sources::default() }, previous)
		};

		let first = run(vec![MeasurementResult::missing(1)], &TimeoutState::default());
		let second = run(vec![MeasurementResult::answered(1, 1, true)], &first.next_state);
		assert!(second.next_state.is_empty());

		// Missing two runs apart is not a confirmed timeout
		let third = run(vec![MeasurementResult::missing(1)], &second.next_state);
		assert!(third.report.is_empty());
		assert_eq!(third.next_state, [1].into_iter().collect::<TimeoutState>());
	}

	#[test]
	fn test_batches_keep_their_reason() {
		let sources = Sources {
			static_hijack: vec![7],
			batches: vec![
				(ExclusionReason::from("NL"), vec![7, 8]),
				(ExclusionReason::Abandoned, vec![9]),
			],
			results: Vec::new(),
		};
		let outcome = build_report(&sources, &TimeoutState::default());
		let counts = outcome.report.counts_by_reason();
		assert_eq!(outcome.report.len(), 4);
		assert_eq!(counts.get(&ExclusionReason::Other("NL".to_string())), Some(&2));
		assert_eq!(counts.get(&ExclusionReason::DnsHijack), Some(&1));
	}

	#[test]
	fn test_results_window_spans_days() {
		let stop = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
		let (start, end) = results_window(stop, 7).unwrap();
		assert_eq!(end, stop);
		assert_eq!(stop.timestamp() - start.timestamp(), 7 * 86400);
	}

	#[test]
	fn test_results_window_too_large_is_error() {
		let err = results_window(Utc::now(), u32::MAX).unwrap_err();
		assert!(matches!(err, FilterError::InvalidWindow { days: u32::MAX }));
	}

	#[tokio::test]
	async fn test_collect_rejects_huge_window_before_fetching() {
		let server = MockServer::start().await;
		let err = collect_sources(&client(&server), &config(&[], u32::MAX), Vec::new())
			.await
			.unwrap_err();
		assert!(matches!(err, FilterError::InvalidWindow { .. }));
		assert!(server.received_requests().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_collect_batches_in_order_with_reasons() {
		let server = MockServer::start().await;
		mount_probe_page(&server, "country_code", "NL", &[1]).await;
		mount_probe_page(&server, "status", "0", &[10]).await;
		mount_probe_page(&server, "status", "2", &[20, 21]).await;
		mount_probe_page(&server, "status", "3", &[30]).await;
		mount_results(&server, json!([{"prb_id": 404}])).await;

		let sources = collect_sources(&client(&server), &config(&["NL"], 7), vec![101])
			.await
			.unwrap();
		assert_eq!(sources.static_hijack, vec![101]);
		assert_eq!(sources.batches, vec![
			(ExclusionReason::Other("NL".to_string()), vec![1]),
			(ExclusionReason::NeverConnected, vec![10]),
			(ExclusionReason::Disconnected, vec![20, 21]),
			(ExclusionReason::Abandoned, vec![30]),
		]);
		assert_eq!(sources.results, vec![MeasurementResult::missing(404)]);

		let requests = server.received_requests().await.unwrap();
		assert_eq!(requested_paths(&requests), vec![
			"/api/v2/probes/?country_code=NL",
			"/api/v2/probes/?status=0",
			"/api/v2/probes/?status=2",
			"/api/v2/probes/?status=3",
			"/api/v2/measurements/12016241/results/",
		]);
	}

	#[tokio::test]
	async fn test_collect_sends_window_bounds() {
		let server = MockServer::start().await;
		for code in ["0", "2", "3"] {
			mount_probe_page(&server, "status", code, &[]).await;
		}
		mount_results(&server, json!([])).await;

		collect_sources(&client(&server), &config(&[], 7), Vec::new()).await.unwrap();

		let requests = server.received_requests().await.unwrap();
		let results = requests.iter()
			.find(|r| r.url.path().ends_with("/results/"))
			.unwrap();
		let param = |name: &str| -> i64 {
			results.url.query_pairs()
				.find(|(k, _)| k == name)
				.map(|(_, v)| v.parse().unwrap())
				.unwrap()
		};
		assert_eq!(param("stop") - param("start"), 7 * 86400);
		assert!((Utc::now().timestamp() - param("stop")).abs() < 60);
	}

	#[tokio::test]
	async fn test_collect_aborts_on_probe_directory_failure() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/v2/probes/"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;
		mount_results(&server, json!([])).await;

		let err = collect_sources(&client(&server), &config(&[], 7), Vec::new())
			.await
			.unwrap_err();
		assert!(matches!(err, FilterError::Status { status: 500, .. }));

		// Nothing after the failed request is fetched
		let requests = server.received_requests().await.unwrap();
		assert_eq!(requested_paths(&requests), vec!["/api/v2/probes/?status=0"]);
	}

	#[tokio::test]
	async fn test_collect_aborts_on_results_failure() {
		let server = MockServer::start().await;
		for code in ["0", "2", "3"] {
			mount_probe_page(&server, "status", code, &[1]).await;
		}
		Mock::given(method("GET"))
			.and(path("/api/v2/measurements/12016241/results/"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let result = collect_sources(&client(&server), &config(&[], 7), Vec::new()).await;
		assert!(matches!(result, Err(FilterError::Status { status: 500, .. })));
	}
}
