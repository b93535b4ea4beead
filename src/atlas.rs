use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{FilterError, Result};
use crate::types::{MeasurementResult, ProbeId, ProbeStatus};

pub const DEFAULT_API_URL: &str = "https://atlas.ripe.net";

/// One page of the probe directory
#[derive(Debug, Deserialize)]
struct ProbePage {
	next: Option<String>,
	results: Vec<ProbeRecord>,
}

#[derive(Debug, Deserialize)]
struct ProbeRecord {
	id: ProbeId,
}

/// Thin client for the RIPE Atlas v2 REST API.
///
/// Requests are issued one at a time; failures are returned to the caller
/// without retrying.
pub struct AtlasClient {
	client: Client,
	base_url: String,
}

impl AtlasClient {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
		let client = Client::builder()
			.timeout(timeout)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| FilterError::http(base_url, e))?;
		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	/// GET a URL and decode its JSON body, failing on any non-2xx status.
	async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
		debug!(url, ?query, "GET");
		let response = self.client.get(url)
			.query(query)
			.send()
			.await
			.map_err(|e| FilterError::http(url, e))?;
		let status = response.status();
		if !status.is_success() {
			return Err(FilterError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}
		response.json::<T>().await.map_err(|e| FilterError::http(url, e))
	}

	/// Fetch every probe matching a single filter, following pagination.
	async fn probes_matching(&self, key: &str, value: String) -> Result<Vec<ProbeId>> {
		let first = format!("{}/api/v2/probes/", self.base_url);
		let mut page: ProbePage = self.get_json(&first, &[(key, value)]).await?;
		let mut probes: Vec<ProbeId> = page.results.iter().map(|p| p.id).collect();
		while let Some(next) = page.next.take() {
			page = self.get_json(&next, &[]).await?;
			probes.extend(page.results.iter().map(|p| p.id));
		}
		Ok(probes)
	}

	/// Probes currently in the given lifecycle state.
	pub async fn probes_with_status(&self, status: ProbeStatus) -> Result<Vec<ProbeId>> {
		let probes = self.probes_matching("status", status.code().to_string()).await?;
		info!(status = %status.reason(), count = probes.len(), "fetched probes by status");
		Ok(probes)
	}

	/// Probes registered in the given country.
	pub async fn probes_in_country(&self, country_code: &str) -> Result<Vec<ProbeId>> {
		let probes = self.probes_matching("country_code", country_code.to_string()).await?;
		info!(country = country_code, count = probes.len(), "fetched probes by country");
		Ok(probes)
	}

	/// Fetch the results of a measurement between `start` and `stop`.
	///
	/// Records that cannot be attributed to a probe are skipped.
	pub async fn measurement_results(
		&self,
		msm_id: u64,
		start: DateTime<Utc>,
		stop: DateTime<Utc>,
	) -> Result<Vec<MeasurementResult>> {
		let url = format!("{}/api/v2/measurements/{}/results/", self.base_url, msm_id);
		let query = [
			("start", start.timestamp().to_string()),
			("stop", stop.timestamp().to_string()),
			("format", "json".to_string()),
		];
		let records: Vec<Value> = self.get_json(&url, &query).await?;
		let total = records.len();
		let results: Vec<MeasurementResult> = records.iter().filter_map(parse_result).collect();
		if results.len() < total {
			warn!(skipped = total - results.len(), "skipped results without a probe id");
		}
		info!(msm_id, count = results.len(), "fetched measurement results");
		Ok(results)
	}
}

/// Turn one raw result record into a `MeasurementResult`.
///
/// A record without a `result` object is `Missing`. A `result` that is not
/// an object, or whose ANCOUNT is absent, negative or not an integer, is
/// treated as zero answers so the probe is classified as hijacked.
pub fn parse_result(record: &Value) -> Option<MeasurementResult> {
	let probe_id = record.get("prb_id").and_then(Value::as_u64)?;
	let result = match record.get("result") {
		None => return Some(MeasurementResult::missing(probe_id)),
		Some(Value::Object(result)) => result,
		Some(_) => return Some(MeasurementResult::answered(probe_id, 0, false)),
	};
	let parsed = match result.get("ANCOUNT").and_then(Value::as_u64) {
		Some(answer_count) => {
			MeasurementResult::answered(probe_id, answer_count, result.contains_key("answers"))
		}
		None => MeasurementResult::answered(probe_id, 0, false),
	};
	Some(parsed)
}
