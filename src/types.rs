use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Identifier of a probe on the measurement platform
pub type ProbeId = u64;

/// Reason attached to an exclusion entry.
///
/// Open label: country-code filters produce reasons that are not known
/// ahead of time, so anything outside the well-known set is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExclusionReason {
	DnsHijack,
	NeverConnected,
	Disconnected,
	Abandoned,
	Timeout,
	Other(String),
}

impl ExclusionReason {
	pub fn as_str(&self) -> &str {
		match self {
			ExclusionReason::DnsHijack => "dnshijack",
			ExclusionReason::NeverConnected => "never-connected",
			ExclusionReason::Disconnected => "disconnected",
			ExclusionReason::Abandoned => "abandoned",
			ExclusionReason::Timeout => "timeout",
			ExclusionReason::Other(label) => label,
		}
	}
}

impl From<&str> for ExclusionReason {
	fn from(label: &str) -> Self {
		match label {
			"dnshijack" => ExclusionReason::DnsHijack,
			"never-connected" => ExclusionReason::NeverConnected,
			"disconnected" => ExclusionReason::Disconnected,
			"abandoned" => ExclusionReason::Abandoned,
			"timeout" => ExclusionReason::Timeout,
			other => ExclusionReason::Other(other.to_string()),
		}
	}
}

impl fmt::Display for ExclusionReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for ExclusionReason {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

/// One line of the exclusion report.
///
/// Field order matches the sorted key order of the JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionEntry {
	pub id: ProbeId,
	pub reason: ExclusionReason,
}

impl ExclusionEntry {
	pub fn new(id: ProbeId, reason: ExclusionReason) -> Self {
		Self { id, reason }
	}
}

/// Probe lifecycle states as numbered by the probe directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
	NeverConnected,
	Disconnected,
	Abandoned,
}

impl ProbeStatus {
	/// Every status whose probes are excluded unconditionally
	pub const EXCLUDED: [ProbeStatus; 3] = [
		ProbeStatus::NeverConnected,
		ProbeStatus::Disconnected,
		ProbeStatus::Abandoned,
	];

	/// Numeric status code used by the Atlas API
	pub fn code(self) -> u8 {
		match self {
			ProbeStatus::NeverConnected => 0,
			ProbeStatus::Disconnected => 2,
			ProbeStatus::Abandoned => 3,
		}
	}

	pub fn reason(self) -> ExclusionReason {
		match self {
			ProbeStatus::NeverConnected => ExclusionReason::NeverConnected,
			ProbeStatus::Disconnected => ExclusionReason::Disconnected,
			ProbeStatus::Abandoned => ExclusionReason::Abandoned,
		}
	}
}

/// What a probe returned for one round of the DNS measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// No result object at all for this probe
	Missing,
	Answered {
		answer_count: u64,
		has_answer_section: bool,
	},
}

/// Result of a single probe in the measurement window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementResult {
	pub probe_id: ProbeId,
	pub outcome: Outcome,
}

impl MeasurementResult {
	pub fn missing(probe_id: ProbeId) -> Self {
		Self { probe_id, outcome: Outcome::Missing }
	}

	pub fn answered(probe_id: ProbeId, answer_count: u64, has_answer_section: bool) -> Self {
		Self {
			probe_id,
			outcome: Outcome::Answered { answer_count, has_answer_section },
		}
	}
}

/// Run configuration assembled from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub api_url: String,
	pub msm_id: u64,
	pub window_days: u32,
	pub http_timeout: Duration,
	pub countries: Vec<String>,
	pub state_path: String,
	pub output_path: String,
	pub csv_path: Option<String>,
}
