use tracing::debug;

use crate::state::TimeoutState;
use crate::types::{ExclusionEntry, ExclusionReason, MeasurementResult, Outcome, ProbeId};

/// Per-probe verdict for one measurement round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	/// Answered with a consistent, non-empty answer section
	Healthy,
	/// Something other than the target answered
	Hijacked,
	/// Missing now, not missing in the previous run
	SeenOnceMissing,
	/// Missing in this run and the previous one
	ConfirmedTimeout,
}

impl Verdict {
	/// Exclusion reason for this verdict, if any
	pub fn reason(self) -> Option<ExclusionReason> {
		match self {
			Verdict::Hijacked => Some(ExclusionReason::DnsHijack),
			Verdict::ConfirmedTimeout => Some(ExclusionReason::Timeout),
			Verdict::Healthy | Verdict::SeenOnceMissing => None,
		}
	}

	/// Whether the probe goes into the next run's timeout state
	pub fn is_missing(self) -> bool {
		matches!(self, Verdict::SeenOnceMissing | Verdict::ConfirmedTimeout)
	}
}

/// Decide the verdict for a single probe.
///
/// Hijack rules fire on one observation. A missing result only counts when
/// the probe was also missing in the previous run.
pub fn classify(outcome: Outcome, missing_last_run: bool) -> Verdict {
	match outcome {
		Outcome::Answered { answer_count: 0, .. } => Verdict::Hijacked,
		Outcome::Answered { has_answer_section: false, .. } => Verdict::Hijacked,
		Outcome::Answered { .. } => Verdict::Healthy,
		Outcome::Missing if missing_last_run => Verdict::ConfirmedTimeout,
		Outcome::Missing => Verdict::SeenOnceMissing,
	}
}

/// Output of classifying a whole measurement window
#[derive(Debug, Default)]
pub struct Classification {
	pub entries: Vec<ExclusionEntry>,
	pub next_state: TimeoutState,
}

/// Classify every result against the previous run's timeout state.
///
/// The returned state holds exactly the probes missing in `results`.
pub fn classify_results(results: &[MeasurementResult], previous: &TimeoutState) -> Classification {
	let mut classification = Classification::default();
	for result in results {
		let verdict = classify(result.outcome, previous.contains(result.probe_id));
		if let Some(reason) = verdict.reason() {
			debug!(probe = result.probe_id, %reason, "probe excluded");
			classification.entries.push(ExclusionEntry::new(result.probe_id, reason));
		}
		if verdict.is_missing() {
			classification.next_state.insert(result.probe_id);
		}
	}
	classification
}

/// Probes in `previous` that answered this run and so drop out of the window.
pub fn recovered_probes(previous: &TimeoutState, next: &TimeoutState) -> Vec<ProbeId> {
	previous.iter().filter(|id| !next.contains(*id)).collect()
}
