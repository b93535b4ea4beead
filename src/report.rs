use std::collections::BTreeMap;

use crate::types::{ExclusionEntry, ExclusionReason, ProbeId};

/// Accumulates exclusion entries from every source.
///
/// Entries are kept in insertion order. Nothing is deduplicated: a probe
/// may appear several times under the same or different reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionReport {
	entries: Vec<ExclusionEntry>,
}

impl ExclusionReport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, entry: ExclusionEntry) {
		self.entries.push(entry);
	}

	/// Add a batch of probes sharing one reason.
	pub fn extend_with_reason<I>(&mut self, probes: I, reason: &ExclusionReason)
	where
		I: IntoIterator<Item = ProbeId>,
	{
		self.entries.extend(
			probes.into_iter().map(|id| ExclusionEntry::new(id, reason.clone())),
		);
	}

	pub fn entries(&self) -> &[ExclusionEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of entries per reason, ordered by reason.
	pub fn counts_by_reason(&self) -> BTreeMap<ExclusionReason, usize> {
		let mut counts = BTreeMap::new();
		for entry in &self.entries {
			*counts.entry(entry.reason.clone()).or_insert(0) += 1;
		}
		counts
	}
}

impl Extend<ExclusionEntry> for ExclusionReport {
	fn extend<I: IntoIterator<Item = ExclusionEntry>>(&mut self, iter: I) {
		self.entries.extend(iter);
	}
}
