use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{FilterError, Result};
use crate::output::write_atomic;
use crate::types::ProbeId;

/// Probes that had no result in the previous run.
///
/// Only one run of history is kept: the state saved after a run is
/// exactly the set of probes missing in that run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutState {
	probes: BTreeSet<ProbeId>,
}

impl TimeoutState {
	pub fn contains(&self, id: ProbeId) -> bool {
		self.probes.contains(&id)
	}

	pub fn insert(&mut self, id: ProbeId) {
		self.probes.insert(id);
	}

	pub fn len(&self) -> usize {
		self.probes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.probes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = ProbeId> + '_ {
		self.probes.iter().copied()
	}

	/// Parse the on-disk form, one probe id per line.
	///
	/// Ids are compared as integers, so padding or leading zeros in the
	/// file do not matter. Unparseable lines are skipped with a warning.
	pub fn parse(content: &str) -> Self {
		let mut state = TimeoutState::default();
		for (line_num, line) in content.lines().enumerate() {
			let trimmed = line.trim();
			if trimmed.is_empty() {
				continue;
			}
			match trimmed.parse::<ProbeId>() {
				Ok(id) => state.insert(id),
				Err(_) => warn!(line = line_num + 1, value = trimmed, "ignoring malformed timeout state entry"),
			}
		}
		state
	}

	/// Render the on-disk form: one id per line, no header.
	pub fn render(&self) -> String {
		let mut out = String::new();
		for id in &self.probes {
			out.push_str(&id.to_string());
			out.push('\n');
		}
		out
	}

	/// Load the previous run's state. A missing file means a first run.
	pub fn load(path: &str) -> Result<Self> {
		match std::fs::read_to_string(path) {
			Ok(content) => {
				let state = Self::parse(&content);
				info!(path, probes = state.len(), "loaded timeout state");
				Ok(state)
			}
			Err(e) if e.kind() == ErrorKind::NotFound => {
				info!(path, "no timeout state found, starting empty");
				Ok(Self::default())
			}
			Err(e) => Err(FilterError::read(path, e)),
		}
	}

	/// Overwrite the state file with this run's missing probes.
	pub fn save(&self, path: &str) -> Result<()> {
		write_atomic(Path::new(path), self.render().as_bytes())?;
		info!(path, probes = self.len(), "saved timeout state");
		Ok(())
	}
}

impl FromIterator<ProbeId> for TimeoutState {
	fn from_iter<I: IntoIterator<Item = ProbeId>>(iter: I) -> Self {
		Self { probes: iter.into_iter().collect() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_compares_as_integers() {
		let state = TimeoutState::parse(" 0303 \n404\n\n");
		assert!(state.contains(303));
		assert!(state.contains(404));
		assert_eq!(state.len(), 2);
	}

	#[test]
	fn test_parse_skips_malformed_lines() {
		let state = TimeoutState::parse("101\nnot-a-probe\n-5\n202\n");
		let ids: Vec<ProbeId> = state.iter().collect();
		assert_eq!(ids, vec![101, 202]);
	}

	#[test]
	fn test_render_one_id_per_line() {
		let state: TimeoutState = [303, 101].into_iter().collect();
		assert_eq!(state.render(), "101\n303\n");
		assert_eq!(TimeoutState::default().render(), "");
	}

	#[test]
	fn test_load_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("timed-out.txt");
		let state = TimeoutState::load(path.to_str().unwrap()).unwrap();
		assert!(state.is_empty());
	}

	#[test]
	fn test_save_replaces_previous_contents() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("timed-out.txt");
		let path = path.to_str().unwrap();

		let first: TimeoutState = [1, 2, 3].into_iter().collect();
		first.save(path).unwrap();
		let second: TimeoutState = [4].into_iter().collect();
		second.save(path).unwrap();

		assert_eq!(std::fs::read_to_string(path).unwrap(), "4\n");
		assert_eq!(TimeoutState::load(path).unwrap(), second);
	}
}
