use crate::error::{FilterError, Result};
use crate::types::ProbeId;

/// Return the probes known to sit behind a DNS-hijacking network.
///
/// Each was found by hand: the measurement queries 9.9.9.9 directly, yet
/// these probes got their answer from a different server. Duplicates are
/// kept as listed.
pub fn default_hijack_probes() -> Vec<ProbeId> {
	vec![
		53600,
		10540,
		55499,
		17822,
		1001549,
		18114,
		11992,
		19195,
		18114,
		1003780,
		20001,
		19195,
		53326,
		30041,
		4290,
		17830,
		54724,
		12681,
		19700,
		52914,
		14843,
		53200,
		1003302,
		55346,
		54441,
		26261,
		54271,
		53379,
		53920,
		50348,
	]
}

/// Parse probe ids, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn parse_probe_list(content: &str) -> Result<Vec<ProbeId>> {
	let mut probes = Vec::new();
	for (line_num, line) in content.lines().enumerate() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		let id = trimmed.parse::<ProbeId>()
			.map_err(|_| FilterError::InvalidProbeId {
				line: line_num + 1,
				value: trimmed.to_string(),
			})?;
		probes.push(id);
	}
	Ok(probes)
}

/// Read extra hijacked probe ids from a file.
pub fn read_probe_file(path: &str) -> Result<Vec<ProbeId>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| FilterError::read(path, e))?;
	parse_probe_list(&content)
}
