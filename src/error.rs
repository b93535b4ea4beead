use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors raised while collecting, classifying or persisting exclusions
#[derive(Debug, Error)]
pub enum FilterError {
	#[error("Atlas API request to {url} failed: {source}")]
	Http {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("Atlas API returned HTTP {status} for {url}")]
	Status { url: String, status: u16 },

	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid probe id '{value}' on line {line}")]
	InvalidProbeId { line: usize, value: String },

	#[error("results window of {days} days reaches before the earliest representable time")]
	InvalidWindow { days: u32 },

	#[error("failed to encode report: {0}")]
	Json(#[from] serde_json::Error),

	#[error("failed to encode CSV report: {0}")]
	Csv(#[from] csv::Error),
}

impl FilterError {
	pub fn http(url: &str, source: reqwest::Error) -> Self {
		FilterError::Http { url: url.to_string(), source }
	}

	pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		FilterError::Read { path: path.into(), source }
	}

	pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		FilterError::Write { path: path.into(), source }
	}
}
