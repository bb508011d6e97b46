//! Environment-backed harness configuration.
//!
//! Daemon binaries and the default timeout come from environment variables.
//! Values are validated strictly: a variable that is set but empty, not
//! UTF-8, or unparsable is an error rather than a silent fallback.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Path to the SmithSNMP agent binary.
pub const ENV_AGENT: &str = "SMITH_AGENT";
/// net-snmp master agent binary used in AgentX scenarios.
pub const ENV_NETSNMP: &str = "SMITH_NETSNMP";
/// Config file passed to the net-snmp master agent.
pub const ENV_NETSNMP_CONFIG: &str = "SMITH_NETSNMP_CONFIG";
/// Default per-request and readiness timeout, in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "SMITH_TIMEOUT_SECS";

pub const DEFAULT_AGENT: &str = "./bin/smithsnmp";
pub const DEFAULT_NETSNMP: &str = "snmpd";
pub const DEFAULT_NETSNMP_CONFIG: &str = "config/snmpd.conf";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{var}: {reason}")]
	Env { var: &'static str, reason: String },

	#[error("cannot read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid scenario file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Resolved daemon locations and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
	pub agent: PathBuf,
	pub netsnmp: PathBuf,
	pub netsnmp_config: PathBuf,
	pub timeout: Duration,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			agent: PathBuf::from(DEFAULT_AGENT),
			netsnmp: PathBuf::from(DEFAULT_NETSNMP),
			netsnmp_config: PathBuf::from(DEFAULT_NETSNMP_CONFIG),
			timeout: DEFAULT_TIMEOUT,
		}
	}
}

impl HarnessConfig {
	/// Loads configuration from the process environment.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Env`] when a variable is set but invalid.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var_os(name))
	}

	/// Loads configuration through `lookup`, which returns the raw value of a
	/// variable if it is set.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<std::ffi::OsString>,
	{
		let read = |var: &'static str| -> Result<Option<String>, ConfigError> {
			let Some(raw) = lookup(var) else {
				return Ok(None);
			};
			let value = raw.into_string().map_err(|_| ConfigError::Env {
				var,
				reason: "must be valid UTF-8".to_string(),
			})?;
			if value.trim().is_empty() {
				return Err(ConfigError::Env {
					var,
					reason: "must not be empty".to_string(),
				});
			}
			Ok(Some(value))
		};

		let defaults = Self::default();
		let timeout = match read(ENV_TIMEOUT_SECS)? {
			Some(raw) => parse_timeout_secs(&raw).map_err(|reason| ConfigError::Env {
				var: ENV_TIMEOUT_SECS,
				reason,
			})?,
			None => defaults.timeout,
		};
		Ok(Self {
			agent: read(ENV_AGENT)?.map_or(defaults.agent, PathBuf::from),
			netsnmp: read(ENV_NETSNMP)?.map_or(defaults.netsnmp, PathBuf::from),
			netsnmp_config: read(ENV_NETSNMP_CONFIG)?.map_or(defaults.netsnmp_config, PathBuf::from),
			timeout,
		})
	}
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, String> {
	let secs: u64 = raw
		.trim()
		.parse()
		.map_err(|_| "must be a positive integer number of seconds".to_string())?;
	if secs == 0 {
		return Err("must be greater than zero".to_string());
	}
	Ok(Duration::from_secs(secs))
}
