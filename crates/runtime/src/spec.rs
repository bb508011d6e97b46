//! Launch descriptions for supervised daemons.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

/// Placeholder in [`ProcessSpec::args`] replaced by the config file path.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// How to launch one daemon.
///
/// ```json
/// {
///   "name": "netsnmp",
///   "program": "snmpd",
///   "args": ["-f", "-Lo", "-C", "-c", "{config}"],
///   "config": "config/snmpd.conf",
///   "readiness": { "kind": "snmpDiscovery" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
	/// Role name used in logs and errors ("snmp", "netsnmp", "agentx").
	pub name: String,
	/// Executable path, or a bare name looked up on `PATH`.
	pub program: String,
	#[serde(default)]
	pub args: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub config: Option<PathBuf>,
	#[serde(default)]
	pub readiness: Readiness,
}

impl ProcessSpec {
	pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			program: program.into(),
			args: Vec::new(),
			config: None,
			readiness: Readiness::default(),
		}
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
		self.config = Some(path.into());
		self
	}

	pub fn readiness(mut self, readiness: Readiness) -> Self {
		self.readiness = readiness;
		self
	}

	/// Final argument vector: `{config}` placeholders are substituted, and if
	/// there are none the config path is appended.
	pub fn command_args(&self) -> Vec<String> {
		let Some(config) = &self.config else {
			return self.args.clone();
		};
		let config = config.to_string_lossy();
		if self.args.iter().any(|a| a.contains(CONFIG_PLACEHOLDER)) {
			self.args
				.iter()
				.map(|a| a.replace(CONFIG_PLACEHOLDER, &config))
				.collect()
		} else {
			let mut args = self.args.clone();
			args.push(config.into_owned());
			args
		}
	}
}

/// When a freshly launched daemon counts as ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Readiness {
	/// Ready once it survives the launch window.
	#[default]
	Started,
	/// Ready after a fixed delay, provided it is still alive.
	#[serde(rename_all = "camelCase")]
	Delay { millis: u64 },
	/// Ready once a TCP connect to `addr` succeeds.
	TcpPort { addr: SocketAddr },
	/// Ready once something holds the UDP port at `addr`.
	UdpBound { addr: SocketAddr },
	/// Ready once an SNMP engine-discovery request is answered. Without an
	/// explicit endpoint the supervisor's default endpoint is used.
	SnmpDiscovery {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		endpoint: Option<Endpoint>,
	},
}
