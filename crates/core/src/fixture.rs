//! Per-test scenario fixture.
//!
//! A [`Scenario`] composes a [`SupervisorSession`] with the client-side
//! [`ScenarioContext`]. Setup resolves security before any daemon starts,
//! launches the process set and checks liveness; teardown checks liveness
//! again so a crash during the test body is attributed to the test, then
//! stops everything.
//!
//! Scenario files are JSON:
//!
//! ```json
//! {
//!   "name": "agentx-v2c",
//!   "processes": { "template": "agentx", "config": "config/agentx.conf" },
//!   "security": { "version": "2c", "community": "private" },
//!   "endpoint": { "host": "127.0.0.1", "port": 161 }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smith_runtime::{
	Endpoint, Error, ProcessSpec, Readiness, Result, SupervisorOptions, SupervisorSession, TeardownReport,
};
use tracing::{error, info, warn};

use crate::config::{ConfigError, HarnessConfig};
use crate::security::{SecurityConfig, SecurityParams};
use crate::session::{Session, SessionOptions};

/// Time the AgentX sub-agent gets to register with the master agent.
pub const AGENTX_REGISTRATION_DELAY: Duration = Duration::from_secs(1);

/// Which daemons a scenario runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "camelCase")]
pub enum ProcessSet {
	/// The SmithSNMP agent on its own, as process "snmp".
	Snmp { config: PathBuf },
	/// net-snmp as master ("netsnmp"), then SmithSNMP as sub-agent ("agentx").
	#[serde(rename = "agentx")]
	AgentX { config: PathBuf },
	/// An explicit list, started in order.
	Custom { processes: Vec<ProcessSpec> },
}

impl ProcessSet {
	/// Expands the template into launch specs, resolving binaries from `harness`.
	pub fn expand(&self, harness: &HarnessConfig) -> Vec<ProcessSpec> {
		let agent = harness.agent.to_string_lossy().into_owned();
		match self {
			ProcessSet::Snmp { config } => vec![
				ProcessSpec::new("snmp", agent)
					.config(config)
					.readiness(Readiness::SnmpDiscovery { endpoint: None }),
			],
			ProcessSet::AgentX { config } => vec![
				ProcessSpec::new("netsnmp", harness.netsnmp.to_string_lossy())
					.args(["-f", "-Lo", "-C", "-c", smith_runtime::spec::CONFIG_PLACEHOLDER])
					.config(&harness.netsnmp_config)
					.readiness(Readiness::SnmpDiscovery { endpoint: None }),
				ProcessSpec::new("agentx", agent)
					.config(config)
					.readiness(Readiness::Delay {
						millis: AGENTX_REGISTRATION_DELAY.as_millis() as u64,
					}),
			],
			ProcessSet::Custom { processes } => processes.clone(),
		}
	}
}

/// Timeouts for one scenario. Unset values fall back to the harness default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Timeouts {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ready_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stop_grace_ms: Option<u64>,
}

impl Timeouts {
	pub fn ready(&self, harness: &HarnessConfig) -> Duration {
		self.ready_ms
			.map_or(harness.timeout * 2, Duration::from_millis)
	}

	pub fn request(&self, harness: &HarnessConfig) -> Duration {
		self.request_ms.map_or(harness.timeout, Duration::from_millis)
	}

	pub fn stop_grace(&self) -> Duration {
		self.stop_grace_ms
			.map_or(SupervisorOptions::default().stop_grace, Duration::from_millis)
	}
}

/// Everything needed to run one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioConfig {
	pub name: String,
	pub processes: ProcessSet,
	pub security: SecurityParams,
	#[serde(default)]
	pub endpoint: Endpoint,
	#[serde(default)]
	pub timeouts: Timeouts,
}

impl ScenarioConfig {
	pub fn new(name: impl Into<String>, processes: ProcessSet, security: SecurityParams) -> Self {
		Self {
			name: name.into(),
			processes,
			security,
			endpoint: Endpoint::default(),
			timeouts: Timeouts::default(),
		}
	}

	pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
		self.endpoint = endpoint;
		self
	}

	pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
		self.timeouts = timeouts;
		self
	}

	/// Reads a scenario file.
	pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// What a test body needs to talk to the agent under test.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
	pub endpoint: Endpoint,
	pub security: SecurityConfig,
	pub options: SessionOptions,
}

impl ScenarioContext {
	/// Opens a fresh session against the scenario endpoint.
	pub async fn connect(&self) -> Result<Session> {
		Session::connect(self.endpoint.clone(), self.security.clone(), self.options.clone()).await
	}
}

/// A running scenario.
#[derive(Debug)]
pub struct Scenario {
	name: String,
	supervisor: SupervisorSession,
	context: ScenarioContext,
}

impl Scenario {
	/// Resolves security, starts the process set and checks it is alive.
	///
	/// # Errors
	///
	/// [`Error::SecurityConfig`] before any process starts,
	/// [`Error::Setup`] naming the daemon that failed to start, or
	/// [`Error::DaemonDown`] if a daemon died right after becoming ready.
	pub async fn setup(config: &ScenarioConfig, harness: &HarnessConfig) -> Result<Self> {
		let security = config.security.resolve()?;
		let specs = config.processes.expand(harness);
		info!(
			target = "smith",
			scenario = %config.name,
			security = %security,
			endpoint = %config.endpoint,
			"scenario setup"
		);

		let options = SupervisorOptions {
			ready_timeout: config.timeouts.ready(harness),
			stop_grace: config.timeouts.stop_grace(),
			endpoint: config.endpoint.clone(),
		};
		let mut supervisor = SupervisorSession::setup(specs, options).await?;
		if let Err(err) = supervisor.verify_all_alive().await {
			let report = supervisor.teardown().await;
			warn!(target = "smith", scenario = %config.name, %report, "setup aborted");
			return Err(err);
		}

		Ok(Self {
			name: config.name.clone(),
			supervisor,
			context: ScenarioContext {
				endpoint: config.endpoint.clone(),
				security,
				options: SessionOptions::default().with_timeout(config.timeouts.request(harness)),
			},
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn context(&self) -> ScenarioContext {
		self.context.clone()
	}

	pub fn supervisor(&self) -> &SupervisorSession {
		&self.supervisor
	}

	pub fn supervisor_mut(&mut self) -> &mut SupervisorSession {
		&mut self.supervisor
	}

	/// Checks liveness, then stops every daemon.
	///
	/// Teardown always runs. The liveness error, if any, is returned; the
	/// teardown report is logged.
	pub async fn teardown(mut self) -> Result<TeardownReport> {
		let (liveness, report) = self.finish().await;
		liveness.map(|()| report)
	}

	async fn finish(&mut self) -> (Result<()>, TeardownReport) {
		let liveness = self.supervisor.verify_all_alive().await;
		let report = self.supervisor.teardown().await;
		if report.is_clean() {
			info!(target = "smith", scenario = %self.name, %report, "scenario teardown");
		} else {
			warn!(target = "smith", scenario = %self.name, %report, "scenario teardown was not clean");
		}
		(liveness, report)
	}

	/// Runs `body` between setup and teardown.
	///
	/// The verdict prefers a body error over a post-body liveness error.
	/// Teardown failures are attached to the outcome but never change it.
	pub async fn run<F, Fut, E>(config: &ScenarioConfig, harness: &HarnessConfig, body: F) -> ScenarioOutcome<E>
	where
		F: FnOnce(ScenarioContext) -> Fut,
		Fut: Future<Output = std::result::Result<(), E>>,
		E: fmt::Display,
	{
		let mut scenario = match Self::setup(config, harness).await {
			Ok(scenario) => scenario,
			Err(err) => {
				error!(target = "smith", scenario = %config.name, error = %err, "scenario setup failed");
				return ScenarioOutcome {
					name: config.name.clone(),
					result: Err(ScenarioFailure::Setup(err)),
					teardown: None,
				};
			}
		};

		let body_result = body(scenario.context()).await;
		let (liveness, report) = scenario.finish().await;

		let result = match (body_result, liveness) {
			(Err(err), _) => Err(ScenarioFailure::Body(err)),
			(Ok(()), Err(err)) => Err(ScenarioFailure::Liveness(err)),
			(Ok(()), Ok(())) => Ok(()),
		};
		match &result {
			Ok(()) => info!(target = "smith", scenario = %config.name, "scenario passed"),
			Err(failure) => error!(target = "smith", scenario = %config.name, %failure, "scenario failed"),
		}
		ScenarioOutcome {
			name: config.name.clone(),
			result,
			teardown: Some(report),
		}
	}
}

/// Why a scenario failed.
#[derive(Debug)]
pub enum ScenarioFailure<E> {
	/// Setup failed; the body never ran.
	Setup(Error),
	Body(E),
	/// The body passed but a daemon was found dead afterwards.
	Liveness(Error),
}

impl<E: fmt::Display> fmt::Display for ScenarioFailure<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScenarioFailure::Setup(err) => write!(f, "setup failed: {err}"),
			ScenarioFailure::Body(err) => write!(f, "{err}"),
			ScenarioFailure::Liveness(err) => write!(f, "after test body: {err}"),
		}
	}
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ScenarioFailure<E> {}

/// Result of [`Scenario::run`].
#[derive(Debug)]
pub struct ScenarioOutcome<E> {
	pub name: String,
	pub result: std::result::Result<(), ScenarioFailure<E>>,
	/// Absent when setup failed.
	pub teardown: Option<TeardownReport>,
}

impl<E> ScenarioOutcome<E> {
	pub fn passed(&self) -> bool {
		self.result.is_ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn harness() -> HarnessConfig {
		HarnessConfig {
			agent: PathBuf::from("/opt/smith/bin/smithsnmp"),
			netsnmp: PathBuf::from("/usr/sbin/snmpd"),
			netsnmp_config: PathBuf::from("config/snmpd.conf"),
			timeout: Duration::from_secs(4),
		}
	}

	#[test]
	fn agentx_template_starts_master_first() {
		let set = ProcessSet::AgentX {
			config: PathBuf::from("config/agentx.conf"),
		};
		let specs = set.expand(&harness());
		let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
		assert_eq!(names, ["netsnmp", "agentx"]);
		assert_eq!(
			specs[0].command_args(),
			["-f", "-Lo", "-C", "-c", "config/snmpd.conf"]
		);
		assert_eq!(specs[1].program, "/opt/smith/bin/smithsnmp");
		assert_eq!(specs[1].command_args(), ["config/agentx.conf"]);
		assert_eq!(specs[1].readiness, Readiness::Delay { millis: 1000 });
	}

	#[test]
	fn scenario_file_parses() {
		let raw = r#"{
			"name": "snmpv3-auth",
			"processes": { "template": "snmp", "config": "config/snmp.conf" },
			"security": {
				"version": "3", "user": "rwAuthUser", "level": "authNoPriv",
				"authProtocol": "MD5", "authKey": "rwAuthUser"
			},
			"endpoint": { "host": "127.0.0.1", "port": 1161 },
			"timeouts": { "requestMs": 1500 }
		}"#;
		let config: ScenarioConfig = serde_json::from_str(raw).unwrap();
		assert_eq!(config.endpoint.port, 1161);
		assert_eq!(
			config.timeouts.request(&harness()),
			Duration::from_millis(1500)
		);
		assert_eq!(config.timeouts.ready(&harness()), Duration::from_secs(8));
		assert!(matches!(config.processes, ProcessSet::Snmp { .. }));
		assert!(config.security.resolve().is_ok());
	}

	#[test]
	fn load_reports_path_on_parse_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("broken.json");
		std::fs::write(&path, "{ \"name\": ").unwrap();
		let err = ScenarioConfig::load(&path).unwrap_err();
		assert!(matches!(err, ConfigError::Parse { .. }));
		assert!(err.to_string().contains("broken.json"));
	}

	#[tokio::test]
	async fn invalid_security_fails_before_launch() {
		let config = ScenarioConfig::new(
			"bad",
			ProcessSet::Snmp {
				config: PathBuf::from("/nonexistent/snmp.conf"),
			},
			SecurityParams {
				version: Some(crate::security::SnmpVersion::V2c),
				..SecurityParams::default()
			},
		);
		let err = Scenario::setup(&config, &harness()).await.unwrap_err();
		assert!(matches!(err, Error::SecurityConfig(_)), "{err}");
	}
}
