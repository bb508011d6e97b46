//! SmithSNMP integration harness.
//!
//! Runs the SmithSNMP agent (alone, or as an AgentX sub-agent under a
//! net-snmp master), drives SNMP sessions against it and checks the answers.
//!
//! - [`Scenario`]: setup, liveness checks and teardown around a test body
//! - [`Session`]: get / getnext / set / getbulk / walk over v2c or v3 USM
//! - [`conformance`]: the checks every scenario runs
//! - [`mib`]: well-known OIDs and net-snmp style value rendering
//! - [`HarnessConfig`]: daemon binaries and timeouts from the environment
//!
//! ```no_run
//! use smith::{HarnessConfig, ProcessSet, Scenario, ScenarioConfig, SecurityConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScenarioConfig::new(
//! 	"snmpv2c",
//! 	ProcessSet::Snmp { config: "config/snmp.conf".into() },
//! 	(&SecurityConfig::community("private")).into(),
//! );
//! let outcome = Scenario::run(&config, &HarnessConfig::from_env()?, |ctx| async move {
//! 	let mut session = ctx.connect().await?;
//! 	smith::conformance::run_all(&mut session).await
//! })
//! .await;
//! assert!(outcome.passed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conformance;
pub mod fixture;
pub mod mib;
pub mod security;
pub mod session;

pub use config::{ConfigError, HarnessConfig};
pub use conformance::CheckFailure;
pub use fixture::{
	ProcessSet, Scenario, ScenarioConfig, ScenarioContext, ScenarioFailure, ScenarioOutcome, Timeouts,
};
pub use security::{
	AuthProtocol, MIN_PASSWORD_LEN, PrivProtocol, Privacy, SecurityConfig, SecurityLevel, SecurityParams,
	SnmpVersion, UsmConfig,
};
pub use session::{Session, SessionOptions, SessionState};
pub use async_snmp::{self as snmp, Oid, Value, VarBind, oid};
pub use smith_runtime::{self as runtime, Endpoint, Error, ErrorStatus, Result, TeardownReport};
