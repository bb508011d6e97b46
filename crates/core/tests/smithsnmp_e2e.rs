//! End-to-end scenarios against the real SmithSNMP agent and net-snmp.
//!
//! These need the daemons installed (see `SMITH_AGENT`, `SMITH_NETSNMP`,
//! `SMITH_NETSNMP_CONFIG`) and permission to bind UDP port 161, so they are
//! ignored by default. Run them with `cargo test -- --ignored --test-threads=1`.

mod common;

use std::path::PathBuf;

use smith::{
	AuthProtocol, HarnessConfig, PrivProtocol, ProcessSet, Scenario, ScenarioConfig, SecurityConfig,
	SecurityParams, conformance,
};

async fn run(name: &str, processes: ProcessSet, security: SecurityConfig) {
	common::init_tracing();
	let harness = HarnessConfig::from_env().unwrap();
	let config = ScenarioConfig::new(name, processes, SecurityParams::from(&security));
	let outcome = Scenario::run(&config, &harness, |ctx| async move {
		let mut session = ctx.connect().await?;
		conformance::run_all(&mut session).await
	})
	.await;
	if let Some(report) = &outcome.teardown {
		assert!(report.is_clean(), "{report}");
	}
	if let Err(failure) = outcome.result {
		panic!("{name}: {failure}");
	}
}

fn snmp() -> ProcessSet {
	ProcessSet::Snmp {
		config: PathBuf::from("config/snmp.conf"),
	}
}

fn agentx() -> ProcessSet {
	ProcessSet::AgentX {
		config: PathBuf::from("config/agentx.conf"),
	}
}

fn rw_auth_user() -> SecurityConfig {
	SecurityConfig::auth_no_priv("rwAuthUser", AuthProtocol::Md5, "rwAuthUser")
}

#[tokio::test]
#[ignore = "requires the smithsnmp binary"]
async fn snmp_v2c() {
	run("snmpv2c", snmp(), SecurityConfig::community("private")).await;
}

#[tokio::test]
#[ignore = "requires the smithsnmp binary"]
async fn snmp_v3_auth_only() {
	run("snmpv3-authonly", snmp(), rw_auth_user()).await;
}

#[tokio::test]
#[ignore = "requires the smithsnmp binary"]
async fn snmp_v3_auth_priv() {
	let security = SecurityConfig::auth_priv(
		"rwAuthPrivUser",
		AuthProtocol::Md5,
		"rwAuthPrivUser",
		PrivProtocol::Aes128,
		"rwAuthPrivUser",
	);
	run("snmpv3-authpriv", snmp(), security).await;
}

#[tokio::test]
#[ignore = "requires smithsnmp and net-snmp snmpd"]
async fn agentx_v2c() {
	run("agentxv2c", agentx(), SecurityConfig::community("private")).await;
}

#[tokio::test]
#[ignore = "requires smithsnmp and net-snmp snmpd"]
async fn agentx_v3_auth_only() {
	run("agentxv3-authonly", agentx(), rw_auth_user()).await;
}
