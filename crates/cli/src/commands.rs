use std::time::Duration;

use serde::Serialize;
use smith::{
	Endpoint, HarnessConfig, Oid, Scenario, ScenarioConfig, Session, SessionOptions, VarBind, conformance, mib,
};
use tracing::info;

use crate::cli::{Cli, Commands, OutputFormat, QueryArgs, RunArgs, SecurityArgs, SetArgs, TargetArgs};
use crate::error::{CliError, Result};
use crate::output::{self, Envelope};

impl Commands {
	/// Name used in output envelopes and error messages.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Run(_) => "run",
			Commands::Get(_) => "get",
			Commands::GetNext(_) => "getnext",
			Commands::Walk(_) => "walk",
			Commands::Set(_) => "set",
		}
	}
}

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	match cli.command {
		Commands::Run(args) => run(args, format).await,
		Commands::Get(args) => {
			let oid = parse_oid(&args.oid)?;
			let mut session = open(&args.target, &args.security).await?;
			let value = session.get(&oid).await?;
			output::print_bindings("get", &[VarBind::new(oid, value)], format);
			Ok(())
		}
		Commands::GetNext(args) => {
			let oid = parse_oid(&args.oid)?;
			let mut session = open(&args.target, &args.security).await?;
			let vb = session.get_next(&oid).await?;
			output::print_bindings("getnext", &[vb], format);
			Ok(())
		}
		Commands::Walk(args) => walk(args, format).await,
		Commands::Set(args) => set(args, format).await,
	}
}

async fn open(target: &TargetArgs, security: &SecurityArgs) -> Result<Session> {
	let security = security.to_params().resolve()?;
	let timeout = match target.timeout {
		Some(0) => return Err(CliError::ZeroTimeout),
		Some(secs) => Duration::from_secs(secs),
		None => HarnessConfig::from_env()?.timeout,
	};
	let endpoint = Endpoint::new(target.host.clone(), target.port);
	let session = Session::connect(endpoint, security, SessionOptions::default().with_timeout(timeout)).await?;
	Ok(session)
}

fn parse_oid(raw: &str) -> Result<Oid> {
	mib::parse_oid(raw).ok_or_else(|| CliError::InvalidOid(raw.to_string()))
}

async fn walk(args: QueryArgs, format: OutputFormat) -> Result<()> {
	let root = parse_oid(&args.oid)?;
	let mut session = open(&args.target, &args.security).await?;
	let bindings = session.walk(&root).await?;
	if bindings.is_empty() && format == OutputFormat::Text {
		println!("{root} = No Such Object available on this agent at this OID");
		return Ok(());
	}
	output::print_bindings("walk", &bindings, format);
	Ok(())
}

async fn set(args: SetArgs, format: OutputFormat) -> Result<()> {
	let oid = parse_oid(&args.oid)?;
	let value = args.kind.parse(&args.value)?;
	let mut session = open(&args.target, &args.security).await?;
	let echoed = session.set(&oid, value).await?;
	output::print_bindings("set", &[VarBind::new(oid, echoed)], format);
	Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
	scenario: String,
	passed: bool,
	checks: Vec<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	failure: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	teardown: Option<String>,
}

async fn run(args: RunArgs, format: OutputFormat) -> Result<()> {
	let config = ScenarioConfig::load(&args.scenario)?;
	let harness = HarnessConfig::from_env()?;
	info!(target = "smith", scenario = %config.name, file = %args.scenario.display(), "running scenario");

	let outcome = Scenario::run(&config, &harness, |ctx| async move {
		let mut session = ctx.connect().await?;
		conformance::run_all(&mut session).await
	})
	.await;

	let summary = RunSummary {
		scenario: outcome.name.clone(),
		passed: outcome.passed(),
		checks: conformance::CHECKS.to_vec(),
		failure: outcome.result.as_ref().err().map(ToString::to_string),
		teardown: outcome.teardown.as_ref().map(ToString::to_string),
	};
	match format {
		OutputFormat::Text => {
			let verdict = if summary.passed { "PASS" } else { "FAIL" };
			println!("{verdict} {} ({} checks)", summary.scenario, summary.checks.len());
			if let Some(teardown) = &summary.teardown {
				println!("  teardown: {teardown}");
			}
		}
		OutputFormat::Json => output::print_json(&Envelope {
			ok: summary.passed,
			command: "run",
			data: Some(&summary),
			error: None,
		}),
	}

	if let Err(failure) = outcome.result {
		return Err(CliError::OutputAlreadyPrinted(format!(
			"scenario {}: {failure}",
			outcome.name
		)));
	}
	Ok(())
}
