use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use smith::{AuthProtocol, PrivProtocol, SecurityLevel, SecurityParams, SnmpVersion};

use crate::styles::cli_styles;
use crate::value::ValueKind;

/// How command results are written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// net-snmp style `OID = TYPE: value` lines
	#[default]
	Text,
	/// One JSON envelope per invocation
	Json,
}

#[derive(Parser, Debug)]
#[command(name = "smith")]
#[command(about = "SmithSNMP integration harness - run scenarios and query agents")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a scenario file: start daemons, run every conformance check, tear down
	Run(RunArgs),
	/// Read one object
	Get(QueryArgs),
	/// Read the object following an OID
	#[command(name = "getnext")]
	GetNext(QueryArgs),
	/// Read every object under an OID
	Walk(QueryArgs),
	/// Write one object
	Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
	/// Scenario file (JSON)
	#[arg(value_name = "SCENARIO")]
	pub scenario: PathBuf,
}

/// Where to send requests.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
	/// Agent host
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Agent UDP port
	#[arg(long, default_value_t = 161)]
	pub port: u16,

	/// Per-request timeout in seconds; defaults to SMITH_TIMEOUT_SECS or 5
	#[arg(short = 't', long, value_name = "SECS")]
	pub timeout: Option<u64>,
}

/// Security flags, named after the net-snmp command-line tools.
#[derive(Args, Debug, Clone)]
pub struct SecurityArgs {
	/// SNMP version: 2c or 3
	#[arg(long = "snmp-version", value_name = "VERSION", default_value = "2c")]
	pub version: SnmpVersion,

	/// Community string (v2c)
	#[arg(short = 'c', long)]
	pub community: Option<String>,

	/// USM user name (v3)
	#[arg(short = 'u', long)]
	pub user: Option<String>,

	/// Security level: authNoPriv or authPriv (v3)
	#[arg(short = 'l', long)]
	pub level: Option<SecurityLevel>,

	/// Authentication protocol: MD5 or SHA
	#[arg(short = 'a', long)]
	pub auth_protocol: Option<AuthProtocol>,

	/// Authentication passphrase
	#[arg(short = 'A', long)]
	pub auth_key: Option<String>,

	/// Privacy protocol: AES
	#[arg(short = 'x', long)]
	pub priv_protocol: Option<PrivProtocol>,

	/// Privacy passphrase
	#[arg(short = 'X', long)]
	pub priv_key: Option<String>,
}

impl SecurityArgs {
	/// Flat parameters in the shape scenario files use. A v2c invocation
	/// without `-c` defaults to the "public" community.
	pub fn to_params(&self) -> SecurityParams {
		let community = match self.version {
			SnmpVersion::V2c => Some(self.community.clone().unwrap_or_else(|| "public".to_string())),
			SnmpVersion::V3 => self.community.clone(),
		};
		SecurityParams {
			version: Some(self.version),
			community,
			user: self.user.clone(),
			level: self.level,
			auth_protocol: self.auth_protocol,
			auth_key: self.auth_key.clone(),
			priv_protocol: self.priv_protocol,
			priv_key: self.priv_key.clone(),
		}
	}
}

#[derive(Args, Debug)]
pub struct QueryArgs {
	/// Object identifier, dotted (`1.3.6.1.2.1.1.1.0`)
	pub oid: String,

	#[command(flatten)]
	pub target: TargetArgs,

	#[command(flatten)]
	pub security: SecurityArgs,
}

#[derive(Args, Debug)]
pub struct SetArgs {
	/// Object identifier, dotted
	pub oid: String,

	/// Value type: i, u, g, c, t, s, x, o, a or n
	#[arg(value_name = "TYPE")]
	pub kind: ValueKind,

	/// Value, interpreted according to TYPE
	#[arg(allow_hyphen_values = true)]
	pub value: String,

	#[command(flatten)]
	pub target: TargetArgs,

	#[command(flatten)]
	pub security: SecurityArgs,
}
