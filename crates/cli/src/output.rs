//! Result printing.
//!
//! Text output mirrors net-snmp (`OID = TYPE: value`). JSON output is one
//! envelope per invocation:
//!
//! ```json
//! { "ok": true, "command": "get", "data": [ { "oid": "...", "type": "...", "value": "..." } ] }
//! ```

use serde::Serialize;
use smith::{VarBind, mib};

use crate::cli::OutputFormat;

/// One variable binding in JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingOutput {
	pub oid: String,
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub value: String,
}

impl From<&VarBind> for BindingOutput {
	fn from(vb: &VarBind) -> Self {
		Self {
			oid: vb.oid.to_string(),
			kind: mib::type_name(&vb.value),
			value: mib::plain_value(&vb.value),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
	pub ok: bool,
	pub command: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

pub fn print_bindings(command: &str, bindings: &[VarBind], format: OutputFormat) {
	match format {
		OutputFormat::Text => {
			for vb in bindings {
				println!("{} = {}", vb.oid, mib::render(&vb.value));
			}
		}
		OutputFormat::Json => {
			let data: Vec<BindingOutput> = bindings.iter().map(BindingOutput::from).collect();
			print_json(&Envelope {
				ok: true,
				command,
				data: Some(data),
				error: None,
			});
		}
	}
}

pub fn print_error(command: &str, message: &str, format: OutputFormat) {
	eprintln!("error: {message}");
	if format == OutputFormat::Json {
		print_json(&Envelope::<()> {
			ok: false,
			command,
			data: None,
			error: Some(message.to_string()),
		});
	}
}

pub fn print_json<T: Serialize>(value: &T) {
	match serde_json::to_string_pretty(value) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: cannot serialize output: {err}"),
	}
}
