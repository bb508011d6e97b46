//! Well-known objects and net-snmp style value rendering.

use async_snmp::{Oid, Value, oid};

/// system (1.3.6.1.2.1.1)
pub fn system() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1)
}

/// sysDescr.0
pub fn sys_descr() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}

/// sysObjectID.0
pub fn sys_object_id() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)
}

/// sysUpTime.0
pub fn sys_up_time() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}

/// sysContact.0
pub fn sys_contact() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 4, 0)
}

/// sysName.0
pub fn sys_name() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}

/// sysLocation.0
pub fn sys_location() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}

/// ifNumber.0
pub fn if_number() -> Oid {
	oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)
}

/// Parses dotted OID text. A leading dot is accepted, as net-snmp does.
pub fn parse_oid(text: &str) -> Option<Oid> {
	let trimmed = text.trim().trim_start_matches('.');
	if trimmed.is_empty() {
		return None;
	}
	Oid::parse(trimmed).ok()
}

/// True for noSuchObject, noSuchInstance and endOfMibView.
pub fn is_exception(value: &Value) -> bool {
	matches!(
		value,
		Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
	)
}

/// net-snmp type label for `value`, as printed before the colon.
pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Integer(_) => "INTEGER",
		Value::OctetString(bytes) if std::str::from_utf8(bytes.as_ref()).is_ok() => "STRING",
		Value::OctetString(_) => "Hex-STRING",
		Value::Null => "NULL",
		Value::ObjectIdentifier(_) => "OID",
		Value::IpAddress(_) => "IpAddress",
		Value::Counter32(_) => "Counter32",
		Value::Gauge32(_) => "Gauge32",
		Value::TimeTicks(_) => "Timeticks",
		Value::Opaque(_) => "OPAQUE",
		Value::Counter64(_) => "Counter64",
		Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => "",
		_ => "UNKNOWN",
	}
}

/// The value without its type label.
pub fn plain_value(value: &Value) -> String {
	match value {
		Value::Integer(v) => v.to_string(),
		Value::OctetString(bytes) => match std::str::from_utf8(bytes.as_ref()) {
			Ok(text) => text.to_string(),
			Err(_) => spaced_hex(bytes.as_ref()),
		},
		Value::Null => String::new(),
		Value::ObjectIdentifier(oid) => oid.to_string(),
		Value::IpAddress([a, b, c, d]) => format!("{a}.{b}.{c}.{d}"),
		Value::Counter32(v) | Value::Gauge32(v) => v.to_string(),
		Value::TimeTicks(v) => format!("({v})"),
		Value::Opaque(bytes) => spaced_hex(bytes.as_ref()),
		Value::Counter64(v) => v.to_string(),
		Value::NoSuchObject => "No Such Object available on this agent at this OID".to_string(),
		Value::NoSuchInstance => "No Such Instance currently exists at this OID".to_string(),
		Value::EndOfMibView => "No more variables left in this MIB View".to_string(),
		other => format!("{other:?}"),
	}
}

/// `value` the way net-snmp prints it after `OID = `.
pub fn render(value: &Value) -> String {
	match type_name(value) {
		"" => plain_value(value),
		"STRING" => format!("STRING: \"{}\"", plain_value(value)),
		"NULL" => "NULL".to_string(),
		name => format!("{name}: {}", plain_value(value)),
	}
}

fn spaced_hex(bytes: &[u8]) -> String {
	let encoded = hex::encode_upper(bytes);
	let pairs: Vec<&str> = (0..encoded.len())
		.step_by(2)
		.filter_map(|i| encoded.get(i..i + 2))
		.collect();
	pairs.join(" ")
}
