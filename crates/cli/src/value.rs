//! Typed values for `smith set`, using the net-snmp type letters.

use std::net::Ipv4Addr;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use smith::{Value, mib};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	/// `i`: INTEGER
	Integer,
	/// `u` or `g`: Gauge32
	Gauge,
	/// `c`: Counter32
	Counter,
	/// `t`: TimeTicks
	TimeTicks,
	/// `s`: OCTET STRING from text
	String,
	/// `x`: OCTET STRING from hex digits
	Hex,
	/// `o`: OBJECT IDENTIFIER
	Oid,
	/// `a`: IpAddress
	IpAddress,
	/// `n`: NULL
	Null,
}

impl FromStr for ValueKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"i" => Ok(ValueKind::Integer),
			"u" | "g" => Ok(ValueKind::Gauge),
			"c" => Ok(ValueKind::Counter),
			"t" => Ok(ValueKind::TimeTicks),
			"s" => Ok(ValueKind::String),
			"x" => Ok(ValueKind::Hex),
			"o" => Ok(ValueKind::Oid),
			"a" => Ok(ValueKind::IpAddress),
			"n" => Ok(ValueKind::Null),
			other => Err(format!(
				"unknown value type {other:?} (expected one of i, u, g, c, t, s, x, o, a, n)"
			)),
		}
	}
}

impl ValueKind {
	pub fn parse(self, raw: &str) -> Result<Value> {
		let value = match self {
			ValueKind::Integer => Value::Integer(raw.parse().with_context(|| format!("invalid INTEGER {raw:?}"))?),
			ValueKind::Gauge => Value::Gauge32(raw.parse().with_context(|| format!("invalid Gauge32 {raw:?}"))?),
			ValueKind::Counter => {
				Value::Counter32(raw.parse().with_context(|| format!("invalid Counter32 {raw:?}"))?)
			}
			ValueKind::TimeTicks => {
				Value::TimeTicks(raw.parse().with_context(|| format!("invalid TimeTicks {raw:?}"))?)
			}
			ValueKind::String => Value::OctetString(raw.to_string().into()),
			ValueKind::Hex => Value::OctetString(parse_hex(raw)?.into()),
			ValueKind::Oid => {
				Value::ObjectIdentifier(mib::parse_oid(raw).ok_or_else(|| anyhow!("invalid OID {raw:?}"))?)
			}
			ValueKind::IpAddress => {
				let addr: Ipv4Addr = raw.parse().with_context(|| format!("invalid IpAddress {raw:?}"))?;
				Value::IpAddress(addr.octets())
			}
			ValueKind::Null => Value::Null,
		};
		Ok(value)
	}
}

/// Accepts `"0a 1b"`, `"0a1b"` and `"0A:1B"`.
fn parse_hex(raw: &str) -> Result<Vec<u8>> {
	let digits: String = raw
		.chars()
		.filter(|c| !c.is_whitespace() && *c != ':')
		.collect();
	if digits.len() % 2 != 0 {
		bail!("hex string {raw:?} has an odd number of digits");
	}
	hex::decode(&digits).with_context(|| format!("invalid hex string {raw:?}"))
}
