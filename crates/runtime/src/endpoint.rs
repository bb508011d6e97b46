//! SNMP agent addresses.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 161;

/// UDP address of an SNMP agent. Defaults to `127.0.0.1:161`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
	pub host: String,
	pub port: u16,
}

impl Default for Endpoint {
	fn default() -> Self {
		Self {
			host: DEFAULT_HOST.to_string(),
			port: DEFAULT_PORT,
		}
	}
}

impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
		}
	}

	pub fn localhost(port: u16) -> Self {
		Self::new(DEFAULT_HOST, port)
	}

	/// Resolves to the first socket address for this host.
	pub async fn resolve(&self) -> Result<SocketAddr> {
		tokio::net::lookup_host((self.host.as_str(), self.port))
			.await
			.map_err(|e| Error::Transport(format!("cannot resolve {self}: {e}")))?
			.next()
			.ok_or_else(|| Error::Transport(format!("{self} resolved to no addresses")))
	}
}

impl From<SocketAddr> for Endpoint {
	fn from(addr: SocketAddr) -> Self {
		Self::new(addr.ip().to_string(), addr.port())
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.host.contains(':') {
			write!(f, "[{}]:{}", self.host, self.port)
		} else {
			write!(f, "{}:{}", self.host, self.port)
		}
	}
}

impl FromStr for Endpoint {
	type Err = String;

	/// Accepts `host`, `host:port`, or `[v6]:port`.
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		if let Ok(addr) = s.parse::<SocketAddr>() {
			return Ok(addr.into());
		}
		match s.rsplit_once(':') {
			Some((host, port)) if !host.contains(':') => {
				let port = port
					.parse::<u16>()
					.map_err(|_| format!("invalid port in endpoint {s:?}"))?;
				if host.is_empty() {
					return Err(format!("missing host in endpoint {s:?}"));
				}
				Ok(Self::new(host, port))
			}
			_ if s.is_empty() => Err("empty endpoint".to_string()),
			_ => Ok(Self::new(s.trim_start_matches('[').trim_end_matches(']'), DEFAULT_PORT)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_local_snmp_port() {
		assert_eq!(Endpoint::default().to_string(), "127.0.0.1:161");
	}

	#[test]
	fn parses_common_forms() {
		assert_eq!("localhost".parse::<Endpoint>().unwrap(), Endpoint::new("localhost", 161));
		assert_eq!("127.0.0.1:1161".parse::<Endpoint>().unwrap(), Endpoint::localhost(1161));
		assert_eq!("[::1]:162".parse::<Endpoint>().unwrap(), Endpoint::new("::1", 162));
		assert!("host:notaport".parse::<Endpoint>().is_err());
		assert!(":161".parse::<Endpoint>().is_err());
	}

	#[test]
	fn partial_json_fills_defaults() {
		let endpoint: Endpoint = serde_json::from_str(r#"{"port": 1161}"#).unwrap();
		assert_eq!(endpoint, Endpoint::localhost(1161));
	}

	#[tokio::test]
	async fn resolves_loopback() {
		let addr = Endpoint::localhost(1161).resolve().await.unwrap();
		assert!(addr.ip().is_loopback());
		assert_eq!(addr.port(), 1161);
	}
}
