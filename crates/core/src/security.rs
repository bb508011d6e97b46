//! Client security configuration.
//!
//! [`SecurityParams`] is the flat, all-optional attribute surface that
//! scenario files and CLI flags fill in. [`SecurityParams::resolve`] turns it
//! into a [`SecurityConfig`] whose variants make invalid combinations
//! unrepresentable.

use std::fmt;
use std::str::FromStr;

use async_snmp::Auth;
use serde::{Deserialize, Serialize};
use smith_runtime::{Error, Result};

/// Minimum USM password length (RFC 3414 section 11.2).
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnmpVersion {
	#[serde(rename = "2c")]
	V2c,
	#[serde(rename = "3")]
	V3,
}

impl fmt::Display for SnmpVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SnmpVersion::V2c => "2c",
			SnmpVersion::V3 => "3",
		})
	}
}

impl FromStr for SnmpVersion {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim_start_matches(['v', 'V']) {
			"2c" => Ok(SnmpVersion::V2c),
			"3" => Ok(SnmpVersion::V3),
			_ => Err(format!("unsupported SNMP version {s:?} (expected 2c or 3)")),
		}
	}
}

/// USM authentication protocols the agent under test offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthProtocol {
	#[serde(rename = "MD5")]
	Md5,
	#[serde(rename = "SHA", alias = "SHA1")]
	Sha1,
}

impl AuthProtocol {
	pub fn name(self) -> &'static str {
		match self {
			AuthProtocol::Md5 => "MD5",
			AuthProtocol::Sha1 => "SHA",
		}
	}
}

impl From<AuthProtocol> for async_snmp::AuthProtocol {
	fn from(protocol: AuthProtocol) -> Self {
		match protocol {
			AuthProtocol::Md5 => async_snmp::AuthProtocol::Md5,
			AuthProtocol::Sha1 => async_snmp::AuthProtocol::Sha1,
		}
	}
}

impl fmt::Display for AuthProtocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for AuthProtocol {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"MD5" => Ok(AuthProtocol::Md5),
			"SHA" | "SHA1" | "SHA-1" => Ok(AuthProtocol::Sha1),
			other => Err(format!("unsupported auth protocol {other:?} (expected MD5 or SHA)")),
		}
	}
}

/// USM privacy protocols. DES is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivProtocol {
	#[serde(rename = "AES", alias = "AES128")]
	Aes128,
}

impl PrivProtocol {
	pub fn name(self) -> &'static str {
		match self {
			PrivProtocol::Aes128 => "AES",
		}
	}
}

impl From<PrivProtocol> for async_snmp::PrivProtocol {
	fn from(protocol: PrivProtocol) -> Self {
		match protocol {
			PrivProtocol::Aes128 => async_snmp::PrivProtocol::Aes128,
		}
	}
}

impl fmt::Display for PrivProtocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for PrivProtocol {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"AES" | "AES128" | "AES-128" => Ok(PrivProtocol::Aes128),
			other => Err(format!("unsupported privacy protocol {other:?} (expected AES)")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
	#[serde(rename = "authNoPriv")]
	AuthNoPriv,
	#[serde(rename = "authPriv")]
	AuthPriv,
}

impl fmt::Display for SecurityLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SecurityLevel::AuthNoPriv => "authNoPriv",
			SecurityLevel::AuthPriv => "authPriv",
		})
	}
}

impl FromStr for SecurityLevel {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"authNoPriv" => Ok(SecurityLevel::AuthNoPriv),
			"authPriv" => Ok(SecurityLevel::AuthPriv),
			_ => Err(format!(
				"unsupported security level {s:?} (expected authNoPriv or authPriv)"
			)),
		}
	}
}

/// Privacy protocol and password for `authPriv` users.
#[derive(Clone, PartialEq, Eq)]
pub struct Privacy {
	pub protocol: PrivProtocol,
	pub key: String,
}

impl fmt::Debug for Privacy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Privacy")
			.field("protocol", &self.protocol)
			.field("key", &"<redacted>")
			.finish()
	}
}

/// A USM user.
#[derive(Clone, PartialEq, Eq)]
pub struct UsmConfig {
	pub user: String,
	pub level: SecurityLevel,
	pub auth_protocol: AuthProtocol,
	pub auth_key: String,
	pub privacy: Option<Privacy>,
}

impl fmt::Debug for UsmConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UsmConfig")
			.field("user", &self.user)
			.field("level", &self.level)
			.field("auth_protocol", &self.auth_protocol)
			.field("auth_key", &"<redacted>")
			.field("privacy", &self.privacy)
			.finish()
	}
}

/// Validated client security settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityConfig {
	Community { version: SnmpVersion, community: String },
	Usm(UsmConfig),
}

impl SecurityConfig {
	pub fn community(community: impl Into<String>) -> Self {
		SecurityConfig::Community {
			version: SnmpVersion::V2c,
			community: community.into(),
		}
	}

	pub fn auth_no_priv(
		user: impl Into<String>,
		auth_protocol: AuthProtocol,
		auth_key: impl Into<String>,
	) -> Self {
		SecurityConfig::Usm(UsmConfig {
			user: user.into(),
			level: SecurityLevel::AuthNoPriv,
			auth_protocol,
			auth_key: auth_key.into(),
			privacy: None,
		})
	}

	pub fn auth_priv(
		user: impl Into<String>,
		auth_protocol: AuthProtocol,
		auth_key: impl Into<String>,
		priv_protocol: PrivProtocol,
		priv_key: impl Into<String>,
	) -> Self {
		SecurityConfig::Usm(UsmConfig {
			user: user.into(),
			level: SecurityLevel::AuthPriv,
			auth_protocol,
			auth_key: auth_key.into(),
			privacy: Some(Privacy {
				protocol: priv_protocol,
				key: priv_key.into(),
			}),
		})
	}

	pub fn version(&self) -> SnmpVersion {
		match self {
			SecurityConfig::Community { version, .. } => *version,
			SecurityConfig::Usm(_) => SnmpVersion::V3,
		}
	}

	/// Checks the invariants the type cannot express on its own.
	///
	/// # Errors
	///
	/// Returns [`Error::SecurityConfig`] describing the first violation.
	pub fn validate(&self) -> Result<()> {
		match self {
			SecurityConfig::Community { version, community } => {
				if *version != SnmpVersion::V2c {
					return Err(invalid(format!(
						"community security requires version 2c, not {version}"
					)));
				}
				if community.is_empty() {
					return Err(invalid("community must not be empty"));
				}
			}
			SecurityConfig::Usm(usm) => {
				if usm.user.is_empty() {
					return Err(invalid("user must not be empty"));
				}
				check_password("auth_key", &usm.auth_key)?;
				match (usm.level, &usm.privacy) {
					(SecurityLevel::AuthPriv, Some(privacy)) => {
						check_password("priv_key", &privacy.key)?;
					}
					(SecurityLevel::AuthPriv, None) => {
						return Err(invalid("level authPriv requires priv_protocol and priv_key"));
					}
					(SecurityLevel::AuthNoPriv, Some(_)) => {
						return Err(invalid("level authNoPriv does not take privacy settings"));
					}
					(SecurityLevel::AuthNoPriv, None) => {}
				}
			}
		}
		Ok(())
	}
}

impl SecurityConfig {
	/// Client credentials for the SNMP client. Keys are derived by the client
	/// when it is built, before any request is sent.
	pub(crate) fn client_auth(&self) -> Auth {
		match self {
			SecurityConfig::Community { community, .. } => Auth::v2c(community.as_str()),
			SecurityConfig::Usm(usm) => {
				let user = Auth::usm(usm.user.as_str())
					.auth(usm.auth_protocol.into(), usm.auth_key.as_str());
				match &usm.privacy {
					Some(privacy) => user
						.privacy(privacy.protocol.into(), privacy.key.as_str())
						.into(),
					None => user.into(),
				}
			}
		}
	}
}

impl fmt::Display for SecurityConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SecurityConfig::Community { version, .. } => write!(f, "v{version} community"),
			SecurityConfig::Usm(usm) => {
				write!(f, "v3 {} {} {}", usm.user, usm.level, usm.auth_protocol)?;
				if let Some(privacy) = &usm.privacy {
					write!(f, "/{}", privacy.protocol)?;
				}
				Ok(())
			}
		}
	}
}

fn invalid(reason: impl Into<String>) -> Error {
	Error::SecurityConfig(reason.into())
}

fn check_password(field: &str, value: &str) -> Result<()> {
	if value.len() < MIN_PASSWORD_LEN {
		return Err(invalid(format!(
			"{field} must be at least {MIN_PASSWORD_LEN} characters"
		)));
	}
	Ok(())
}

/// Flat security attributes as written in scenario files.
///
/// ```json
/// { "version": "3", "user": "rwAuthUser", "level": "authNoPriv",
///   "authProtocol": "MD5", "authKey": "rwAuthUser" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecurityParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<SnmpVersion>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub community: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub level: Option<SecurityLevel>,
	#[serde(default, alias = "auth_protocol", skip_serializing_if = "Option::is_none")]
	pub auth_protocol: Option<AuthProtocol>,
	#[serde(default, alias = "auth_key", skip_serializing_if = "Option::is_none")]
	pub auth_key: Option<String>,
	#[serde(default, alias = "priv_protocol", skip_serializing_if = "Option::is_none")]
	pub priv_protocol: Option<PrivProtocol>,
	#[serde(default, alias = "priv_key", skip_serializing_if = "Option::is_none")]
	pub priv_key: Option<String>,
}

impl SecurityParams {
	/// Validates presence rules and builds a [`SecurityConfig`].
	///
	/// # Errors
	///
	/// Returns [`Error::SecurityConfig`] when a required attribute is missing
	/// or an attribute is given that the version or level does not take.
	pub fn resolve(&self) -> Result<SecurityConfig> {
		let version = self.version.ok_or_else(|| invalid("version is required"))?;
		let config = match version {
			SnmpVersion::V2c => {
				self.reject_present(
					"version 2c",
					&[
						("user", self.user.is_some()),
						("level", self.level.is_some()),
						("auth_protocol", self.auth_protocol.is_some()),
						("auth_key", self.auth_key.is_some()),
						("priv_protocol", self.priv_protocol.is_some()),
						("priv_key", self.priv_key.is_some()),
					],
				)?;
				let community = self
					.community
					.clone()
					.ok_or_else(|| invalid("community is required for version 2c"))?;
				SecurityConfig::Community { version, community }
			}
			SnmpVersion::V3 => {
				self.reject_present("version 3", &[("community", self.community.is_some())])?;
				let user = self
					.user
					.clone()
					.ok_or_else(|| invalid("user is required for version 3"))?;
				let level = self
					.level
					.ok_or_else(|| invalid("level is required for version 3"))?;
				let auth_protocol = self
					.auth_protocol
					.ok_or_else(|| invalid(format!("auth_protocol is required for level {level}")))?;
				let auth_key = self
					.auth_key
					.clone()
					.ok_or_else(|| invalid(format!("auth_key is required for level {level}")))?;
				let privacy = match level {
					SecurityLevel::AuthNoPriv => {
						self.reject_present(
							"level authNoPriv",
							&[
								("priv_protocol", self.priv_protocol.is_some()),
								("priv_key", self.priv_key.is_some()),
							],
						)?;
						None
					}
					SecurityLevel::AuthPriv => {
						let protocol = self
							.priv_protocol
							.ok_or_else(|| invalid("priv_protocol is required for level authPriv"))?;
						let key = self
							.priv_key
							.clone()
							.ok_or_else(|| invalid("priv_key is required for level authPriv"))?;
						Some(Privacy { protocol, key })
					}
				};
				SecurityConfig::Usm(UsmConfig {
					user,
					level,
					auth_protocol,
					auth_key,
					privacy,
				})
			}
		};
		config.validate()?;
		Ok(config)
	}

	fn reject_present(&self, context: &str, fields: &[(&str, bool)]) -> Result<()> {
		match fields.iter().find(|(_, present)| *present) {
			Some((name, _)) => Err(invalid(format!("{name} is not allowed with {context}"))),
			None => Ok(()),
		}
	}
}

impl From<&SecurityConfig> for SecurityParams {
	fn from(config: &SecurityConfig) -> Self {
		match config {
			SecurityConfig::Community { version, community } => SecurityParams {
				version: Some(*version),
				community: Some(community.clone()),
				..Default::default()
			},
			SecurityConfig::Usm(usm) => SecurityParams {
				version: Some(SnmpVersion::V3),
				user: Some(usm.user.clone()),
				level: Some(usm.level),
				auth_protocol: Some(usm.auth_protocol),
				auth_key: Some(usm.auth_key.clone()),
				priv_protocol: usm.privacy.as_ref().map(|p| p.protocol),
				priv_key: usm.privacy.as_ref().map(|p| p.key.clone()),
				..Default::default()
			},
		}
	}
}
