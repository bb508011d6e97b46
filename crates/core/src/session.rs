//! SNMP client sessions.
//!
//! A [`Session`] speaks to one agent endpoint with one security
//! configuration. Requests are strictly sequential: each operation sends one
//! request through the [`async_snmp`] client and waits for its answer. The
//! client never retries on its own; the only retry is the single
//! time-window resynchronization described on [`Session`].
//!
//! For USM users the session starts `Unauthenticated`, confirms during
//! [`Session::connect`] that the agent answers engine discovery, and only
//! then becomes `Ready`. Key derivation and localization happen inside the
//! client against the discovered engine id.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_snmp::{Client, EngineCache, Oid, Retry, Value, VarBind};
use smith_runtime::{Endpoint, Error, ErrorStatus, Result, discovery_answered};
use tracing::{debug, warn};

use crate::mib;
use crate::security::SecurityConfig;

/// Per-session tuning.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// How long one request may wait for its response.
	pub timeout: Duration,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(5),
		}
	}
}

impl SessionOptions {
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Unauthenticated,
	Ready,
	Closed,
}

/// A client session against one SNMP agent.
///
/// A `usmStatsNotInTimeWindows` rejection drops the cached engine state so
/// the client rediscovers boots and time, then resends once. That happens at
/// most once per session; a second rejection is an
/// [`Error::Authentication`].
pub struct Session {
	endpoint: Endpoint,
	peer: SocketAddr,
	security: SecurityConfig,
	options: SessionOptions,
	engines: Arc<EngineCache>,
	client: Option<Client>,
	state: SessionState,
	resynced: bool,
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("endpoint", &self.endpoint)
			.field("peer", &self.peer)
			.field("security", &self.security)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

/// How a client error is reported.
#[derive(Debug)]
enum Failure {
	Timeout,
	Status { status: ErrorStatus, index: i64 },
	NotInTimeWindow,
	Rejected(String),
	Other(String),
}

/// USM outcomes the client reports as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsmRejection {
	NotInTimeWindow,
	Rejected,
}

const REJECTION_MARKERS: [&str; 9] = [
	"auth",
	"hmac",
	"digest",
	"unknownuser",
	"unknownengine",
	"seclevel",
	"securitylevel",
	"decrypt",
	"usmstats",
];

/// Recognizes USM rejections by the client error's debug rendering, which
/// names the report counter or the failed check.
fn usm_rejection(rendered: &str) -> Option<UsmRejection> {
	let normalized: String = rendered
		.chars()
		.filter(|c| c.is_ascii_alphanumeric())
		.map(|c| c.to_ascii_lowercase())
		.collect();
	if normalized.contains("timewindow") {
		return Some(UsmRejection::NotInTimeWindow);
	}
	REJECTION_MARKERS
		.iter()
		.any(|marker| normalized.contains(marker))
		.then_some(UsmRejection::Rejected)
}

fn classify(err: async_snmp::Error) -> Failure {
	match err {
		async_snmp::Error::Timeout { .. } => Failure::Timeout,
		async_snmp::Error::Snmp { status, index, .. } => Failure::Status {
			status,
			index: index as i64,
		},
		other => {
			let detail = other.to_string();
			match usm_rejection(&format!("{other:?}")) {
				Some(UsmRejection::NotInTimeWindow) => Failure::NotInTimeWindow,
				Some(UsmRejection::Rejected) => Failure::Rejected(detail),
				None => Failure::Other(detail),
			}
		}
	}
}

fn failure_error(options: &SessionOptions, operation: &str, failure: Failure) -> Error {
	let operation = operation.to_string();
	match failure {
		Failure::Timeout => Error::Timeout {
			operation,
			duration_ms: options.timeout.as_millis() as u64,
		},
		Failure::Status { status, index } => Error::Protocol {
			operation,
			status,
			index,
		},
		Failure::NotInTimeWindow => Error::Authentication {
			operation,
			reason: "not in time window after resynchronization".to_string(),
		},
		Failure::Rejected(reason) => Error::Authentication { operation, reason },
		Failure::Other(detail) => Error::Transport(format!("{operation}: {detail}")),
	}
}

/// True when `failure` may be answered by rediscovering the engine clock,
/// which a session does at most once.
fn take_resync(resynced: &mut bool, failure: &Failure) -> bool {
	if !matches!(failure, Failure::NotInTimeWindow) || *resynced {
		return false;
	}
	*resynced = true;
	true
}

impl Session {
	/// Opens a session. Security is validated before any socket is bound;
	/// USM sessions also wait for an engine-discovery answer here.
	///
	/// # Errors
	///
	/// [`Error::SecurityConfig`] for invalid security, [`Error::Timeout`] if
	/// discovery is not answered, [`Error::Transport`] for socket failures.
	pub async fn connect(
		endpoint: Endpoint,
		security: SecurityConfig,
		options: SessionOptions,
	) -> Result<Self> {
		security.validate()?;
		let peer = endpoint.resolve().await?;

		let mut session = Self {
			endpoint,
			peer,
			security,
			options,
			engines: Arc::new(EngineCache::new()),
			client: None,
			state: SessionState::Unauthenticated,
			resynced: false,
		};

		if matches!(session.security, SecurityConfig::Usm(_))
			&& !discovery_answered(&session.endpoint, session.options.timeout).await?
		{
			return Err(session.timeout_error("engine discovery"));
		}

		let client = Client::builder(peer.to_string(), session.security.client_auth())
			.timeout(session.options.timeout)
			.retry(Retry::none())
			.engine_cache(Arc::clone(&session.engines))
			.connect()
			.await
			.map_err(|err| session.error("connect", classify(*err)))?;
		session.client = Some(client);
		session.state = SessionState::Ready;
		debug!(
			target = "smith.session",
			endpoint = %session.endpoint,
			security = %session.security,
			"session ready"
		);
		Ok(session)
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	pub fn security(&self) -> &SecurityConfig {
		&self.security
	}

	/// Authoritative engine id, once the client has discovered it (USM only).
	pub fn engine_id(&self) -> Option<Vec<u8>> {
		self.engines
			.get(&self.peer)
			.map(|engine| engine.engine_id.to_vec())
	}

	/// Reads one object. Missing objects come back as exception values.
	pub async fn get(&mut self, oid: &Oid) -> Result<Value> {
		let operation = format!("get {oid}");
		loop {
			let result = self.client()?.get(oid).await;
			match result {
				Ok(vb) => return Ok(vb.value),
				Err(err) => self.recover(&operation, *err)?,
			}
		}
	}

	/// Returns the first object after `oid` in MIB order.
	pub async fn get_next(&mut self, oid: &Oid) -> Result<VarBind> {
		let operation = format!("getnext {oid}");
		loop {
			let result = self.client()?.get_next(oid).await;
			match result {
				Ok(vb) => return Ok(vb),
				Err(err) => self.recover(&operation, *err)?,
			}
		}
	}

	/// Writes one object and returns the value echoed by the agent.
	pub async fn set(&mut self, oid: &Oid, value: Value) -> Result<Value> {
		let operation = format!("set {oid}");
		loop {
			let result = self.client()?.set(oid, value.clone()).await;
			match result {
				Ok(vb) => return Ok(vb.value),
				Err(err) => self.recover(&operation, *err)?,
			}
		}
	}

	pub async fn get_bulk(
		&mut self,
		oids: &[Oid],
		non_repeaters: u32,
		max_repetitions: u32,
	) -> Result<Vec<VarBind>> {
		let operation = match oids {
			[single] => format!("getbulk {single}"),
			_ => format!("getbulk ({} oids)", oids.len()),
		};
		let out_of_range = |field: &str| Error::Transport(format!("{operation}: {field} out of range"));
		let non_repeaters = non_repeaters
			.try_into()
			.map_err(|_| out_of_range("non_repeaters"))?;
		let max_repetitions = max_repetitions
			.try_into()
			.map_err(|_| out_of_range("max_repetitions"))?;
		loop {
			let result = self
				.client()?
				.get_bulk(oids, non_repeaters, max_repetitions)
				.await;
			match result {
				Ok(bindings) => return Ok(bindings),
				Err(err) => self.recover(&operation, *err)?,
			}
		}
	}

	/// Collects every object under `root` with successive getnext requests.
	///
	/// Stops at the first OID outside the subtree or at `endOfMibView`.
	pub async fn walk(&mut self, root: &Oid) -> Result<Vec<VarBind>> {
		let mut results: Vec<VarBind> = Vec::new();
		let mut cursor = root.clone();
		loop {
			let vb = self.get_next(&cursor).await?;
			if mib::is_exception(&vb.value) || !vb.oid.starts_with(root) {
				break;
			}
			if vb.oid <= cursor {
				return Err(Error::Transport(format!(
					"walk {root}: agent returned non-increasing OID {} after {cursor}",
					vb.oid
				)));
			}
			cursor = vb.oid.clone();
			results.push(vb);
		}
		debug!(
			target = "smith.session",
			root = %root,
			count = results.len(),
			"walk complete"
		);
		Ok(results)
	}

	/// Closes the session. Further operations fail with
	/// [`Error::SessionClosed`]. Calling it again is a no-op.
	pub fn close(&mut self) {
		if self.state == SessionState::Closed {
			return;
		}
		self.client = None;
		self.state = SessionState::Closed;
		debug!(target = "smith.session", endpoint = %self.endpoint, "session closed");
	}

	fn client(&self) -> Result<&Client> {
		match (&self.state, &self.client) {
			(SessionState::Ready, Some(client)) => Ok(client),
			_ => Err(Error::SessionClosed),
		}
	}

	fn timeout_error(&self, operation: &str) -> Error {
		failure_error(&self.options, operation, Failure::Timeout)
	}

	fn error(&self, operation: &str, failure: Failure) -> Error {
		failure_error(&self.options, operation, failure)
	}

	/// Decides whether a failed exchange may be resent. Returns `Ok` only for
	/// the first time-window rejection of the session.
	fn recover(&mut self, operation: &str, err: async_snmp::Error) -> Result<()> {
		let failure = classify(err);
		if !take_resync(&mut self.resynced, &failure) {
			return Err(self.error(operation, failure));
		}
		let stale = self.engines.remove(&self.peer);
		warn!(
			target = "smith.session",
			operation,
			engine_id = %stale.as_ref().map(|e| hex::encode(&e.engine_id)).unwrap_or_default(),
			boots = stale.as_ref().map(|e| e.engine_boots).unwrap_or_default(),
			"not in time window; rediscovering engine clock"
		);
		Ok(())
	}
}
