//! In-process SNMP agent for integration tests.
//!
//! An `async_snmp` agent serving a small in-memory system group to the
//! `private` community and three USM users. [`SilentAgent`] binds a socket
//! and never answers.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_snmp::handler::{BoxFuture, GetNextResult, GetResult, MibHandler, RequestContext, SetResult};
use async_snmp::{Agent, Oid, Value, VarBind, oid};
use parking_lot::Mutex;
use smith::{AuthProtocol, Endpoint, PrivProtocol, mib};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const SYS_DESCR: &str = "SmithSNMP test agent";
pub const COMMUNITY: &str = "private";

/// Installs a test-writer subscriber once; `RUST_LOG` selects verbosity.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// A USM user known to the agent.
#[derive(Debug, Clone)]
pub struct AgentUser {
	pub name: String,
	pub auth: AuthProtocol,
	pub auth_password: String,
	pub privacy: Option<(PrivProtocol, String)>,
}

impl AgentUser {
	pub fn auth_only(name: &str, auth: AuthProtocol, password: &str) -> Self {
		Self {
			name: name.to_string(),
			auth,
			auth_password: password.to_string(),
			privacy: None,
		}
	}

	pub fn auth_priv(name: &str, auth: AuthProtocol, password: &str, priv_password: &str) -> Self {
		Self {
			privacy: Some((PrivProtocol::Aes128, priv_password.to_string())),
			..Self::auth_only(name, auth, password)
		}
	}
}

pub fn default_users() -> Vec<AgentUser> {
	vec![
		AgentUser::auth_only("rwAuthUser", AuthProtocol::Md5, "rwAuthUser"),
		AgentUser::auth_priv("rwAuthPrivUser", AuthProtocol::Md5, "rwAuthPrivUser", "rwAuthPrivUser"),
		AgentUser::auth_only("shaUser", AuthProtocol::Sha1, "shaUserPassword"),
	]
}

/// Seed contents: the system group plus `ifNumber.0`.
pub fn system_group() -> BTreeMap<Oid, Value> {
	BTreeMap::from([
		(mib::sys_descr(), Value::OctetString(SYS_DESCR.into())),
		(mib::sys_object_id(), Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 8072, 3, 2, 10))),
		(mib::sys_up_time(), Value::TimeTicks(4242)),
		(mib::sys_contact(), Value::OctetString("admin@localhost".into())),
		(mib::sys_name(), Value::OctetString("smith-test".into())),
		(mib::sys_location(), Value::OctetString("lab".into())),
		(mib::if_number(), Value::Integer(2)),
	])
}

/// In-memory MIB behind the agent.
///
/// Objects outside `writable` reject sets with `notWritable`; unknown
/// objects reject them with `noCreation`.
pub struct SystemHandler {
	objects: Mutex<BTreeMap<Oid, Value>>,
	writable: BTreeSet<Oid>,
	requests: AtomicUsize,
}

impl SystemHandler {
	pub fn new(objects: BTreeMap<Oid, Value>) -> Self {
		Self {
			objects: Mutex::new(objects),
			writable: BTreeSet::from([mib::sys_contact(), mib::sys_name(), mib::sys_location()]),
			requests: AtomicUsize::new(0),
		}
	}

	pub fn value(&self, oid: &Oid) -> Option<Value> {
		self.objects.lock().get(oid).cloned()
	}

	pub fn requests(&self) -> usize {
		self.requests.load(Ordering::SeqCst)
	}

	fn count(&self) {
		self.requests.fetch_add(1, Ordering::SeqCst);
	}

	fn check_set(&self, oid: &Oid, value: &Value) -> SetResult {
		let objects = self.objects.lock();
		let Some(current) = objects.get(oid) else {
			return SetResult::NoCreation;
		};
		if !self.writable.contains(oid) {
			return SetResult::NotWritable;
		}
		if std::mem::discriminant(current) != std::mem::discriminant(value) {
			return SetResult::WrongType;
		}
		SetResult::Ok
	}
}

impl MibHandler for SystemHandler {
	fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
		Box::pin(async move {
			self.count();
			self.value(oid).map(GetResult::Value).unwrap_or(GetResult::NoSuchObject)
		})
	}

	fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
		Box::pin(async move {
			self.count();
			self.objects
				.lock()
				.range((Bound::Excluded(oid.clone()), Bound::Unbounded))
				.next()
				.map(|(next, value)| GetNextResult::Value(VarBind::new(next.clone(), value.clone())))
				.unwrap_or(GetNextResult::EndOfMibView)
		})
	}

	fn test_set<'a>(
		&'a self,
		_ctx: &'a RequestContext,
		oid: &'a Oid,
		value: &'a Value,
	) -> BoxFuture<'a, SetResult> {
		Box::pin(async move {
			self.count();
			self.check_set(oid, value)
		})
	}

	fn commit_set<'a>(
		&'a self,
		_ctx: &'a RequestContext,
		oid: &'a Oid,
		value: &'a Value,
	) -> BoxFuture<'a, SetResult> {
		Box::pin(async move {
			self.objects.lock().insert(oid.clone(), value.clone());
			SetResult::Ok
		})
	}
}

/// A running agent. Dropping it stops the listener.
pub struct FakeAgent {
	addr: SocketAddr,
	handler: Arc<SystemHandler>,
	task: JoinHandle<()>,
}

impl FakeAgent {
	pub async fn start() -> Self {
		Self::with_users(default_users()).await
	}

	pub async fn with_users(users: Vec<AgentUser>) -> Self {
		let handler = Arc::new(SystemHandler::new(system_group()));
		let mut builder = Agent::builder()
			.bind("127.0.0.1:0")
			.community(COMMUNITY.as_bytes())
			.handler(oid!(1, 3, 6), handler.clone());
		for user in users {
			let auth: async_snmp::AuthProtocol = user.auth.into();
			builder = builder.usm_user(user.name.as_bytes().to_vec(), |u| {
				let u = u.auth(auth, user.auth_password.as_bytes());
				match &user.privacy {
					Some((protocol, password)) => {
						let protocol: async_snmp::PrivProtocol = (*protocol).into();
						u.privacy(protocol, password.as_bytes())
					}
					None => u,
				}
			});
		}
		let agent = builder.build().await.expect("failed to build test agent");
		let addr = agent.local_addr();
		let task = tokio::spawn(async move {
			let _ = agent.run().await;
		});
		Self { addr, handler, task }
	}

	pub fn endpoint(&self) -> Endpoint {
		Endpoint::localhost(self.addr.port())
	}

	pub fn value(&self, oid: &Oid) -> Option<Value> {
		self.handler.value(oid)
	}

	/// Requests that reached the MIB handler.
	pub fn requests(&self) -> usize {
		self.handler.requests()
	}
}

impl Drop for FakeAgent {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// A bound UDP port nobody answers on.
pub struct SilentAgent {
	socket: UdpSocket,
}

impl SilentAgent {
	pub async fn start() -> Self {
		Self {
			socket: UdpSocket::bind("127.0.0.1:0").await.expect("bind silent agent"),
		}
	}

	pub fn endpoint(&self) -> Endpoint {
		Endpoint::localhost(self.socket.local_addr().expect("silent agent address").port())
	}
}
