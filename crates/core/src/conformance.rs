//! Protocol checks shared by every scenario.
//!
//! Each check opens nothing itself: it drives an already connected
//! [`Session`] and returns a [`CheckFailure`] naming the check and the
//! operation that went wrong.

use async_snmp::{Oid, Value};
use smith_runtime::Error;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::mib;
use crate::session::Session;

/// A failed conformance check.
#[derive(Debug, ThisError)]
pub enum CheckFailure {
	/// The session operation itself failed.
	#[error("{check}: {source}")]
	Operation {
		check: &'static str,
		#[source]
		source: Error,
	},
	/// The agent answered, but not as expected.
	#[error("{check}: {operation}: {detail}")]
	Unexpected {
		check: &'static str,
		operation: String,
		detail: String,
	},
}

impl CheckFailure {
	pub fn check(&self) -> &'static str {
		match self {
			CheckFailure::Operation { check, .. } | CheckFailure::Unexpected { check, .. } => *check,
		}
	}

	fn operation(check: &'static str) -> impl FnOnce(Error) -> Self {
		move |source| CheckFailure::Operation { check, source }
	}
}

impl From<Error> for CheckFailure {
	fn from(source: Error) -> Self {
		CheckFailure::Operation {
			check: "connect",
			source,
		}
	}
}

/// `sysDescr.0` exists and is a non-empty string.
pub async fn sys_descr_is_present(session: &mut Session) -> Result<(), CheckFailure> {
	const CHECK: &str = "sys_descr_is_present";
	let oid = mib::sys_descr();
	let value = session
		.get(&oid)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	match value.as_str() {
		Some(text) if !text.is_empty() => {
			debug!(target = "smith", check = CHECK, value = %mib::render(&value), "ok");
			Ok(())
		}
		_ => Err(CheckFailure::Unexpected {
			check: CHECK,
			operation: format!("get {oid}"),
			detail: format!("expected a non-empty string, got {}", mib::render(&value)),
		}),
	}
}

/// getnext on `system` returns `sysDescr.0`, and getnext on that moves past it.
pub async fn get_next_advances(session: &mut Session) -> Result<(), CheckFailure> {
	const CHECK: &str = "get_next_advances";
	let root = mib::system();
	let first = session
		.get_next(&root)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	if first.oid != mib::sys_descr() {
		return Err(CheckFailure::Unexpected {
			check: CHECK,
			operation: format!("getnext {root}"),
			detail: format!("expected {}, got {}", mib::sys_descr(), first.oid),
		});
	}
	let second = session
		.get_next(&first.oid)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	if second.oid <= first.oid {
		return Err(CheckFailure::Unexpected {
			check: CHECK,
			operation: format!("getnext {}", first.oid),
			detail: format!("returned {}, which does not follow it", second.oid),
		});
	}
	Ok(())
}

/// Writes `value` to `oid`, reads it back and restores the old value.
pub async fn set_then_get_on(session: &mut Session, oid: &Oid, value: Value) -> Result<(), CheckFailure> {
	const CHECK: &str = "set_then_get";
	let original = session
		.get(oid)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	session
		.set(oid, value.clone())
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	let read_back = session
		.get(oid)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	if read_back != value {
		return Err(CheckFailure::Unexpected {
			check: CHECK,
			operation: format!("get {oid}"),
			detail: format!(
				"wrote {}, read back {}",
				mib::render(&value),
				mib::render(&read_back)
			),
		});
	}
	if !mib::is_exception(&original) {
		session
			.set(oid, original)
			.await
			.map_err(CheckFailure::operation(CHECK))?;
	}
	Ok(())
}

/// [`set_then_get_on`] against `sysContact.0`.
pub async fn set_then_get(session: &mut Session) -> Result<(), CheckFailure> {
	set_then_get_on(
		session,
		&mib::sys_contact(),
		Value::OctetString("smith-harness@localhost".into()),
	)
	.await
}

/// Walks `system`: at least one object, every OID inside the subtree and
/// strictly increasing.
pub async fn walk_system_group(session: &mut Session) -> Result<(), CheckFailure> {
	const CHECK: &str = "walk_system_group";
	let root = mib::system();
	let bindings = session
		.walk(&root)
		.await
		.map_err(CheckFailure::operation(CHECK))?;
	let unexpected = |detail: String| CheckFailure::Unexpected {
		check: CHECK,
		operation: format!("walk {root}"),
		detail,
	};
	if bindings.is_empty() {
		return Err(unexpected("no objects returned".to_string()));
	}
	for pair in bindings.windows(2) {
		if pair[1].oid <= pair[0].oid {
			return Err(unexpected(format!("{} follows {}", pair[1].oid, pair[0].oid)));
		}
	}
	if let Some(stray) = bindings.iter().find(|vb| !vb.oid.starts_with(&root)) {
		return Err(unexpected(format!("{} is outside the subtree", stray.oid)));
	}
	debug!(target = "smith", check = CHECK, count = bindings.len(), "ok");
	Ok(())
}

/// Names of the shared checks, in the order [`run_all`] runs them.
pub const CHECKS: [&str; 4] = [
	"sys_descr_is_present",
	"get_next_advances",
	"set_then_get",
	"walk_system_group",
];

/// Runs every check on `session`, stopping at the first failure.
pub async fn run_all(session: &mut Session) -> Result<(), CheckFailure> {
	sys_descr_is_present(session).await?;
	get_next_advances(session).await?;
	set_then_get(session).await?;
	walk_system_group(session).await?;
	debug!(target = "smith", checks = CHECKS.len(), "all checks passed");
	Ok(())
}
