//! Error types for the SmithSNMP harness.

pub use async_snmp::ErrorStatus;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while supervising daemons or talking SNMP to them.
///
/// Every lifecycle variant names the daemon involved and every protocol
/// variant names the operation, so a failing test says what broke.
#[derive(Debug, Error)]
pub enum Error {
	/// The daemon could not be started: missing executable or config file,
	/// spawn failure, or exit during the launch window.
	#[error("failed to launch {process}: {reason}")]
	Launch { process: String, reason: String },

	/// Scenario setup failed. Processes already started have been torn down.
	#[error("{process} daemon start error: {cause}")]
	Setup {
		process: String,
		#[source]
		cause: Box<Error>,
	},

	/// A daemon that should be running has exited.
	#[error("{process} daemon is not running{}", format_output(.output))]
	DaemonDown { process: String, output: String },

	/// Security parameters are incomplete or inconsistent.
	#[error("invalid security configuration: {0}")]
	SecurityConfig(String),

	/// No answer within the allotted time.
	#[error("timeout after {duration_ms}ms waiting for {operation}")]
	Timeout { operation: String, duration_ms: u64 },

	/// The agent answered with a non-zero error status.
	#[error("{operation} failed: {status:?} (index {index})")]
	Protocol {
		operation: String,
		status: ErrorStatus,
		index: i64,
	},

	/// Digest mismatch, decryption failure, or a USM error report.
	#[error("authentication failed during {operation}: {reason}")]
	Authentication { operation: String, reason: String },

	/// Operation attempted on a closed session.
	#[error("session is closed")]
	SessionClosed,

	/// Socket-level failure, or an answer the client could not accept.
	#[error("transport error: {0}")]
	Transport(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

fn format_output(output: &str) -> String {
	let trimmed = output.trim_end();
	if trimmed.is_empty() {
		String::new()
	} else {
		format!("; captured output:\n{trimmed}")
	}
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout { .. } => true,
			Error::Setup { cause, .. } => cause.is_timeout(),
			_ => false,
		}
	}

	/// Returns true if the agent rejected our credentials.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Error::Authentication { .. })
	}

	/// Returns the daemon this error is attributed to, if any.
	pub fn process_name(&self) -> Option<&str> {
		match self {
			Error::Launch { process, .. }
			| Error::Setup { process, .. }
			| Error::DaemonDown { process, .. } => Some(process),
			_ => None,
		}
	}

	/// Returns the SNMP operation this error is attributed to, if any.
	pub fn operation(&self) -> Option<&str> {
		match self {
			Error::Timeout { operation, .. }
			| Error::Protocol { operation, .. }
			| Error::Authentication { operation, .. } => Some(operation),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn setup_error_names_the_daemon() {
		let err = Error::Setup {
			process: "netsnmp".into(),
			cause: Box::new(Error::Timeout {
				operation: "readiness of netsnmp".into(),
				duration_ms: 5000,
			}),
		};
		assert_eq!(err.process_name(), Some("netsnmp"));
		assert!(err.is_timeout());
		assert!(err.to_string().starts_with("netsnmp daemon start error"));
	}

	#[test]
	fn daemon_down_includes_output_only_when_present() {
		let quiet = Error::DaemonDown {
			process: "agentx".into(),
			output: "  \n".into(),
		};
		assert_eq!(quiet.to_string(), "agentx daemon is not running");

		let noisy = Error::DaemonDown {
			process: "agentx".into(),
			output: "segfault\n".into(),
		};
		assert_eq!(
			noisy.to_string(),
			"agentx daemon is not running; captured output:\nsegfault"
		);
	}

	#[test]
	fn protocol_errors_carry_the_operation() {
		let err = Error::Protocol {
			operation: "set 1.3.6.1.2.1.1.1.0".into(),
			status: ErrorStatus::NotWritable,
			index: 1,
		};
		assert_eq!(err.operation(), Some("set 1.3.6.1.2.1.1.1.0"));
		assert_eq!(
			err.to_string(),
			"set 1.3.6.1.2.1.1.1.0 failed: NotWritable (index 1)"
		);
	}
}
