//! Ordered startup and teardown of cooperating daemons.
//!
//! A [`SupervisorSession`] owns every [`DaemonProcess`] of one scenario. It
//! starts them strictly in order (a master agent before its AgentX
//! sub-agent), waits for each to become ready before starting the next, and
//! stops them in reverse order. Dropping a session kills whatever is still
//! running.

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::process::{DaemonProcess, ProcessState};
use crate::spec::ProcessSpec;

/// Timing knobs for a supervisor session.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
	/// Upper bound on each process's readiness wait.
	pub ready_timeout: Duration,
	/// SIGTERM grace period before a force kill.
	pub stop_grace: Duration,
	/// Endpoint queried by SNMP readiness checks that do not name their own.
	pub endpoint: Endpoint,
}

impl Default for SupervisorOptions {
	fn default() -> Self {
		Self {
			ready_timeout: Duration::from_secs(10),
			stop_grace: Duration::from_secs(3),
			endpoint: Endpoint::default(),
		}
	}
}

/// Lifecycle of a [`SupervisorSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
	Idle,
	Starting,
	Ready,
	TearingDown,
	Stopped,
}

/// One process that could not be stopped cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
	pub process: String,
	pub error: String,
}

/// Outcome of [`SupervisorSession::teardown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
	/// Processes that were running and have been stopped, in stop order.
	pub stopped: Vec<String>,
	pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

impl fmt::Display for TeardownReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_clean() {
			return write!(f, "stopped [{}]", self.stopped.join(", "));
		}
		let failures: Vec<String> = self
			.failures
			.iter()
			.map(|fail| format!("{}: {}", fail.process, fail.error))
			.collect();
		write!(
			f,
			"stopped [{}], failed [{}]",
			self.stopped.join(", "),
			failures.join("; ")
		)
	}
}

/// The running daemons of one scenario.
#[derive(Debug)]
pub struct SupervisorSession {
	processes: Vec<DaemonProcess>,
	state: SupervisorState,
	options: SupervisorOptions,
}

impl SupervisorSession {
	/// Creates an idle session; nothing is launched until [`start`](Self::start).
	pub fn new(specs: Vec<ProcessSpec>, options: SupervisorOptions) -> Self {
		Self {
			processes: specs.into_iter().map(DaemonProcess::new).collect(),
			state: SupervisorState::Idle,
			options,
		}
	}

	/// Starts every process in order and returns a ready session.
	///
	/// # Errors
	///
	/// Returns [`Error::Setup`] naming the first process that failed to
	/// launch or become ready. Processes already started are torn down first.
	pub async fn setup(specs: Vec<ProcessSpec>, options: SupervisorOptions) -> Result<Self> {
		let mut session = Self::new(specs, options);
		session.start().await?;
		Ok(session)
	}

	pub async fn start(&mut self) -> Result<()> {
		if self.state != SupervisorState::Idle {
			return Ok(());
		}
		self.state = SupervisorState::Starting;

		for index in 0..self.processes.len() {
			if let Err(cause) = self.start_one(index).await {
				let process = self.processes[index].name().to_string();
				error!(
					target = "smith.supervisor",
					process = %process,
					error = %cause,
					"daemon start error"
				);
				let report = self.teardown().await;
				if !report.is_clean() {
					warn!(target = "smith.supervisor", %report, "cleanup after failed setup was not clean");
				}
				return Err(Error::Setup {
					process,
					cause: Box::new(cause),
				});
			}
		}

		self.state = SupervisorState::Ready;
		info!(
			target = "smith.supervisor",
			processes = ?self.names(),
			"all daemons ready"
		);
		Ok(())
	}

	async fn start_one(&mut self, index: usize) -> Result<()> {
		let timeout = self.options.ready_timeout;
		let endpoint = self.options.endpoint.clone();
		let process = &mut self.processes[index];
		process.start().await?;
		let readiness = process.spec().readiness.clone();
		readiness.wait(process, &endpoint, timeout).await
	}

	/// Fails for the first dead process in startup order, with its output.
	pub async fn verify_all_alive(&mut self) -> Result<()> {
		for process in &mut self.processes {
			if !process.is_alive() {
				let output = process.drain_output().await;
				error!(
					target = "smith.supervisor",
					process = %process.name(),
					state = ?process.state(),
					"daemon is down"
				);
				return Err(Error::DaemonDown {
					process: process.name().to_string(),
					output,
				});
			}
		}
		Ok(())
	}

	/// Stops every process in reverse start order.
	///
	/// Dead processes are tolerated and every handle is attempted even when
	/// one fails. A second call returns an empty report.
	pub async fn teardown(&mut self) -> TeardownReport {
		let mut report = TeardownReport::default();
		if self.state == SupervisorState::Stopped {
			return report;
		}
		self.state = SupervisorState::TearingDown;

		let grace = self.options.stop_grace;
		for process in self.processes.iter_mut().rev() {
			let was_running = process.state() == ProcessState::Running;
			match process.stop(grace).await {
				Ok(()) if was_running => report.stopped.push(process.name().to_string()),
				Ok(()) => {}
				Err(err) => {
					warn!(
						target = "smith.supervisor",
						process = %process.name(),
						error = %err,
						"daemon did not stop cleanly"
					);
					report.failures.push(TeardownFailure {
						process: process.name().to_string(),
						error: err.to_string(),
					});
				}
			}
		}

		self.state = SupervisorState::Stopped;
		debug!(target = "smith.supervisor", %report, "teardown complete");
		report
	}

	pub fn state(&self) -> SupervisorState {
		self.state
	}

	pub fn processes(&self) -> &[DaemonProcess] {
		&self.processes
	}

	pub fn process(&self, name: &str) -> Option<&DaemonProcess> {
		self.processes.iter().find(|p| p.name() == name)
	}

	pub fn process_mut(&mut self, name: &str) -> Option<&mut DaemonProcess> {
		self.processes.iter_mut().find(|p| p.name() == name)
	}

	pub fn names(&self) -> Vec<&str> {
		self.processes.iter().map(DaemonProcess::name).collect()
	}
}

impl Drop for SupervisorSession {
	fn drop(&mut self) {
		for process in self.processes.iter_mut().rev() {
			if process.state() == ProcessState::Running {
				warn!(
					target = "smith.supervisor",
					process = %process.name(),
					"session dropped without teardown; killing daemon"
				);
				process.start_kill();
			}
		}
	}
}
