//! Managed daemon processes.
//!
//! A [`DaemonProcess`] wraps one externally launched daemon: start, liveness
//! check, captured output and termination. It knows nothing about SNMP.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::spec::ProcessSpec;

/// How long a daemon must survive after spawn to count as launched.
pub const LAUNCH_WINDOW: Duration = Duration::from_millis(100);

/// Upper bound on waiting for output readers once a daemon has exited.
const OUTPUT_SETTLE: Duration = Duration::from_millis(250);

/// Captured output keeps only this many trailing bytes.
const OUTPUT_LIMIT: usize = 64 * 1024;

/// Lifecycle state of a [`DaemonProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
	NotStarted,
	Running,
	/// Exited on its own or after SIGTERM. `None` when terminated by a signal.
	Exited(Option<i32>),
	/// Force-killed after the stop grace period.
	Killed,
}

/// Bounded tail of a daemon's combined stdout and stderr.
#[derive(Debug, Clone, Default)]
struct OutputTail {
	inner: Arc<Mutex<Vec<u8>>>,
}

impl OutputTail {
	fn push(&self, chunk: &[u8]) {
		let mut buf = self.inner.lock();
		buf.extend_from_slice(chunk);
		if buf.len() > OUTPUT_LIMIT {
			let excess = buf.len() - OUTPUT_LIMIT;
			buf.drain(..excess);
		}
	}

	fn snapshot(&self) -> String {
		String::from_utf8_lossy(&self.inner.lock()).into_owned()
	}
}

/// One supervised daemon. Only this handle terminates its child.
#[derive(Debug)]
pub struct DaemonProcess {
	spec: ProcessSpec,
	child: Option<Child>,
	pid: Option<u32>,
	state: ProcessState,
	output: OutputTail,
	readers: Vec<JoinHandle<()>>,
}

impl DaemonProcess {
	/// Creates a handle in the `NotStarted` state.
	pub fn new(spec: ProcessSpec) -> Self {
		Self {
			spec,
			child: None,
			pid: None,
			state: ProcessState::NotStarted,
			output: OutputTail::default(),
			readers: Vec::new(),
		}
	}

	/// Creates a handle and starts it.
	pub async fn launch(spec: ProcessSpec) -> Result<Self> {
		let mut process = Self::new(spec);
		process.start().await?;
		Ok(process)
	}

	pub fn name(&self) -> &str {
		&self.spec.name
	}

	pub fn spec(&self) -> &ProcessSpec {
		&self.spec
	}

	pub fn state(&self) -> ProcessState {
		self.state
	}

	pub fn pid(&self) -> Option<u32> {
		self.pid
	}

	/// Launches the daemon with stdout and stderr captured.
	///
	/// # Errors
	///
	/// Returns [`Error::Launch`] if the executable or config file is missing,
	/// the spawn fails, or the process exits within [`LAUNCH_WINDOW`].
	pub async fn start(&mut self) -> Result<()> {
		if self.state != ProcessState::NotStarted {
			return Err(self.launch_error(format!("already started ({:?})", self.state)));
		}

		let program = self.resolve_program()?;
		if let Some(config) = &self.spec.config {
			if !config.exists() {
				return Err(self.launch_error(format!(
					"config file not found: {}",
					config.display()
				)));
			}
		}

		let args = self.spec.command_args();
		debug!(
			target = "smith.process",
			process = %self.spec.name,
			program = %program.display(),
			?args,
			"spawning daemon"
		);

		let mut child = Command::new(&program)
			.args(&args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| self.launch_error(format!("failed to spawn {}: {e}", program.display())))?;

		if let Some(stdout) = child.stdout.take() {
			self.readers.push(spawn_reader(stdout, self.output.clone()));
		}
		if let Some(stderr) = child.stderr.take() {
			self.readers.push(spawn_reader(stderr, self.output.clone()));
		}
		self.pid = child.id();
		self.child = Some(child);
		self.state = ProcessState::Running;

		tokio::time::sleep(LAUNCH_WINDOW).await;

		if !self.is_alive() {
			let output = self.drain_output().await;
			let mut reason = format!("exited during launch with {}", self.describe_exit());
			if !output.trim().is_empty() {
				reason.push_str(&format!("; captured output:\n{}", output.trim_end()));
			}
			return Err(self.launch_error(reason));
		}

		info!(
			target = "smith.process",
			process = %self.spec.name,
			pid = self.pid.unwrap_or_default(),
			"daemon started"
		);
		Ok(())
	}

	/// Non-blocking liveness check. Records `Exited` the first time an exit is
	/// observed.
	pub fn is_alive(&mut self) -> bool {
		if self.state != ProcessState::Running {
			return false;
		}
		let Some(child) = self.child.as_mut() else {
			return false;
		};
		match child.try_wait() {
			Ok(None) => true,
			Ok(Some(status)) => {
				self.state = ProcessState::Exited(status.code());
				warn!(
					target = "smith.process",
					process = %self.spec.name,
					pid = self.pid.unwrap_or_default(),
					%status,
					"daemon exited"
				);
				false
			}
			Err(err) => {
				warn!(
					target = "smith.process",
					process = %self.spec.name,
					error = %err,
					"cannot query daemon status; treating as exited"
				);
				self.state = ProcessState::Exited(None);
				false
			}
		}
	}

	/// Returns the output captured so far. Once the daemon has exited this
	/// waits briefly for the readers to flush the remaining pipe contents.
	pub async fn drain_output(&mut self) -> String {
		if self.state != ProcessState::Running {
			for reader in self.readers.drain(..) {
				let _ = tokio::time::timeout(OUTPUT_SETTLE, reader).await;
			}
		}
		self.output.snapshot()
	}

	/// Stops the daemon: SIGTERM, wait up to `grace`, then force kill.
	///
	/// Stopping a handle that is not running is a no-op.
	pub async fn stop(&mut self, grace: Duration) -> Result<()> {
		if self.state != ProcessState::Running {
			return Ok(());
		}
		let Some(child) = self.child.as_mut() else {
			return Ok(());
		};

		#[cfg(unix)]
		{
			if let Some(pid) = self.pid {
				terminate(pid);
			}
		}
		#[cfg(not(unix))]
		let grace = Duration::ZERO;

		match tokio::time::timeout(grace, child.wait()).await {
			Ok(Ok(status)) => {
				self.state = ProcessState::Exited(status.code());
				debug!(
					target = "smith.process",
					process = %self.spec.name,
					%status,
					"daemon stopped"
				);
				Ok(())
			}
			Ok(Err(err)) => {
				self.state = ProcessState::Exited(None);
				Err(Error::Io(err))
			}
			Err(_) => {
				warn!(
					target = "smith.process",
					process = %self.spec.name,
					grace_ms = grace.as_millis() as u64,
					"daemon ignored SIGTERM; killing"
				);
				let result = child.kill().await;
				self.state = ProcessState::Killed;
				result.map_err(Error::Io)
			}
		}
	}

	/// Sends a kill without waiting. Used when an async stop is impossible.
	pub fn start_kill(&mut self) {
		if self.state != ProcessState::Running {
			return;
		}
		if let Some(child) = self.child.as_mut() {
			if let Err(err) = child.start_kill() {
				warn!(
					target = "smith.process",
					process = %self.spec.name,
					error = %err,
					"kill failed"
				);
			}
			self.state = ProcessState::Killed;
		}
	}

	fn resolve_program(&self) -> Result<PathBuf> {
		let program = Path::new(&self.spec.program);
		if program.components().count() > 1 {
			if program.exists() {
				return Ok(program.to_path_buf());
			}
			return Err(self.launch_error(format!(
				"executable not found: {}",
				program.display()
			)));
		}
		which::which(program).map_err(|_| {
			self.launch_error(format!("executable {:?} not found on PATH", self.spec.program))
		})
	}

	fn describe_exit(&self) -> String {
		match self.state {
			ProcessState::Exited(Some(code)) => format!("status {code}"),
			ProcessState::Exited(None) => "a signal".to_string(),
			other => format!("{other:?}"),
		}
	}

	fn launch_error(&self, reason: String) -> Error {
		Error::Launch {
			process: self.spec.name.clone(),
			reason,
		}
	}
}

fn spawn_reader<R>(mut pipe: R, tail: OutputTail) -> JoinHandle<()>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	tokio::spawn(async move {
		let mut buf = [0u8; 4096];
		loop {
			match pipe.read(&mut buf).await {
				Ok(0) | Err(_) => break,
				Ok(n) => tail.push(&buf[..n]),
			}
		}
	})
}

#[cfg(unix)]
fn terminate(pid: u32) {
	use nix::sys::signal::{Signal, kill};
	use nix::unistd::Pid;

	let Ok(raw) = i32::try_from(pid) else {
		return;
	};
	if let Err(err) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
		debug!(target = "smith.process", pid, error = %err, "SIGTERM not delivered");
	}
}

#[cfg(test)]
mod tests;
