//! Bounded readiness waits.
//!
//! Every wait polls the daemon's liveness between attempts, so a daemon that
//! crashes during startup fails the wait immediately instead of at timeout.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpStream, UdpSocket};
use tokio::time::Instant;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::process::DaemonProcess;
use crate::spec::Readiness;
use crate::transport::UdpTransport;

/// Pause between readiness attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-attempt wait for an SNMP discovery answer.
const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(250);

impl Readiness {
	/// Waits until `process` is ready, it dies, or `timeout` elapses.
	///
	/// `default_endpoint` is used by [`Readiness::SnmpDiscovery`] when the
	/// check does not name one.
	pub async fn wait(
		&self,
		process: &mut DaemonProcess,
		default_endpoint: &Endpoint,
		timeout: Duration,
	) -> Result<()> {
		let started = Instant::now();
		let deadline = started + timeout;

		if let Readiness::Delay { millis } = self {
			let delay = Duration::from_millis(*millis).min(timeout);
			while Instant::now() < started + delay {
				ensure_alive(process).await?;
				tokio::time::sleep(POLL_INTERVAL.min(delay)).await;
			}
			return ensure_alive(process).await;
		}

		let mut attempts: u32 = 0;
		loop {
			ensure_alive(process).await?;
			attempts += 1;

			if self.check_once(default_endpoint).await {
				debug!(
					target = "smith.process",
					process = %process.name(),
					attempts,
					elapsed_ms = started.elapsed().as_millis() as u64,
					"daemon ready"
				);
				return Ok(());
			}

			if Instant::now() >= deadline {
				return Err(Error::Timeout {
					operation: format!("readiness of {} ({} attempts)", process.name(), attempts),
					duration_ms: timeout.as_millis() as u64,
				});
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}

	async fn check_once(&self, default_endpoint: &Endpoint) -> bool {
		match self {
			Readiness::Started | Readiness::Delay { .. } => true,
			Readiness::TcpPort { addr } => TcpStream::connect(*addr).await.is_ok(),
			Readiness::UdpBound { addr } => udp_port_taken(*addr).await,
			Readiness::SnmpDiscovery { endpoint } => {
				snmp_answers(endpoint.as_ref().unwrap_or(default_endpoint)).await
			}
		}
	}
}

async fn ensure_alive(process: &mut DaemonProcess) -> Result<()> {
	if process.is_alive() {
		return Ok(());
	}
	Err(Error::DaemonDown {
		process: process.name().to_string(),
		output: process.drain_output().await,
	})
}

/// A UDP port is taken when binding it ourselves fails with `AddrInUse`.
async fn udp_port_taken(addr: SocketAddr) -> bool {
	match UdpSocket::bind(addr).await {
		Ok(_) => false,
		Err(err) => err.kind() == std::io::ErrorKind::AddrInUse,
	}
}

/// SNMPv3 engine-discovery request (RFC 3414 section 4): reportable,
/// noAuthNoPriv, empty engine id and user name, and a GetRequest without
/// bindings. Any SNMP engine answers it with a usmStatsUnknownEngineIDs report.
#[rustfmt::skip]
const DISCOVERY_REQUEST: [u8; 60] = [
	0x30, 0x3a,
	0x02, 0x01, 0x03,
	0x30, 0x0f,
		0x02, 0x02, 0x1f, 0x2e,
		0x02, 0x03, 0x00, 0xff, 0xe3,
		0x04, 0x01, 0x04,
		0x02, 0x01, 0x03,
	0x04, 0x10,
		0x30, 0x0e,
			0x04, 0x00,
			0x02, 0x01, 0x00,
			0x02, 0x01, 0x00,
			0x04, 0x00,
			0x04, 0x00,
			0x04, 0x00,
	0x30, 0x12,
		0x04, 0x00,
		0x04, 0x00,
		0xa0, 0x0c,
			0x02, 0x02, 0x1f, 0x2e,
			0x02, 0x01, 0x00,
			0x02, 0x01, 0x00,
			0x30, 0x00,
];

/// Sends an engine-discovery request and reports whether any datagram came
/// back within `wait`.
///
/// # Errors
///
/// [`Error::Transport`] if the socket cannot be bound or the send fails.
pub async fn discovery_answered(endpoint: &Endpoint, wait: Duration) -> Result<bool> {
	let transport = UdpTransport::connect(endpoint).await?;
	transport.send(&DISCOVERY_REQUEST).await?;
	Ok(transport.recv_until(Instant::now() + wait).await?.is_some())
}

async fn snmp_answers(endpoint: &Endpoint) -> bool {
	matches!(discovery_answered(endpoint, ATTEMPT_TIMEOUT).await, Ok(true))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::spec::ProcessSpec;

	fn sleeper() -> ProcessSpec {
		ProcessSpec::new("snmp", "sh").args(["-c", "exec sleep 30"])
	}

	#[tokio::test]
	async fn tcp_readiness_waits_for_listener() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let mut process = DaemonProcess::launch(sleeper()).await.unwrap();

		Readiness::TcpPort { addr }
			.wait(&mut process, &Endpoint::default(), Duration::from_secs(2))
			.await
			.unwrap();
		process.stop(Duration::from_secs(1)).await.unwrap();
	}

	#[tokio::test]
	async fn unanswered_discovery_times_out_with_attempt_count() {
		let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let endpoint = Endpoint::from(socket.local_addr().unwrap());
		let mut process = DaemonProcess::launch(sleeper()).await.unwrap();

		let err = Readiness::SnmpDiscovery { endpoint: None }
			.wait(&mut process, &endpoint, Duration::from_millis(400))
			.await
			.unwrap_err();
		assert!(err.is_timeout(), "{err}");
		assert!(err.to_string().contains("readiness of snmp"));
		process.stop(Duration::from_secs(1)).await.unwrap();
	}

	#[tokio::test]
	async fn any_reply_counts_as_snmp_ready() {
		let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let endpoint = Endpoint::from(socket.local_addr().unwrap());
		tokio::spawn(async move {
			let mut buf = [0u8; 1500];
			if let Ok((_, peer)) = socket.recv_from(&mut buf).await {
				let _ = socket.send_to(b"report", peer).await;
			}
		});
		let mut process = DaemonProcess::launch(sleeper()).await.unwrap();

		Readiness::SnmpDiscovery {
			endpoint: Some(endpoint),
		}
		.wait(&mut process, &Endpoint::default(), Duration::from_secs(2))
		.await
		.unwrap();
		process.stop(Duration::from_secs(1)).await.unwrap();
	}

	#[test]
	fn discovery_request_lengths_are_consistent() {
		assert_eq!(usize::from(DISCOVERY_REQUEST[1]) + 2, DISCOVERY_REQUEST.len());
		// version 3, then the noAuthNoPriv reportable flag octet
		assert_eq!(&DISCOVERY_REQUEST[2..5], &[0x02, 0x01, 0x03]);
		assert_eq!(&DISCOVERY_REQUEST[16..19], &[0x04, 0x01, 0x04]);
	}

	#[tokio::test]
	async fn udp_bound_detects_held_port() {
		let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		assert!(udp_port_taken(socket.local_addr().unwrap()).await);
		let free = socket.local_addr().unwrap();
		drop(socket);
		assert!(!udp_port_taken(free).await);
	}

	#[tokio::test]
	async fn crash_during_wait_is_attributed() {
		let spec = ProcessSpec::new("agentx", "sh").args(["-c", "sleep 0.3; echo lost master; exit 1"]);
		let mut process = DaemonProcess::launch(spec).await.unwrap();

		let err = Readiness::TcpPort {
			addr: "127.0.0.1:9".parse().unwrap(),
		}
		.wait(&mut process, &Endpoint::default(), Duration::from_secs(5))
		.await
		.unwrap_err();
		assert_eq!(err.process_name(), Some("agentx"));
		assert!(err.to_string().contains("lost master"), "{err}");
	}

	#[tokio::test]
	async fn delay_readiness_checks_liveness() {
		let spec = ProcessSpec::new("agentx", "sh").args(["-c", "sleep 0.2; exit 0"]);
		let mut process = DaemonProcess::launch(spec).await.unwrap();
		let err = Readiness::Delay { millis: 1000 }
			.wait(&mut process, &Endpoint::default(), Duration::from_secs(5))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::DaemonDown { .. }));
	}
}
