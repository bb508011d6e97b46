//! Connected UDP transport for one SNMP peer.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::trace;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// Largest UDP payload we accept.
const MAX_DATAGRAM: usize = 65_535;

/// A UDP socket connected to a single agent. Datagrams from other peers are
/// filtered by the kernel.
#[derive(Debug)]
pub struct UdpTransport {
	socket: UdpSocket,
	peer: SocketAddr,
}

impl UdpTransport {
	pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
		let peer = endpoint.resolve().await?;
		let local: SocketAddr = if peer.is_ipv4() {
			([0, 0, 0, 0], 0).into()
		} else {
			(std::net::Ipv6Addr::UNSPECIFIED, 0).into()
		};
		let socket = UdpSocket::bind(local)
			.await
			.map_err(|e| Error::Transport(format!("bind failed: {e}")))?;
		socket
			.connect(peer)
			.await
			.map_err(|e| Error::Transport(format!("connect to {peer} failed: {e}")))?;
		Ok(Self { socket, peer })
	}

	pub fn peer(&self) -> SocketAddr {
		self.peer
	}

	pub fn local_addr(&self) -> Result<SocketAddr> {
		Ok(self.socket.local_addr()?)
	}

	pub async fn send(&self, datagram: &[u8]) -> Result<()> {
		trace!(target = "smith.session", peer = %self.peer, len = datagram.len(), "send");
		self.socket
			.send(datagram)
			.await
			.map_err(|e| Error::Transport(format!("send to {} failed: {e}", self.peer)))?;
		Ok(())
	}

	/// Receives one datagram, or `None` once `deadline` passes.
	pub async fn recv_until(&self, deadline: Instant) -> Result<Option<Vec<u8>>> {
		let mut buf = vec![0u8; MAX_DATAGRAM];
		match tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
			Err(_) => Ok(None),
			Ok(Ok(len)) => {
				trace!(target = "smith.session", peer = %self.peer, len, "recv");
				buf.truncate(len);
				Ok(Some(buf))
			}
			Ok(Err(e)) => Err(Error::Transport(format!(
				"receive from {} failed: {e}",
				self.peer
			))),
		}
	}
}
