//! Transport connectors and single connection attempts.
//!
//! A [`ConnectJob`] is one outstanding connect against one resolved address.
//! Transport errors are mapped to a [`NetError`] here, where they are
//! observed; the racer only ever sees the mapped kind.

use crate::base::context::IoResultExt;
use crate::base::neterror::{NetError, NetErrorKind};
use crate::dns::{AddressFamily, ResolvedAddress};
use crate::socket::stream::BoxedSocket;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpSocket;
use tokio::time::Instant;

/// Alias for the `Future` type returned by a connector.
pub type Connecting = Pin<Box<dyn Future<Output = io::Result<BoxedSocket>> + Send>>;

/// Opens a transport connection to one socket address.
///
/// Dropping the returned future must release whatever handle it holds;
/// that is how the racer cancels a losing attempt.
pub trait Connect: Send + Sync {
    fn connect(&self, addr: SocketAddr) -> Connecting;
}

impl<C: Connect + ?Sized> Connect for Arc<C> {
    fn connect(&self, addr: SocketAddr) -> Connecting {
        (**self).connect(addr)
    }
}

/// Plain TCP connector built on tokio's `TcpSocket`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
    nodelay: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpConnector {
    pub fn new() -> Self {
        Self { connect_timeout: None, nodelay: true }
    }

    /// Bound each connect call; expiry surfaces as `TimedOut`.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set `TCP_NODELAY` on established streams (default on).
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Connect for TcpConnector {
    fn connect(&self, addr: SocketAddr) -> Connecting {
        let connect_timeout = self.connect_timeout;
        let nodelay = self.nodelay;
        Box::pin(async move {
            let socket = match addr {
                SocketAddr::V4(_) => TcpSocket::new_v4()?,
                SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };

            // The socket is owned by this future; dropping it closes the fd.
            let connect = socket.connect(addr);
            let stream = match connect_timeout {
                Some(dur) => tokio::time::timeout(dur, connect)
                    .await
                    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??,
                None => connect.await?,
            };

            if nodelay {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::warn!(addr = %addr, error = %e, "tcp set_nodelay error");
                }
            }

            Ok(BoxedSocket::new(stream))
        })
    }
}

/// Terminal (or pending) state of one attempt within a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Succeeded,
    Failed(NetErrorKind),
    Canceled,
}

/// What the racer remembers about every attempt it launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub address: SocketAddr,
    pub family: AddressFamily,
    /// Offset from the start of the race.
    pub launched_after: Duration,
    pub state: AttemptState,
}

/// Result of running a [`ConnectJob`] to completion.
pub struct AttemptOutcome {
    pub id: usize,
    pub address: SocketAddr,
    pub result: Result<BoxedSocket, NetError>,
}

/// One connect against a single address.
/// Roughly equivalent to a transport connect job in a Chromium-style stack.
#[derive(Debug, Clone)]
pub struct ConnectJob {
    id: usize,
    target: ResolvedAddress,
    port: u16,
}

impl ConnectJob {
    pub fn new(id: usize, target: ResolvedAddress, port: u16) -> Self {
        Self { id, target, port }
    }

    pub fn address(&self) -> SocketAddr {
        self.target.with_port(self.port)
    }

    pub fn family(&self) -> AddressFamily {
        self.target.family()
    }

    /// Connects and maps any transport error at this boundary.
    pub async fn run(self, connector: Arc<dyn Connect>) -> AttemptOutcome {
        let address = self.address();
        let started = Instant::now();
        tracing::debug!(attempt = self.id, addr = %address, family = %self.family(), "connect attempt started");

        let result = connector.connect(address).await.connect_context(address);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(attempt = self.id, addr = %address, elapsed_ms, "connect attempt succeeded"),
            Err(e) => tracing::debug!(attempt = self.id, addr = %address, elapsed_ms, error = %e, "connect attempt failed"),
        }

        AttemptOutcome { id: self.id, address, result }
    }
}
