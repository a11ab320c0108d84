//! A caller-visible handle to one established connection.

use crate::base::neterror::{NetError, NetErrorKind};
use crate::dns::AddressFamily;
use crate::socket::pool::Destination;
use crate::socket::stream::BoxedSocket;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::Instant;

/// Owns exactly one live connection and exposes it as a duplex byte stream.
///
/// A session has a single owner at a time: reads and writes need
/// `&mut self`. [`close`](Self::close) is idempotent; once closed, I/O fails
/// with `NotConnected` and the pool refuses to take the session back.
pub struct SocketSession {
    id: u64,
    destination: Destination,
    remote_addr: SocketAddr,
    socket: Option<BoxedSocket>,
    created_at: Instant,
    idle_since: Option<Instant>,
    reuse_count: u32,
}

impl SocketSession {
    pub(crate) fn new(
        id: u64,
        destination: Destination,
        remote_addr: SocketAddr,
        socket: BoxedSocket,
    ) -> Self {
        Self {
            id,
            destination,
            remote_addr,
            socket: Some(socket),
            created_at: Instant::now(),
            idle_since: None,
            reuse_count: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pool key this session belongs to.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.remote_addr.ip())
    }

    /// Whether this session came out of the idle pool.
    pub fn was_reused(&self) -> bool {
        self.reuse_count > 0
    }

    pub fn reuse_count(&self) -> u32 {
        self.reuse_count
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time spent idle in the pool, if it is there now.
    pub fn idle_for(&self) -> Option<Duration> {
        self.idle_since.map(|t| t.elapsed())
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Open and the peer has not closed or reset the connection.
    pub fn is_connected(&self) -> bool {
        self.socket.as_ref().is_some_and(|s| s.is_connected())
    }

    /// Connected with no unread bytes, i.e. safe to hand to a new request.
    pub fn is_reusable(&self) -> bool {
        self.socket.as_ref().is_some_and(|s| s.is_connected_and_idle())
    }

    /// The underlying stream.
    pub fn stream(&mut self) -> Result<&mut BoxedSocket, NetError> {
        self.socket
            .as_mut()
            .ok_or_else(|| NetError::new(NetErrorKind::Aborted).with_detail("session is closed"))
    }

    /// Release the underlying handle. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            tracing::trace!(session = self.id, destination = %self.destination, "closing session");
            drop(socket);
        }
    }

    /// Send FIN, then close.
    pub async fn shutdown(&mut self) -> Result<(), NetError> {
        let result = match self.socket.as_mut() {
            Some(socket) => socket.shutdown().await.map_err(NetError::from),
            None => Ok(()),
        };
        self.close();
        result
    }

    pub(crate) fn mark_idle(&mut self) {
        self.idle_since = Some(Instant::now());
    }

    pub(crate) fn mark_checked_out(&mut self) {
        self.idle_since = None;
        self.reuse_count += 1;
    }
}

impl std::fmt::Debug for SocketSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketSession")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.is_closed())
            .field("reuse_count", &self.reuse_count)
            .finish()
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "session is closed")
}

impl AsyncRead for SocketSession {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.socket.as_mut() {
            Some(s) => Pin::new(s).poll_read(cx, buf),
            None => Poll::Ready(Err(not_connected())),
        }
    }
}

impl AsyncWrite for SocketSession {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.socket.as_mut() {
            Some(s) => Pin::new(s).poll_write(cx, buf),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.socket.as_mut() {
            Some(s) => Pin::new(s).poll_flush(cx),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.socket.as_mut() {
            Some(s) => Pin::new(s).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}
