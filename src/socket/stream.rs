//! Socket abstraction for polymorphic stream handling.
//!
//! This module provides a `StreamSocket` trait that lets the racer and the
//! pool treat a real TCP stream and an in-memory pipe the same way, and a
//! `BoxedSocket` wrapper that erases the concrete type.

use futures::FutureExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;

/// A connected duplex byte stream with a cheap liveness probe.
///
/// Equivalent to a `StreamSocket` in a Chromium-style net stack.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static {
    /// Check if the socket is connected.
    fn is_connected(&self) -> bool {
        true
    }

    /// Connected and no unread bytes are waiting.
    fn is_connected_and_idle(&self) -> bool {
        self.is_connected()
    }
}

impl StreamSocket for TcpStream {
    fn is_connected(&self) -> bool {
        !matches!(peek_state(self), PeekState::Closed)
    }

    fn is_connected_and_idle(&self) -> bool {
        matches!(peek_state(self), PeekState::Idle)
    }
}

// In-memory pipes, always considered connected.
impl StreamSocket for DuplexStream {}

enum PeekState {
    Idle,
    HasData,
    Closed,
}

/// Non-blocking, non-consuming readiness check on a TCP stream.
fn peek_state(stream: &TcpStream) -> PeekState {
    if stream.peer_addr().is_err() {
        return PeekState::Closed;
    }

    let mut buf = [0u8; 1];
    match stream.peek(&mut buf).now_or_never() {
        None => PeekState::Idle,
        Some(Ok(0)) => PeekState::Closed, // EOF
        Some(Ok(_)) => PeekState::HasData,
        Some(Err(_)) => PeekState::Closed,
    }
}

/// A wrapper type for boxed dynamic StreamSocket that is object-safe.
/// This avoids conflicting trait implementations with tokio's blanket impls.
pub struct BoxedSocket {
    inner: Pin<Box<dyn StreamSocket>>,
}

impl BoxedSocket {
    /// Create a new BoxedSocket from any StreamSocket.
    pub fn new<S: StreamSocket>(socket: S) -> Self {
        Self { inner: Box::pin(socket) }
    }

    /// Get a pinned mutable reference to the inner socket.
    pub fn as_mut(&mut self) -> Pin<&mut dyn StreamSocket> {
        self.inner.as_mut()
    }

    /// Check if the socket is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Check if the socket is connected with nothing left unread.
    pub fn is_connected_and_idle(&self) -> bool {
        self.inner.is_connected_and_idle()
    }
}

impl std::fmt::Debug for BoxedSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedSocket").finish_non_exhaustive()
    }
}

impl AsyncRead for BoxedSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}
