//! Deterministic fakes shared by the integration tests.
//!
//! `StaticResolver` answers every name with a fixed list after a fixed
//! latency. `FakeConnector` scripts each address (hang, succeed or fail
//! after a delay), records every launch, and counts open sockets so tests
//! can assert that nothing leaks.

#![allow(dead_code)]

use netaccess::base::neterror::{NetError, NetErrorKind};
use netaccess::dns::{Addrs, Name, Resolve, ResolvedAddress, Resolving};
use netaccess::socket::connectjob::{Connect, Connecting};
use netaccess::socket::stream::{BoxedSocket, StreamSocket};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::time::Instant;

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub struct StaticResolver {
    answer: Result<Vec<IpAddr>, NetErrorKind>,
    latency: Duration,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(ips: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(ips.iter().map(|s| ip(s)).collect()),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_latency(ips: &[&str], latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(ips.iter().map(|s| ip(s)).collect()),
            latency,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(kind: NetErrorKind) -> Arc<Self> {
        Arc::new(Self { answer: Err(kind), latency: Duration::ZERO, calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.clone();
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match answer {
                Ok(ips) => Ok(Box::new(ips.into_iter().map(ResolvedAddress::new)) as Addrs),
                Err(kind) => Err(NetError::new(kind).with_detail("scripted resolver failure")),
            }
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Never completes until canceled.
    Hang,
    Succeed(Duration),
    Fail(Duration, io::ErrorKind),
}

/// Counts one open socket for as long as it lives.
struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
    fn new(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(open))
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeStream {
    inner: DuplexStream,
    _peer: DuplexStream,
    _guard: OpenGuard,
    healthy: Arc<AtomicBool>,
}

impl AsyncRead for FakeStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for FakeStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl StreamSocket for FakeStream {
    fn is_connected(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

pub struct FakeConnector {
    behaviors: HashMap<IpAddr, Behavior>,
    default: Behavior,
    launches: Mutex<Vec<(SocketAddr, Duration)>>,
    open: Arc<AtomicUsize>,
    healthy: Arc<AtomicBool>,
    epoch: Instant,
}

impl FakeConnector {
    /// Every address connects immediately.
    pub fn new() -> Self {
        Self::with_default(Behavior::Succeed(Duration::ZERO))
    }

    pub fn with_default(default: Behavior) -> Self {
        Self {
            behaviors: HashMap::new(),
            default,
            launches: Mutex::new(Vec::new()),
            open: Arc::new(AtomicUsize::new(0)),
            healthy: Arc::new(AtomicBool::new(true)),
            epoch: Instant::now(),
        }
    }

    pub fn script(mut self, addr: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(ip(addr), behavior);
        self
    }

    /// Addresses in launch order.
    pub fn launched(&self) -> Vec<SocketAddr> {
        self.launches.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    /// Launch offsets from connector creation.
    pub fn launch_times(&self) -> Vec<Duration> {
        self.launches.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    /// Sockets currently open: pending connects plus live streams.
    pub fn open_sockets(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Make every stream (existing and future) report a broken connection.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl Connect for FakeConnector {
    fn connect(&self, addr: SocketAddr) -> Connecting {
        self.launches.lock().unwrap().push((addr, self.epoch.elapsed()));
        let behavior = self.behaviors.get(&addr.ip()).copied().unwrap_or(self.default);
        let guard = OpenGuard::new(&self.open);
        let healthy = Arc::clone(&self.healthy);

        Box::pin(async move {
            match behavior {
                Behavior::Hang => {
                    let _guard = guard;
                    std::future::pending::<io::Result<BoxedSocket>>().await
                }
                Behavior::Succeed(delay) => {
                    tokio::time::sleep(delay).await;
                    let (inner, peer) = tokio::io::duplex(1024);
                    Ok(BoxedSocket::new(FakeStream { inner, _peer: peer, _guard: guard, healthy }))
                }
                Behavior::Fail(delay, kind) => {
                    tokio::time::sleep(delay).await;
                    drop(guard);
                    Err(io::Error::new(kind, "scripted connect failure"))
                }
            }
        })
    }
}
