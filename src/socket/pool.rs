use crate::base::neterror::{NetError, NetErrorKind};
use crate::dns::{AddressFamily, AddressSet, GaiResolver, Name, Resolve};
use crate::socket::config::ConnectConfig;
use crate::socket::connectjob::{Connect, TcpConnector};
use crate::socket::racer::ConnectionRacer;
use crate::socket::session::SocketSession;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pool key: a normalised `(host, port)` pair.
///
/// Hosts are compared case-insensitively and IPv6 literals without brackets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    host: String,
    port: u16,
}

impl Destination {
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        let host = host.as_ref();
        let bare = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
        Self { host: bare.to_ascii_lowercase(), port }
    }

    /// Host and port of a URL, using the scheme's default port if none is given.
    pub fn from_url(url: &Url) -> Option<Self> {
        Some(Self::new(url.host_str()?, url.port_or_known_default()?))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Lifecycle of a [`NetworkAccessManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ManagerState {
    Running = 0,
    Stopped = 1,
    /// Terminal.
    Disposed = 2,
}

impl ManagerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ManagerState::Running,
            1 => ManagerState::Stopped,
            _ => ManagerState::Disposed,
        }
    }
}

/// Resolves, races and pools TCP sessions keyed by destination.
///
/// Idle sessions live in a `DashMap`, so acquisition and release lock only
/// the shard holding their destination. The manager starts in
/// [`ManagerState::Running`]; share it behind an `Arc`.
pub struct NetworkAccessManager {
    resolver: Arc<dyn Resolve>,
    racer: ConnectionRacer,
    config: ConnectConfig,
    state: AtomicU8,
    idle: DashMap<Destination, VecDeque<SocketSession>>,
    shutdown: CancellationToken,
    next_session_id: AtomicU64,
}

impl fmt::Debug for NetworkAccessManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkAccessManager")
            .field("state", &self.state())
            .field("idle_sessions", &self.idle_session_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`NetworkAccessManager`]. The resolver is mandatory.
pub struct NetworkAccessManagerBuilder {
    resolver: Arc<dyn Resolve>,
    connector: Option<Arc<dyn Connect>>,
    config: ConnectConfig,
}

impl NetworkAccessManagerBuilder {
    /// Replace the default `TcpConnector`.
    pub fn connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn config(mut self, config: ConnectConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stagger_delay(mut self, delay: Duration) -> Self {
        self.config.stagger_delay = delay;
        self
    }

    pub fn family_preference(mut self, family: AddressFamily) -> Self {
        self.config.family_preference = family;
        self
    }

    pub fn build(self) -> NetworkAccessManager {
        let connector: Arc<dyn Connect> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TcpConnector::new().connect_timeout(self.config.connect_timeout)),
        };
        NetworkAccessManager {
            resolver: self.resolver,
            racer: ConnectionRacer::new(connector, &self.config),
            config: self.config,
            state: AtomicU8::new(ManagerState::Running as u8),
            idle: DashMap::new(),
            shutdown: CancellationToken::new(),
            next_session_id: AtomicU64::new(1),
        }
    }
}

impl NetworkAccessManager {
    /// Manager with default config over the given resolver.
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self::builder(resolver).build()
    }

    /// Manager backed by a fresh `getaddrinfo` resolver.
    pub fn with_system_resolver() -> Self {
        Self::new(Arc::new(GaiResolver::new()))
    }

    pub fn builder(resolver: Arc<dyn Resolve>) -> NetworkAccessManagerBuilder {
        NetworkAccessManagerBuilder { resolver, connector: None, config: ConnectConfig::default() }
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn state(&self) -> ManagerState {
        ManagerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Resume issuing sessions. No-op when running or disposed.
    pub fn start(&self) {
        match self.transition(ManagerState::Stopped, ManagerState::Running) {
            Ok(()) => tracing::debug!("network access started"),
            Err(ManagerState::Disposed) => tracing::warn!("start called on a disposed manager"),
            Err(_) => {}
        }
    }

    /// Stop issuing sessions. Sessions already checked out are untouched,
    /// and work already past the state check runs to completion.
    pub fn stop(&self) {
        if self.transition(ManagerState::Running, ManagerState::Stopped).is_ok() {
            tracing::debug!("network access stopped");
        }
    }

    fn transition(&self, from: ManagerState, to: ManagerState) -> Result<(), ManagerState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(ManagerState::from_u8)
    }

    fn ensure_running(&self) -> Result<(), NetError> {
        match self.state() {
            ManagerState::Running => Ok(()),
            ManagerState::Stopped => Err(NetError::paused("network access is stopped")),
            ManagerState::Disposed => Err(NetError::paused("network access manager is disposed")),
        }
    }

    /// Take an idle session for `host:port` out of the pool.
    ///
    /// Never touches the network. Idle sessions that went stale are closed
    /// and skipped.
    pub fn get_session(&self, host: &str, port: u16) -> Result<Option<SocketSession>, NetError> {
        self.ensure_running()?;
        Ok(self.take_idle(&Destination::new(host, port)))
    }

    /// Resolve, race and connect a new session, bypassing the pool.
    pub async fn create_session(&self, host: &str, port: u16) -> Result<SocketSession, NetError> {
        self.ensure_running()?;
        let destination = Destination::new(host, port);

        let addrs = tokio::select! {
            resolved = self.resolve(&destination) => resolved?,
            _ = self.shutdown.cancelled() => {
                return Err(NetError::new(NetErrorKind::Aborted).with_detail("manager disposed during resolution"));
            }
        };

        let outcome = self.racer.race(&addrs, destination.port(), &self.shutdown).await?;
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            session = id,
            destination = %destination,
            addr = %outcome.remote_addr,
            attempts = outcome.attempts.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "session created"
        );
        Ok(SocketSession::new(id, destination, outcome.remote_addr, outcome.socket))
    }

    /// [`get_session`](Self::get_session), falling back to
    /// [`create_session`](Self::create_session) on a miss.
    pub async fn get_or_create_session(
        &self,
        host: &str,
        port: u16,
    ) -> Result<SocketSession, NetError> {
        if let Some(session) = self.get_session(host, port)? {
            tracing::trace!(session = session.id(), destination = %session.destination(), "reusing idle session");
            return Ok(session);
        }
        self.create_session(host, port).await
    }

    /// Hand a session back for reuse.
    ///
    /// The session is closed instead when the manager is not running, when
    /// its connection is broken or has unread bytes, or when the
    /// destination's idle list is full.
    pub fn release(&self, mut session: SocketSession) {
        if session.is_closed() {
            return;
        }
        if self.state() != ManagerState::Running {
            tracing::trace!(session = session.id(), "manager not running, closing released session");
            session.close();
            return;
        }
        if !session.is_reusable() {
            tracing::debug!(session = session.id(), destination = %session.destination(), "discarding broken session");
            session.close();
            return;
        }

        let rejected = {
            let mut queue = self.idle.entry(session.destination().clone()).or_default();
            // Re-checked under the entry lock so dispose() cannot miss it.
            if self.state() != ManagerState::Running
                || queue.len() >= self.config.max_idle_per_destination
            {
                Some(session)
            } else {
                tracing::trace!(session = session.id(), destination = %session.destination(), "session returned to pool");
                session.mark_idle();
                queue.push_back(session);
                None
            }
        };

        if let Some(mut session) = rejected {
            session.close();
        }
    }

    /// Close every idle session, cancel in-flight races and refuse all
    /// further work. Idempotent.
    pub fn dispose(&self) {
        let previous = ManagerState::from_u8(self.state.swap(ManagerState::Disposed as u8, Ordering::SeqCst));
        if previous == ManagerState::Disposed {
            return;
        }
        self.shutdown.cancel();

        // Move everything out shard by shard, close outside the locks.
        let mut drained = Vec::new();
        self.idle.retain(|_, queue| {
            drained.extend(queue.drain(..));
            false
        });

        let count = drained.len();
        for mut session in drained {
            session.close();
        }
        tracing::debug!(closed = count, "network access manager disposed");
    }

    /// Idle sessions across all destinations.
    pub fn idle_session_count(&self) -> usize {
        self.idle.iter().map(|q| q.len()).sum()
    }

    pub fn idle_session_count_for(&self, host: &str, port: u16) -> usize {
        self.idle.get(&Destination::new(host, port)).map(|q| q.len()).unwrap_or(0)
    }

    /// Close idle sessions that expired or went stale. Returns how many were closed.
    pub fn cleanup_idle_sessions(&self) -> usize {
        let mut expired = Vec::new();
        self.idle.retain(|_, queue| {
            let mut kept = VecDeque::with_capacity(queue.len());
            for session in queue.drain(..) {
                if self.is_usable_idle(&session) {
                    kept.push_back(session);
                } else {
                    expired.push(session);
                }
            }
            *queue = kept;
            !queue.is_empty()
        });

        let count = expired.len();
        for mut session in expired {
            session.close();
        }
        if count > 0 {
            tracing::debug!(closed = count, "idle sessions cleaned up");
        }
        count
    }

    /// Periodically run [`cleanup_idle_sessions`](Self::cleanup_idle_sessions)
    /// until the manager is disposed or dropped.
    pub fn start_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let period = self.config.cleanup_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(manager) = manager.upgrade() else { break };
                        manager.cleanup_idle_sessions();
                    }
                }
            }
        })
    }

    fn is_usable_idle(&self, session: &SocketSession) -> bool {
        let fresh = session.idle_for().map_or(true, |idle| idle < self.config.idle_timeout);
        fresh && session.is_reusable()
    }

    fn take_idle(&self, destination: &Destination) -> Option<SocketSession> {
        let mut stale = Vec::new();
        let found = {
            let mut queue = self.idle.get_mut(destination)?;
            // Most recently released first.
            loop {
                match queue.pop_back() {
                    Some(session) if self.is_usable_idle(&session) => break Some(session),
                    Some(session) => stale.push(session),
                    None => break None,
                }
            }
        };
        self.idle.remove_if(destination, |_, queue| queue.is_empty());

        for mut session in stale {
            tracing::debug!(session = session.id(), destination = %destination, "closing stale idle session");
            session.close();
        }

        found.map(|mut session| {
            session.mark_checked_out();
            session
        })
    }

    async fn resolve(&self, destination: &Destination) -> Result<AddressSet, NetError> {
        if let Some(addrs) = AddressSet::from_literal(destination.host()) {
            return Ok(addrs);
        }

        let host = destination.host();
        let addrs: AddressSet = self
            .resolver
            .resolve(Name::new(host))
            .await
            .map_err(|e| match e.kind() {
                NetErrorKind::HostNotFound => e,
                _ => NetError::new(NetErrorKind::HostNotFound).with_detail(format!("resolving {host}: {e}")),
            })?
            .collect();

        if addrs.is_empty() {
            tracing::debug!(host = %host, "resolver returned no addresses");
            return Err(NetError::host_not_found(host, None));
        }

        tracing::trace!(host = %host, v6 = addrs.v6().len(), v4 = addrs.v4().len(), "resolved");
        Ok(addrs)
    }
}

impl Drop for NetworkAccessManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
