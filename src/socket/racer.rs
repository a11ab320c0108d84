//! Happy Eyeballs (RFC 8305) connection racing.
//!
//! The racer launches one attempt at a time, alternating address families,
//! and keeps every launched attempt in a single `JoinSet` for the whole race.
//! A new attempt is launched when the stagger timer fires or as soon as an
//! in-flight attempt fails. The first attempt to succeed wins; all others are
//! aborted and drained before `race` returns, so no socket outlives the call.

use crate::base::neterror::{NetError, NetErrorKind};
use crate::dns::{AddressFamily, AddressSet, ResolvedAddress};
use crate::socket::config::ConnectConfig;
use crate::socket::connectjob::{
    AttemptOutcome, AttemptRecord, AttemptState, Connect, ConnectJob,
};
use crate::socket::stream::BoxedSocket;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Read cursors over the two families of an [`AddressSet`].
///
/// The first address comes from the preferred family; each later one comes
/// from the family opposite to the previous pick while it still has
/// addresses, otherwise from whichever family remains.
#[derive(Debug)]
pub struct AddressCursor<'a> {
    addrs: &'a AddressSet,
    next_v6: usize,
    next_v4: usize,
    preference: AddressFamily,
    last: Option<AddressFamily>,
}

impl<'a> AddressCursor<'a> {
    pub fn new(addrs: &'a AddressSet, preference: AddressFamily) -> Self {
        Self { addrs, next_v6: 0, next_v4: 0, preference, last: None }
    }

    fn index_mut(&mut self, family: AddressFamily) -> &mut usize {
        match family {
            AddressFamily::V6 => &mut self.next_v6,
            AddressFamily::V4 => &mut self.next_v4,
        }
    }

    /// Addresses of `family` not yet handed out.
    pub fn remaining(&self, family: AddressFamily) -> usize {
        let used = match family {
            AddressFamily::V6 => self.next_v6,
            AddressFamily::V4 => self.next_v4,
        };
        self.addrs.family(family).len() - used
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining(AddressFamily::V6) > 0 || self.remaining(AddressFamily::V4) > 0
    }
}

impl Iterator for AddressCursor<'_> {
    type Item = ResolvedAddress;

    fn next(&mut self) -> Option<ResolvedAddress> {
        let wanted = match self.last {
            None => self.preference,
            Some(prev) => prev.other(),
        };
        let family = if self.remaining(wanted) > 0 {
            wanted
        } else if self.remaining(wanted.other()) > 0 {
            wanted.other()
        } else {
            return None;
        };

        let addrs = self.addrs;
        let idx = self.index_mut(family);
        let addr = addrs.family(family)[*idx];
        *idx += 1;
        self.last = Some(family);
        Some(addr)
    }
}

/// Winning connection of a race.
#[derive(Debug)]
pub struct RaceOutcome {
    pub socket: BoxedSocket,
    pub remote_addr: SocketAddr,
    /// Every attempt launched, in launch order, all in a terminal state.
    pub attempts: Vec<AttemptRecord>,
    pub elapsed: Duration,
}

/// Runs Happy Eyeballs races over a [`Connect`] implementation.
#[derive(Clone)]
pub struct ConnectionRacer {
    connector: Arc<dyn Connect>,
    stagger_delay: Duration,
    preference: AddressFamily,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for ConnectionRacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRacer")
            .field("stagger_delay", &self.stagger_delay)
            .field("preference", &self.preference)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl ConnectionRacer {
    pub fn new(connector: Arc<dyn Connect>, config: &ConnectConfig) -> Self {
        Self {
            connector,
            stagger_delay: config.stagger_delay,
            preference: config.family_preference,
            deadline: config.race_deadline,
        }
    }

    /// Race connections to `port` on every address in `addrs`.
    ///
    /// Fails with `Unreachable` once every address has been tried and
    /// failed, `TimedOut` when the race deadline passes, and `Aborted` if
    /// `cancel` fires. Individual attempt errors are logged, never returned.
    pub async fn race(
        &self,
        addrs: &AddressSet,
        port: u16,
        cancel: &CancellationToken,
    ) -> Result<RaceOutcome, NetError> {
        let mut cursor = AddressCursor::new(addrs, self.preference);
        let mut race = Race::new(Arc::clone(&self.connector), port);

        if !race.launch(&mut cursor) {
            return Err(NetError::new(NetErrorKind::Unreachable).with_detail("no addresses to attempt"));
        }

        let stagger = time::sleep(self.stagger_delay);
        tokio::pin!(stagger);

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    race.drain().await;
                    return Err(NetError::new(NetErrorKind::Aborted).with_detail("race canceled"));
                }

                _ = &mut expired => {
                    tracing::debug!(port, launched = race.records.len(), "race deadline expired");
                    race.drain().await;
                    return Err(NetError::new(NetErrorKind::TimedOut)
                        .with_detail(format!("no connection to port {port} before deadline")));
                }

                Some(joined) = race.attempts.join_next() => {
                    match joined {
                        Ok(AttemptOutcome { id, address, result: Ok(socket) }) => {
                            race.records[id].state = AttemptState::Succeeded;
                            race.drain().await;
                            let elapsed = race.started.elapsed();
                            tracing::debug!(
                                addr = %address,
                                elapsed_ms = elapsed.as_millis() as u64,
                                attempts = race.records.len(),
                                "race won"
                            );
                            return Ok(RaceOutcome {
                                socket,
                                remote_addr: address,
                                attempts: race.records,
                                elapsed,
                            });
                        }
                        Ok(AttemptOutcome { id, result: Err(err), .. }) => {
                            race.records[id].state = AttemptState::Failed(err.kind());
                        }
                        Err(e) => tracing::warn!(error = %e, "connect attempt task failed"),
                    }

                    // Fail fast: don't wait out the stagger timer.
                    if race.launch(&mut cursor) {
                        stagger.as_mut().reset(Instant::now() + self.stagger_delay);
                    } else if race.attempts.is_empty() {
                        tracing::debug!(port, attempts = race.records.len(), "all addresses exhausted");
                        race.drain().await;
                        return Err(NetError::new(NetErrorKind::Unreachable).with_detail(format!(
                            "all {} addresses failed on port {port}",
                            race.records.len()
                        )));
                    }
                }

                () = &mut stagger, if cursor.has_remaining() => {
                    race.launch(&mut cursor);
                    stagger.as_mut().reset(Instant::now() + self.stagger_delay);
                }
            }
        }
    }
}

/// Per-race state: the live attempt set plus one record per launch.
struct Race {
    connector: Arc<dyn Connect>,
    port: u16,
    attempts: JoinSet<AttemptOutcome>,
    records: Vec<AttemptRecord>,
    started: Instant,
}

impl Race {
    fn new(connector: Arc<dyn Connect>, port: u16) -> Self {
        Self {
            connector,
            port,
            attempts: JoinSet::new(),
            records: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Launch the next address, if any. Returns whether one was launched.
    fn launch(&mut self, cursor: &mut AddressCursor<'_>) -> bool {
        let Some(target) = cursor.next() else {
            return false;
        };
        let job = ConnectJob::new(self.records.len(), target, self.port);
        self.records.push(AttemptRecord {
            address: job.address(),
            family: job.family(),
            launched_after: self.started.elapsed(),
            state: AttemptState::Pending,
        });
        self.attempts.spawn(job.run(Arc::clone(&self.connector)));
        true
    }

    /// Abort every live attempt and wait until each has finished, closing
    /// any connection that completed in the meantime.
    async fn drain(&mut self) {
        self.attempts.abort_all();
        while let Some(joined) = self.attempts.join_next().await {
            match joined {
                Ok(AttemptOutcome { id, address, result: Ok(socket) }) => {
                    tracing::debug!(addr = %address, "closing connection that lost the race");
                    drop(socket);
                    self.records[id].state = AttemptState::Canceled;
                }
                Ok(AttemptOutcome { id, result: Err(err), .. }) => {
                    self.records[id].state = AttemptState::Failed(err.kind());
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::warn!(error = %e, "connect attempt task failed"),
            }
        }
        for record in &mut self.records {
            if record.state == AttemptState::Pending {
                record.state = AttemptState::Canceled;
            }
        }
    }
}
