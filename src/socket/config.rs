//! Connection and pool configuration.

use crate::dns::AddressFamily;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for racing and pooling.
///
/// Durations (de)serialize as integer milliseconds; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Wait before launching the next attempt when nothing has resolved yet.
    #[serde(with = "millis")]
    pub stagger_delay: Duration,
    /// Family of the first attempt.
    pub family_preference: AddressFamily,
    /// Overall deadline for one race.
    #[serde(with = "opt_millis")]
    pub race_deadline: Option<Duration>,
    /// Per-attempt connect timeout (`TcpConnector` only).
    #[serde(with = "opt_millis")]
    pub connect_timeout: Option<Duration>,
    /// Idle sessions kept per destination.
    pub max_idle_per_destination: usize,
    /// Idle sessions older than this are closed instead of reused.
    #[serde(with = "millis")]
    pub idle_timeout: Duration,
    /// Period of the background idle sweep.
    #[serde(with = "millis")]
    pub cleanup_interval: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            stagger_delay: Duration::from_millis(200),
            family_preference: AddressFamily::V6,
            race_deadline: None,
            connect_timeout: None,
            max_idle_per_destination: 6,
            idle_timeout: Duration::from_secs(300), // 5 minutes
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl ConnectConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stagger delay between attempts.
    pub fn stagger_delay(mut self, delay: Duration) -> Self {
        self.stagger_delay = delay;
        self
    }

    /// Set which family is tried first.
    pub fn family_preference(mut self, family: AddressFamily) -> Self {
        self.family_preference = family;
        self
    }

    /// Set an overall deadline for each race.
    pub fn race_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.race_deadline = deadline;
        self
    }

    /// Set a per-attempt connect timeout.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle capacity per destination.
    pub fn max_idle_per_destination(mut self, max: usize) -> Self {
        self.max_idle_per_destination = max;
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the idle sweep period.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
