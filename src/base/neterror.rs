use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Stable vocabulary for every failure this crate reports.
///
/// Low-level transport errors are mapped to one of these kinds where they
/// are observed; anything without a mapping becomes [`NetErrorKind::Unknown`].
#[derive(Debug, Error, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NetErrorKind {
    #[error("The target server actively refuses.")]
    Refused,
    #[error("Connection timed out.")]
    TimedOut,
    #[error("The connection was aborted.")]
    Aborted,
    #[error("The connection was reset.")]
    Reset,
    #[error("The specified network address is unreachable.")]
    Unreachable,
    #[error("The specified network address does not exist.")]
    HostNotFound,
    #[error("Network protocol error.")]
    ProtocolError,
    #[error("Network access is paused.")]
    Paused,
    #[error("Unknown error.")]
    Unknown,
}

impl NetErrorKind {
    /// Fixed human-readable description of this kind.
    pub fn description(&self) -> &'static str {
        match self {
            NetErrorKind::Refused => "The target server actively refuses.",
            NetErrorKind::TimedOut => "Connection timed out.",
            NetErrorKind::Aborted => "The connection was aborted.",
            NetErrorKind::Reset => "The connection was reset.",
            NetErrorKind::Unreachable => "The specified network address is unreachable.",
            NetErrorKind::HostNotFound => "The specified network address does not exist.",
            NetErrorKind::ProtocolError => "Network protocol error.",
            NetErrorKind::Paused => "Network access is paused.",
            NetErrorKind::Unknown => "Unknown error.",
        }
    }

    /// Numeric code of this kind (historical socket error numbers).
    pub fn as_i32(&self) -> i32 {
        match self {
            NetErrorKind::Refused => 10061,
            NetErrorKind::TimedOut => 10060,
            NetErrorKind::Aborted => 10053,
            NetErrorKind::Reset => 10054,
            NetErrorKind::Unreachable => 10065,
            NetErrorKind::HostNotFound => 11061,
            NetErrorKind::ProtocolError => 10041,
            NetErrorKind::Paused => 20001,
            NetErrorKind::Unknown => -1,
        }
    }

    /// Maps a portable I/O error kind.
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused => NetErrorKind::Refused,
            io::ErrorKind::TimedOut => NetErrorKind::TimedOut,
            io::ErrorKind::ConnectionAborted => NetErrorKind::Aborted,
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => NetErrorKind::Reset,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => NetErrorKind::Unreachable,
            io::ErrorKind::InvalidData => NetErrorKind::ProtocolError,
            _ => NetErrorKind::Unknown,
        }
    }

    /// Maps an I/O error, honouring raw OS codes that carry a known number.
    pub fn from_io(err: &io::Error) -> Self {
        if let Some(code) = err.raw_os_error() {
            let kind = NetErrorKind::from(code);
            if kind != NetErrorKind::Unknown {
                return kind;
            }
        }
        Self::from_io_kind(err.kind())
    }
}

impl From<i32> for NetErrorKind {
    fn from(code: i32) -> Self {
        match code {
            10061 => NetErrorKind::Refused,
            10060 => NetErrorKind::TimedOut,
            10053 => NetErrorKind::Aborted,
            10054 => NetErrorKind::Reset,
            10065 => NetErrorKind::Unreachable,
            11061 => NetErrorKind::HostNotFound,
            10041 => NetErrorKind::ProtocolError,
            20001 => NetErrorKind::Paused,
            _ => NetErrorKind::Unknown,
        }
    }
}

/// Error returned by every fallible operation in this crate.
///
/// Always one of the [`NetErrorKind`] members, optionally with a context
/// detail and the underlying I/O error as its source.
#[derive(Debug, Error, Clone)]
#[error("{kind}{}", detail_suffix(.detail))]
pub struct NetError {
    kind: NetErrorKind,
    detail: Option<String>,
    #[source]
    source: Option<Arc<io::Error>>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

impl NetError {
    pub fn new(kind: NetErrorKind) -> Self {
        Self { kind, detail: None, source: None }
    }

    /// Attach a context detail shown after the kind description.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach the underlying I/O error.
    pub fn with_source(mut self, source: io::Error) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> NetErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn io_source(&self) -> Option<&io::Error> {
        self.source.as_deref()
    }

    pub fn as_i32(&self) -> i32 {
        self.kind.as_i32()
    }

    /// Calls made while the manager is stopped or disposed.
    pub fn paused(detail: impl Into<String>) -> Self {
        Self::new(NetErrorKind::Paused).with_detail(detail)
    }

    /// Name resolution failed or returned no addresses.
    pub fn host_not_found(domain: &str, source: Option<io::Error>) -> Self {
        let err = Self::new(NetErrorKind::HostNotFound).with_detail(format!("resolving {domain}"));
        match source {
            Some(e) => err.with_source(e),
            None => err,
        }
    }

    /// A transport failure observed while connecting to `host:port`.
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        Self::new(NetErrorKind::from_io(&source))
            .with_detail(format!("connecting to {host}:{port}"))
            .with_source(source)
    }
}

impl From<NetErrorKind> for NetError {
    fn from(kind: NetErrorKind) -> Self {
        NetError::new(kind)
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::new(NetErrorKind::from_io(&err)).with_source(err)
    }
}

impl PartialEq<NetErrorKind> for NetError {
    fn eq(&self, other: &NetErrorKind) -> bool {
        self.kind == *other
    }
}
