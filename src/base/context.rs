//! Ergonomic error context helpers.
//!
//! Extension traits that convert IO errors into context-rich `NetError`
//! values at the point where they are observed.

use crate::base::neterror::NetError;
use std::io;
use std::net::SocketAddr;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use netaccess::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context(addr)?;
    /// // Error: "The target server actively refuses. (connecting to 10.0.0.1:443)"
    /// ```
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(&addr.ip().to_string(), addr.port(), e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::host_not_found(domain, Some(e)))
    }
}
