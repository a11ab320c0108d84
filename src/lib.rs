//! # netaccess
//!
//! Transport connection establishment for an HTTP stack.
//!
//! Given a hostname and port, `netaccess` resolves candidate addresses,
//! races TCP connection attempts across IPv6 and IPv4 following RFC 8305
//! ("Happy Eyeballs"), and hands back the first connection to succeed as a
//! [`SocketSession`]. Sessions released back to the
//! [`NetworkAccessManager`] are pooled per destination and reused.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netaccess::dns::GaiResolver;
//! use netaccess::NetworkAccessManager;
//! use std::sync::Arc;
//! use tokio::io::AsyncWriteExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netaccess::NetError> {
//!     let manager = NetworkAccessManager::new(Arc::new(GaiResolver::new()));
//!     let mut session = manager.get_or_create_session("example.com", 80).await?;
//!     session.write_all(b"HEAD / HTTP/1.1\r\nHost: example.com\r\n\r\n").await?;
//!     // ... read the response ...
//!     manager.release(session);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and IO error mapping
//! - [`dns`] - Pluggable name resolution
//! - [`socket`] - Racing, sessions and the pooling manager

pub mod base;
pub mod dns;
pub mod socket;

pub use base::neterror::{NetError, NetErrorKind};
pub use socket::config::ConnectConfig;
pub use socket::pool::{Destination, ManagerState, NetworkAccessManager};
pub use socket::session::SocketSession;
