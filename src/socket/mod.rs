//! Socket and connection management.
//!
//! - [`pool`]: `NetworkAccessManager`, idle sessions keyed by destination
//! - [`racer`]: Happy Eyeballs connection racing
//! - [`connectjob`]: transport connectors and single connect attempts
//! - [`session`]: `SocketSession`, one owned connection
//! - [`stream`]: the `StreamSocket` abstraction
//! - [`config`]: tunables

pub mod config;
pub mod connectjob;
pub mod pool;
pub mod racer;
pub mod session;
pub mod stream;
