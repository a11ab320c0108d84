//! DNS Resolution Module
//!
//! Provides pluggable name resolution for the connection racer:
//! - System resolver (getaddrinfo via thread pool)
//! - Async hickory-dns resolver
//! - Hostname-to-IP override mechanism
//!
//! # Architecture
//!
//! The `Resolve` trait is the core abstraction. A resolver is always passed
//! to the `NetworkAccessManager` at construction; swapping in a fixed-answer
//! fake makes racing tests deterministic and network-free.
//!
//! # Example
//!
//! ```rust,ignore
//! use netaccess::dns::{GaiResolver, Name, Resolve};
//!
//! let resolver = GaiResolver::new();
//! let addrs = resolver.resolve(Name::new("example.com")).await?;
//! for addr in addrs {
//!     println!("Resolved: {} ({})", addr, addr.family());
//! }
//! ```

mod gai;
mod hickory;
mod resolve;

pub use gai::GaiResolver;
pub use hickory::HickoryResolver;
pub use resolve::{
    AddressFamily, AddressSet, Addrs, DnsResolverWithOverrides, Name, Resolve, ResolvedAddress,
    Resolving,
};
