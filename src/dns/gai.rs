//! System DNS resolver using getaddrinfo.
//!
//! This resolver uses the operating system's native DNS resolution via
//! `getaddrinfo`, executed in a thread pool to avoid blocking the async runtime.
//!
//! # When to Use
//!
//! - When you need to respect system DNS configuration (/etc/hosts, resolv.conf, etc.)
//! - As the default for a `NetworkAccessManager`

use super::{Addrs, Name, Resolve, ResolvedAddress, Resolving};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::ToSocketAddrs;

/// System DNS resolver using `getaddrinfo` in a thread pool.
///
/// This resolver wraps the standard library's `ToSocketAddrs` trait and
/// executes resolution in `tokio::task::spawn_blocking`. Duplicate
/// addresses (one per socket type in some libc answers) are collapsed,
/// keeping the first occurrence.
#[derive(Clone, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let host = name.as_str().to_string();
            let domain = host.clone();

            let result = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %host, "resolving via getaddrinfo");
                (host.as_str(), 0u16).to_socket_addrs().map(|iter| iter.collect::<Vec<_>>())
            })
            .await;

            // Handle task join error (cancellation, panic)
            let addrs = result
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    NetError::host_not_found(&domain, None)
                })?
                .dns_context(&domain)?;

            let mut unique: Vec<ResolvedAddress> = Vec::with_capacity(addrs.len());
            for addr in addrs {
                let resolved = ResolvedAddress::new(addr.ip());
                if !unique.contains(&resolved) {
                    unique.push(resolved);
                }
            }

            tracing::debug!(domain = %domain, count = unique.len(), "DNS resolution complete");
            Ok(Box::new(unique.into_iter()) as Addrs)
        })
    }
}
