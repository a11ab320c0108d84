//! Async DNS resolver using hickory-dns.
//!
//! Fully async resolution with system DNS configuration auto-detection and
//! dual-stack (A + AAAA) lookups, so both families reach the racer.
//!
//! # Performance
//!
//! Unlike `GaiResolver`, this resolver doesn't spawn blocking tasks. Each
//! instance owns its own connection pool to the configured DNS servers;
//! clones share it.

use super::{Addrs, Name, Resolve, ResolvedAddress, Resolving};
use crate::base::neterror::NetError;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::{io, sync::Arc};

/// Async DNS resolver backed by hickory-dns.
///
/// # Example
///
/// ```rust,ignore
/// use netaccess::dns::{HickoryResolver, Name, Resolve};
///
/// let resolver = HickoryResolver::new();
/// let addrs = resolver.resolve(Name::new("example.com")).await?;
/// ```
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: Arc<TokioResolver>,
}

impl HickoryResolver {
    /// Creates a new `HickoryResolver`.
    ///
    /// Reads the system DNS configuration; if that fails, falls back to
    /// hickory's defaults.
    pub fn new() -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => {
                tracing::debug!("Using system DNS configuration");
                builder
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read system DNS config, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };

        // Both families, so the racer can interleave them
        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

        Self { resolver: Arc::new(builder.build()) }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver").finish_non_exhaustive()
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = Arc::clone(&self.resolver);
        Box::pin(async move {
            let domain = name.as_str();
            tracing::debug!(domain = %domain, "resolving via hickory-dns");

            let lookup = resolver.lookup_ip(domain).await.map_err(|e| {
                tracing::debug!(domain = %domain, error = %e, "hickory-dns lookup failed");
                NetError::host_not_found(
                    domain,
                    Some(io::Error::new(io::ErrorKind::NotFound, e.to_string())),
                )
            })?;

            let addrs: Vec<ResolvedAddress> = lookup.iter().map(ResolvedAddress::new).collect();

            tracing::debug!(domain = %domain, count = addrs.len(), "hickory-dns resolution complete");
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::neterror::NetErrorKind;

    #[tokio::test]
    async fn test_hickory_resolver_invalid_domain() {
        let resolver = HickoryResolver::new();
        let result = resolver
            .resolve(Name::new("this-domain-definitely-does-not-exist.invalid"))
            .await;

        let err = result.err().expect("Should have error");
        assert_eq!(err.kind(), NetErrorKind::HostNotFound);
        assert!(err.to_string().contains("this-domain-definitely-does-not-exist.invalid"));
    }

    #[tokio::test]
    async fn test_hickory_resolver_instances_are_independent() {
        let r1 = HickoryResolver::new();
        let r2 = HickoryResolver::new();
        assert!(!Arc::ptr_eq(&r1.resolver, &r2.resolver));

        let r3 = r1.clone();
        assert!(Arc::ptr_eq(&r1.resolver, &r3.resolver));
    }
}
