//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait and the address types that flow
//! from a resolver into the connection racer.

use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Address family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V6,
    V4,
}

impl AddressFamily {
    /// The other family.
    pub fn other(self) -> Self {
        match self {
            AddressFamily::V6 => AddressFamily::V4,
            AddressFamily::V4 => AddressFamily::V6,
        }
    }

    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V6 => f.write_str("ipv6"),
            AddressFamily::V4 => f.write_str("ipv4"),
        }
    }
}

/// One resolved IP address plus its family tag. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    ip: IpAddr,
    family: AddressFamily,
}

impl ResolvedAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip, family: AddressFamily::of(&ip) }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Socket address for `port`.
    pub fn with_port(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.ip, port)
    }
}

impl From<IpAddr> for ResolvedAddress {
    fn from(ip: IpAddr) -> Self {
        ResolvedAddress::new(ip)
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ip, f)
    }
}

/// Resolver output for one hostname, partitioned by family.
///
/// Each partition preserves the order in which the resolver returned its
/// addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    v6: Vec<ResolvedAddress>,
    v4: Vec<ResolvedAddress>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addr: ResolvedAddress) {
        match addr.family() {
            AddressFamily::V6 => self.v6.push(addr),
            AddressFamily::V4 => self.v4.push(addr),
        }
    }

    /// Parses `host` as an IP literal (V6 may be bracketed).
    ///
    /// Returns `None` if the host is a name that needs DNS resolution.
    pub fn from_literal(host: &str) -> Option<Self> {
        let bare = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
        let ip = bare.parse::<IpAddr>().ok()?;
        Some(std::iter::once(ResolvedAddress::new(ip)).collect())
    }

    pub fn v6(&self) -> &[ResolvedAddress] {
        &self.v6
    }

    pub fn v4(&self) -> &[ResolvedAddress] {
        &self.v4
    }

    /// Addresses of one family, in resolver order.
    pub fn family(&self, family: AddressFamily) -> &[ResolvedAddress] {
        match family {
            AddressFamily::V6 => &self.v6,
            AddressFamily::V4 => &self.v4,
        }
    }

    pub fn len(&self) -> usize {
        self.v6.len() + self.v4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v6.is_empty() && self.v4.is_empty()
    }
}

impl FromIterator<ResolvedAddress> for AddressSet {
    fn from_iter<I: IntoIterator<Item = ResolvedAddress>>(iter: I) -> Self {
        let mut set = AddressSet::new();
        for addr in iter {
            set.push(addr);
        }
        set
    }
}

/// Alias for an `Iterator` trait object over resolved addresses.
pub type Addrs = Box<dyn Iterator<Item = ResolvedAddress> + Send>;

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, NetError>> + Send>>;

/// Trait for DNS resolution.
///
/// Implementations must be thread-safe. A resolver is always handed to the
/// [`NetworkAccessManager`](crate::socket::pool::NetworkAccessManager)
/// explicitly; there is no process-wide default instance.
///
/// # Design Notes
///
/// - Uses `&self` for concurrent resolution without mutable access.
/// - Returns boxed futures for trait object compatibility.
/// - An empty answer is allowed here; callers treat it as `HostNotFound`.
pub trait Resolve: Send + Sync {
    /// Resolves a domain name to IP addresses, in preference order.
    fn resolve(&self, name: Name) -> Resolving;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name) -> Resolving {
        (**self).resolve(name)
    }
}

/// DNS resolver wrapper that supports hostname overrides.
///
/// This resolver first checks a map of hostname-to-address overrides before
/// falling back to the underlying resolver. Useful for:
/// - Testing without real DNS
/// - Forcing specific IPs for certain domains
/// - Local development with custom hostnames
///
/// # Example
///
/// ```rust,ignore
/// use netaccess::dns::{DnsResolverWithOverrides, GaiResolver};
/// use std::collections::HashMap;
///
/// let mut overrides = HashMap::new();
/// overrides.insert("api.local".into(), vec!["127.0.0.1".parse().unwrap()]);
///
/// let resolver = DnsResolverWithOverrides::new(Arc::new(GaiResolver::new()), overrides);
/// ```
pub struct DnsResolverWithOverrides {
    inner: Arc<dyn Resolve>,
    overrides: Arc<HashMap<Cow<'static, str>, Vec<IpAddr>>>,
}

impl DnsResolverWithOverrides {
    /// Creates a new resolver with the given overrides.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fallback resolver for non-overridden hostnames.
    /// * `overrides` - Map of hostnames to their addresses.
    pub fn new(inner: Arc<dyn Resolve>, overrides: HashMap<Cow<'static, str>, Vec<IpAddr>>) -> Self {
        Self { inner, overrides: Arc::new(overrides) }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name) -> Resolving {
        if let Some(ips) = self.overrides.get(name.as_str()) {
            tracing::trace!(domain = %name, "answering from override table");
            let addrs: Addrs = Box::new(ips.clone().into_iter().map(ResolvedAddress::new));
            return Box::pin(std::future::ready(Ok(addrs)));
        }
        self.inner.resolve(name)
    }
}

impl fmt::Debug for DnsResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_name_from_str() {
        let name = Name::from("example.com");
        assert_eq!(name.as_str(), "example.com");
        assert_eq!(name.to_string(), "example.com");
    }

    #[test]
    fn test_name_equality() {
        assert_eq!(Name::new("example.com"), Name::new("example.com"));
        assert_ne!(Name::new("example.com"), Name::new("other.com"));
    }

    #[test]
    fn test_address_set_partitions_in_order() {
        let set: AddressSet = [
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
            "2001:db8::1".parse().unwrap(),
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 6)),
            "2001:db8::2".parse().unwrap(),
        ]
        .into_iter()
        .map(ResolvedAddress::new)
        .collect();

        assert_eq!(set.len(), 4);
        let v4: Vec<_> = set.v4().iter().map(|a| a.ip().to_string()).collect();
        let v6: Vec<_> = set.v6().iter().map(|a| a.ip().to_string()).collect();
        assert_eq!(v4, ["203.0.113.5", "203.0.113.6"]);
        assert_eq!(v6, ["2001:db8::1", "2001:db8::2"]);
    }

    #[test]
    fn test_from_literal() {
        let v4 = AddressSet::from_literal("127.0.0.1").unwrap();
        assert_eq!(v4.v4().len(), 1);
        assert!(v4.v6().is_empty());

        let v6 = AddressSet::from_literal("[::1]").unwrap();
        assert_eq!(v6.v6()[0].ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));

        assert!(AddressSet::from_literal("example.com").is_none());
    }

    #[test]
    fn test_family_other() {
        assert_eq!(AddressFamily::V6.other(), AddressFamily::V4);
        assert_eq!(AddressFamily::V4.other(), AddressFamily::V6);
    }

    struct MockResolver {
        response: Vec<IpAddr>,
    }

    impl Resolve for MockResolver {
        fn resolve(&self, _name: Name) -> Resolving {
            let ips = self.response.clone();
            Box::pin(async move { Ok(Box::new(ips.into_iter().map(ResolvedAddress::new)) as Addrs) })
        }
    }

    #[tokio::test]
    async fn test_override_resolver_hit() {
        let mock = Arc::new(MockResolver { response: vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))] });

        let mut overrides = HashMap::new();
        overrides.insert(Cow::Borrowed("override.local"), vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);

        let resolver = DnsResolverWithOverrides::new(mock, overrides);
        let addrs: Vec<_> = resolver.resolve(Name::new("override.local")).await.unwrap().collect();

        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_override_resolver_miss() {
        let mock = Arc::new(MockResolver { response: vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))] });
        let resolver = DnsResolverWithOverrides::new(mock, HashMap::new());

        let addrs: Vec<_> = resolver.resolve(Name::new("not-overridden.com")).await.unwrap().collect();

        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
