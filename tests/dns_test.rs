//! DNS Module Tests
//!
//! Covers:
//! - `Name` struct
//! - `DnsResolverWithOverrides` using a MockResolver
//! - `GaiResolver` (Basic System Resolver)
//! - `AddressSet` family split

use netaccess::dns::{
    AddressFamily, AddressSet, Addrs, DnsResolverWithOverrides, GaiResolver, Name, Resolve,
    ResolvedAddress, Resolving,
};

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

struct MockResolver {
    response: Vec<IpAddr>,
}

impl Resolve for MockResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        let ips = self.response.clone();
        Box::pin(async move { Ok(Box::new(ips.into_iter().map(ResolvedAddress::new)) as Addrs) })
    }
}

#[test]
fn test_name_api() {
    let name = Name::new("example.com");
    assert_eq!(name.as_str(), "example.com");
    assert_eq!(name.to_string(), "example.com");
}

#[tokio::test]
async fn test_dns_overrides() {
    let mock = Arc::new(MockResolver { response: vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))] });

    let mut overrides = HashMap::new();
    overrides.insert(
        Cow::Borrowed("local.override"),
        vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)],
    );

    let resolver = DnsResolverWithOverrides::new(mock, overrides);
    assert_eq!(resolver.override_count(), 1);

    // Override hit
    let addrs: AddressSet = resolver.resolve(Name::new("local.override")).await.unwrap().collect();
    assert_eq!(addrs.len(), 2);
    assert_eq!(addrs.v4()[0].ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(addrs.v6()[0].ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));

    // Passthrough (miss)
    let addrs: Vec<_> = resolver.resolve(Name::new("other.com")).await.unwrap().collect();
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
    assert_eq!(addrs[0].family(), AddressFamily::V4);
}

#[test]
fn test_address_set_keeps_order_within_family() {
    let set: AddressSet = ["2001:db8::1", "192.0.2.1", "2001:db8::2", "192.0.2.2"]
        .iter()
        .map(|s| ResolvedAddress::new(s.parse().unwrap()))
        .collect();

    let v6: Vec<_> = set.v6().iter().map(|a| a.ip().to_string()).collect();
    let v4: Vec<_> = set.family(AddressFamily::V4).iter().map(|a| a.ip().to_string()).collect();
    assert_eq!(v6, ["2001:db8::1", "2001:db8::2"]);
    assert_eq!(v4, ["192.0.2.1", "192.0.2.2"]);
}

#[test]
fn test_address_set_from_literal() {
    let set = AddressSet::from_literal("[::1]").unwrap();
    assert_eq!(set.v6().len(), 1);
    assert!(AddressSet::from_literal("example.com").is_none());
}

#[tokio::test]
async fn test_gai_resolver_localhost() {
    let resolver = GaiResolver::new();
    // localhost should always resolve, usually to 127.0.0.1 or ::1
    let result = resolver.resolve(Name::new("localhost")).await;

    // Depending on system config, this might fail in some CI envs,
    // but usually localhost is standard.
    if let Ok(addrs) = result {
        let list: Vec<_> = addrs.collect();
        assert!(!list.is_empty());
        assert!(list.iter().all(|a| a.ip().is_loopback()));
    } else {
        println!("GaiResolver failed for localhost - possibly no network access");
    }
}
