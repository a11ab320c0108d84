use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netaccess::dns::{AddressFamily, AddressSet, GaiResolver, ResolvedAddress};
use netaccess::socket::connectjob::{Connect, Connecting};
use netaccess::socket::racer::AddressCursor;
use netaccess::socket::stream::BoxedSocket;
use netaccess::{Destination, NetworkAccessManager};
use std::net::SocketAddr;
use std::sync::Arc;

/// Connects instantly over an in-memory pipe.
struct PipeConnector;

impl Connect for PipeConnector {
    fn connect(&self, _addr: SocketAddr) -> Connecting {
        Box::pin(async {
            let (local, _remote) = tokio::io::duplex(64);
            Ok(BoxedSocket::new(local))
        })
    }
}

/// Pure in-memory bookkeeping: no network I/O.
fn benchmark_pool_operations(c: &mut Criterion) {
    c.bench_function("destination_new", |b| {
        b.iter(|| black_box(Destination::new(black_box("Example.COM"), 443)))
    });

    let addrs: AddressSet = (0..8u8)
        .flat_map(|i| {
            [
                ResolvedAddress::new(format!("2001:db8::{i}").parse().unwrap()),
                ResolvedAddress::new(format!("192.0.2.{i}").parse().unwrap()),
            ]
        })
        .collect();
    c.bench_function("address_cursor_16", |b| {
        b.iter(|| AddressCursor::new(black_box(&addrs), AddressFamily::V6).count())
    });

    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = NetworkAccessManager::builder(Arc::new(GaiResolver::new()))
        .connector(Arc::new(PipeConnector))
        .build();

    // Prime the pool so every iteration is a hit.
    let session = rt.block_on(manager.create_session("192.0.2.1", 80)).unwrap();
    manager.release(session);

    c.bench_function("pool_get_release_hit", |b| {
        b.iter(|| {
            let session = manager.get_session("192.0.2.1", 80).unwrap().unwrap();
            manager.release(black_box(session));
        })
    });

    c.bench_function("pool_get_miss", |b| {
        b.iter(|| black_box(manager.get_session("192.0.2.2", 80).unwrap()))
    });

    c.bench_function("pool_idle_session_count", |b| {
        b.iter(|| black_box(manager.idle_session_count()))
    });
}

criterion_group!(benches, benchmark_pool_operations);
criterion_main!(benches);
