//! Benchmarks for the event batcher and hub fan-out
//!
//! Run with: cargo bench

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mirror_map::{Batcher, ChannelConsumer, GeoEvent, Hub, HubConfig, Project, ProjectCatalog};
use std::net::IpAddr;

fn create_test_events(count: usize) -> Vec<GeoEvent> {
    let distros = ["ubuntu", "debian", "arch", "unknown"];
    (0..count)
        .map(|i| {
            let ip = IpAddr::from([10, (i >> 16) as u8, (i >> 8) as u8, i as u8]);
            let lat = (i % 180) as f64 - 89.5;
            let lon = (i % 360) as f64 - 179.5;
            GeoEvent::located(ip, distros[i % distros.len()], lat, lon)
        })
        .collect()
}

fn bench_batcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("batcher");
    let catalog = ProjectCatalog::new(vec![
        Project::new("ubuntu", 1),
        Project::new("debian", 2),
        Project::new("arch", 3),
    ])
    .unwrap();

    for size in [1_000, 10_000] {
        let events = create_test_events(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("push_{}", size), |b| {
            b.iter(|| {
                let mut batcher = Batcher::new(catalog.subscribe());
                for event in &events {
                    black_box(batcher.push(event));
                }
                batcher.stats()
            })
        });
    }

    group.finish();
}

fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("hub");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for viewers in [10, 1_000] {
        group.throughput(Throughput::Elements(viewers as u64));

        group.bench_function(format!("broadcast_{}", viewers), |b| {
            let (hub, mut receivers) = runtime.block_on(async {
                let hub = Hub::spawn(HubConfig::default());
                let mut receivers = Vec::new();
                for _ in 0..viewers {
                    let (consumer, rx) = ChannelConsumer::new("bench", 1);
                    hub.register(consumer).await.unwrap();
                    receivers.push(rx);
                }
                (hub, receivers)
            });
            let frame = Bytes::from(vec![0u8; 40]);

            b.iter(|| {
                let count = runtime.block_on(async {
                    hub.broadcast(black_box(frame.clone())).await.unwrap();
                    hub.count().await.unwrap()
                });
                for rx in receivers.iter_mut() {
                    black_box(rx.try_recv().ok());
                }
                count
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batcher, bench_fanout);
criterion_main!(benches);
