use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use sigmon::location::{best_of, Fix, FuserConfig};
use sigmon::observation::Provider;
use sigmon::reading::{AppCounters, CounterSnapshot, InterfaceCounters, RawReading, TcpCounters};
use sigmon::{listener_fn, EventKind, ManualClock, Monitor, Options, Sample};

fn snapshot(tick: i64, apps: u32) -> CounterSnapshot {
    CounterSnapshot {
        mobile: InterfaceCounters::bytes(tick * 2048, tick * 512),
        total: InterfaceCounters::bytes(tick * 4096, tick * 1024),
        tcp: TcpCounters {
            rx_bytes: tick * 1000,
            tx_bytes: tick * 300,
            rx_segments: tick * 10,
            tx_segments: tick * 3,
        },
        apps: (0..apps)
            .map(|uid| AppCounters {
                uid: 10_000 + uid,
                rx_bytes: tick * i64::from(uid + 1),
                tx_bytes: tick,
                rx_packets: tick,
                tx_packets: tick,
            })
            .collect(),
    }
}

fn traffic_monitor() -> (Monitor, Arc<AtomicU64>) {
    let monitor = Monitor::builder()
        .with_standard_processors()
        .clock(Arc::new(ManualClock::new(0)))
        .build();
    monitor
        .activate_mask(EventKind::TRAFFIC, &Options::new())
        .expect("activation without sources");
    let received = Arc::new(AtomicU64::new(0));
    for kind in EventKind::from_mask(EventKind::TRAFFIC) {
        let received = Arc::clone(&received);
        monitor
            .subscribe(
                kind,
                listener_fn(move |_| {
                    received.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }),
            )
            .expect("traffic slot");
    }
    (monitor, received)
}

fn bench_interface_tick(c: &mut Criterion) {
    let (monitor, _received) = traffic_monitor();
    let mut tick = 0;
    c.bench_function("pipeline/traffic_mobile_tick", |b| {
        b.iter(|| {
            tick += 1;
            let reading = RawReading::Counters(snapshot(tick, 0));
            let outcome = monitor.on_raw_reading(EventKind::TrafficMobile, reading);
            black_box(outcome)
        });
    });
}

fn bench_app_tick(c: &mut Criterion) {
    let (monitor, _received) = traffic_monitor();
    let mut group = c.benchmark_group("pipeline/traffic_application");
    group.throughput(Throughput::Elements(64));
    let mut tick = 0;
    group.bench_function("64_apps", |b| {
        b.iter(|| {
            tick += 1;
            let reading = RawReading::Counters(snapshot(tick, 64));
            let outcome = monitor.on_raw_reading(EventKind::TrafficApplication, reading);
            black_box(outcome)
        });
    });
    group.finish();
}

fn bench_fix_selection(c: &mut Criterion) {
    let config = FuserConfig::default();
    let incumbent = Fix {
        latitude: 0.0,
        longitude: 0.0,
        bearing: 0.0,
        speed: 0.0,
        altitude: 0.0,
        provider: Provider::Gps,
        accuracy: 12.0,
        time_ms: 1_000,
    };
    let candidate = Fix {
        provider: Provider::Network,
        accuracy: 350.0,
        time_ms: 40_000,
        ..incumbent.clone()
    };
    c.bench_function("pipeline/best_of", |b| {
        b.iter(|| {
            black_box(best_of(
                black_box(Some(&candidate)),
                black_box(Some(&incumbent)),
                &config,
            ))
        });
    });
}

fn bench_sample_update(c: &mut Criterion) {
    c.bench_function("pipeline/sample_update_1k", |b| {
        b.iter(|| {
            let mut sample = Sample::new();
            for i in 0..1_000 {
                sample.update(f64::from(i % 40) - 113.0);
            }
            black_box(sample.kurtosis())
        });
    });
}

criterion_group!(
    benches,
    bench_interface_tick,
    bench_app_tick,
    bench_fix_selection,
    bench_sample_update
);
criterion_main!(benches);
