use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use domain::{AggregateRoot, DomainEvent, Money, Order};

fn bench_create_order(c: &mut Criterion) {
    c.bench_function("domain/create_order", |b| {
        b.iter(|| Order::create("Bench Client").unwrap());
    });
}

fn bench_add_line(c: &mut Criterion) {
    c.bench_function("domain/add_line_new", |b| {
        b.iter_batched(
            || Order::create("Bench Client").unwrap(),
            |mut order| {
                order
                    .add_line("Widget", Money::from_cents(1000), 1)
                    .unwrap();
                order
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("domain/add_line_merge", |b| {
        let mut order = Order::create("Bench Client").unwrap();
        order.add_line("Widget", Money::from_cents(1000), 1).unwrap();
        b.iter(|| {
            order
                .add_line("Widget", Money::from_cents(1000), 1)
                .unwrap();
            order.take_events();
        });
    });
}

fn bench_full_lifecycle(c: &mut Criterion) {
    c.bench_function("domain/create_add_close", |b| {
        b.iter(|| {
            let mut order = Order::create("Bench Client").unwrap();
            for i in 0..10 {
                order
                    .add_line(&format!("Item {i}"), Money::from_cents(100 + i), 2)
                    .unwrap();
            }
            order.close().unwrap();
            order.take_events()
        });
    });
}

fn bench_event_payloads(c: &mut Criterion) {
    let mut order = Order::create("Bench Client").unwrap();
    for i in 0..10 {
        order
            .add_line(&format!("Item {i}"), Money::from_cents(100 + i), 2)
            .unwrap();
    }
    order.close().unwrap();
    let events = order.take_events();

    c.bench_function("domain/serialize_12_payloads", |b| {
        b.iter(|| {
            for event in &events {
                event.payload().unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_add_line,
    bench_full_lifecycle,
    bench_event_payloads
);
criterion_main!(benches);
