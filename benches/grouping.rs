use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cascade::{AllGrouping, Event, FieldGrouping, GroupingStrategy, RoundRobin};

const NUM_INSTANCES: usize = 16;

fn bench_round_robin(c: &mut Criterion) {
    let mut group = c.benchmark_group("GroupingStrategy::instance_for");
    group.throughput(Throughput::Elements(1));

    let event = Event::single("x", 1);

    group.bench_function(BenchmarkId::new("round_robin", NUM_INSTANCES), |b| {
        let mut strategy = RoundRobin::new();
        b.iter(|| strategy.instance_for(&event, NUM_INSTANCES));
    });

    group.bench_function(BenchmarkId::new("all_grouping", NUM_INSTANCES), |b| {
        let mut strategy = AllGrouping::new();
        b.iter(|| strategy.instance_for(&event, NUM_INSTANCES));
    });

    group.finish();
}

fn bench_field_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("GroupingStrategy::instance_for/field_grouping");
    group.throughput(Throughput::Elements(1));

    for num_keys in [4usize, 64, 1024] {
        let events: Vec<Event> = (0..num_keys)
            .map(|i| Event::single("account", format!("account-{i}")))
            .collect();

        group.bench_with_input(BenchmarkId::new("distinct_keys", num_keys), &events, |b, events| {
            let mut strategy = FieldGrouping::new(|e: &Event| {
                e.get_field("account").and_then(|v| v.as_str()).unwrap().to_string()
            });
            let mut i = 0;
            b.iter(|| {
                let event = &events[i % events.len()];
                i += 1;
                strategy.instance_for(event, NUM_INSTANCES)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_robin, bench_field_grouping);
criterion_main!(benches);
