use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use yarrow_core::Yaml;

const SETTINGS_YAML: &str = include_str!("settings.yaml");
const RECORDS_YAML: &str = include_str!("records.yaml");

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("round-trip");
    group
        .sample_size(30)
        .throughput(Throughput::Bytes(SETTINGS_YAML.len() as u64));
    group.bench_function("noop", |b| b.iter(noop));
    group.bench_function("load-settings", |b| {
        b.iter(|| {
            let mut yaml = Yaml::new();
            let data = yaml.load(SETTINGS_YAML).unwrap();
            assert!(data.root().is_some());
        })
    });
    group.bench_function("dump-settings", |b| {
        let mut yaml = Yaml::new();
        let data = yaml.load(SETTINGS_YAML).unwrap();
        let mut buff = String::with_capacity(SETTINGS_YAML.len());
        b.iter(|| {
            buff.clear();
            yaml.dump_to(&data, &mut buff).unwrap();
            assert!(!buff.is_empty());
        })
    });

    group.throughput(Throughput::Bytes(RECORDS_YAML.len() as u64));
    group.bench_function("load-records", |b| {
        b.iter(|| {
            let mut yaml = Yaml::new();
            let data = yaml.load(RECORDS_YAML).unwrap();
            assert!(data.root().is_some());
        })
    });
    group.finish();
}

fn noop() {}

criterion_group!(benches, bench);
criterion_main!(benches);
