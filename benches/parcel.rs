//! Run these benches with `cargo bench --bench parcel -- --verbose`

use criterion::{criterion_group, criterion_main, Criterion};
use metfor::HectoPascal;

mod utils;

fn build_tester() -> Criterion {
    Criterion::default()
        .sample_size(200)
        .measurement_time(std::time::Duration::from_secs(10))
        .noise_threshold(0.03)
        .significance_level(0.01)
}

criterion_main!(parcel_benches);

criterion_group!(
    name = parcel_benches;
    config = build_tester();
    targets = mixed_layer_parcel_bench, most_unstable_parcel_bench, lift_parcel_bench,
              parcel_temperature_profile_bench, sounding_analysis_bench
);

fn mixed_layer_parcel_bench(c: &mut Criterion) {
    let snds = utils::load_all_test_soundings();

    c.bench_function("mixed_layer_parcel", |b| {
        b.iter(|| {
            for snd in &snds {
                let _x = tornado_figures::mixed_layer_parcel(&snd, HectoPascal(50.0)).expect("oops");
            }
        });
    });
}

// No bench for surface_parcel because it is so simple.

fn most_unstable_parcel_bench(c: &mut Criterion) {
    let snds = utils::load_all_test_soundings();

    c.bench_function("most_unstable_parcel", |b| {
        b.iter(|| {
            for snd in &snds {
                let _x =
                    tornado_figures::most_unstable_parcel(&snd, HectoPascal(300.0)).expect("oops");
            }
        });
    });
}

fn lift_parcel_bench(c: &mut Criterion) {
    let snds = utils::load_all_test_soundings();
    let pairs: Vec<_> = snds
        .iter()
        .map(|snd| (snd, tornado_figures::surface_parcel(snd).expect("oops")))
        .collect();

    c.bench_function("lift_parcel", |b| {
        b.iter(|| {
            for (snd, pcl) in &pairs {
                let _x = tornado_figures::lift_parcel(*pcl, snd).expect("oops");
            }
        });
    });
}

fn parcel_temperature_profile_bench(c: &mut Criterion) {
    let snds = utils::load_all_test_soundings();

    c.bench_function("parcel_temperature_profile", |b| {
        b.iter(|| {
            for snd in &snds {
                let _x = tornado_figures::parcel_temperature_profile(&snd).expect("oops");
            }
        });
    });
}

fn sounding_analysis_bench(c: &mut Criterion) {
    let snds = utils::load_all_test_soundings();

    c.bench_function("sounding_analysis", |b| {
        b.iter(|| {
            for snd in &snds {
                let _x = tornado_figures::SoundingAnalysis::analyze(&snd);
            }
        });
    });
}
