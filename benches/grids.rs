//! Run these benches with `cargo bench --bench grids -- --verbose`
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array2, Array3};
use tornado_figures::{
    cross_section::GridLocator, divergence, gaussian_filter, interpolate_to_height,
    vertical_cross_section,
};

fn build_tester() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(std::time::Duration::from_secs(10))
        .noise_threshold(0.03)
        .significance_level(0.01)
}

criterion_main!(grid_benches);

criterion_group!(
    name = grid_benches;
    config = build_tester();
    targets = gaussian_filter_bench, divergence_bench, interpolate_to_height_bench,
              cross_section_bench
);

/// About the size of the ERA5 South China subset at 0.25 degrees.
const NY: usize = 161;
const NX: usize = 281;

/// About the size of an inner WRF domain.
const NZ: usize = 40;
const WRF_NY: usize = 150;
const WRF_NX: usize = 150;

fn heights() -> Array2<f64> {
    Array2::from_shape_fn((NY, NX), |(j, i)| {
        5800.0 + 60.0 * (j as f64 * 0.05).sin() * (i as f64 * 0.03).cos() + 0.5 * j as f64
    })
}

fn wrf_fields() -> (Array3<f64>, Array3<f64>) {
    let z = Array3::from_shape_fn((NZ, WRF_NY, WRF_NX), |(k, j, i)| {
        250.0 * k as f64 + 0.3 * j as f64 + 0.2 * i as f64
    });
    let speed = z.mapv(|z| 5.0 + z / 800.0);
    (speed, z)
}

fn wrf_locator() -> GridLocator {
    GridLocator::RegularLatLon {
        latitude: (0..WRF_NY).map(|j| 23.0 + 0.005 * j as f64).collect(),
        longitude: (0..WRF_NX).map(|i| 113.2 + 0.006 * i as f64).collect(),
    }
}

fn gaussian_filter_bench(c: &mut Criterion) {
    let field = heights();

    c.bench_function("gaussian_filter_sigma_2", |b| {
        b.iter(|| {
            let _x = gaussian_filter(&field, 2.0);
        });
    });

    c.bench_function("gaussian_filter_sigma_5", |b| {
        b.iter(|| {
            let _x = gaussian_filter(&field, 5.0);
        });
    });
}

fn divergence_bench(c: &mut Criterion) {
    let u = heights().mapv(|z| z / 50.0);
    let v = heights().mapv(|z| -z / 70.0);
    let lat: Vec<f64> = (0..NY).map(|j| 60.0 - 0.25 * j as f64).collect();
    let lon: Vec<f64> = (0..NX).map(|i| 70.0 + 0.25 * i as f64).collect();

    c.bench_function("divergence", |b| {
        b.iter(|| {
            let _x = divergence(&u, &v, &lat, &lon).expect("oops");
        });
    });
}

fn interpolate_to_height_bench(c: &mut Criterion) {
    let (speed, z) = wrf_fields();

    c.bench_function("interpolate_to_height", |b| {
        b.iter(|| {
            let _x = interpolate_to_height(&speed, &z, 1000.0).expect("oops");
        });
    });
}

fn cross_section_bench(c: &mut Criterion) {
    let (speed, z) = wrf_fields();
    let locator = wrf_locator();

    c.bench_function("vertical_cross_section", |b| {
        b.iter(|| {
            let _x = vertical_cross_section(
                &speed,
                &z,
                &locator,
                (23.2, 113.45),
                (23.6, 114.0),
                None,
            )
            .expect("oops");
        });
    });
}
