use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skymap_tools::healpix;
use skymap_tools::render::{render_mollview, MollviewParams};
use skymap_tools::test_fixtures::sample_sky;

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("mollview");
    group.sample_size(20);

    let map = sample_sky(64);
    for width in [400u32, 800, 1600] {
        let params = MollviewParams {
            width,
            ..MollviewParams::default()
        };
        // Pixels in the projected image
        group.throughput(Throughput::Elements(u64::from(width) * u64::from(width / 2)));

        group.bench_with_input(BenchmarkId::new("render", width), &params, |b, params| {
            b.iter(|| {
                let rendered = render_mollview(black_box(&map), black_box(params)).unwrap();
                black_box(rendered.image.len());
            });
        });
    }

    group.finish();
}

fn benchmark_ang2pix(c: &mut Criterion) {
    let mut group = c.benchmark_group("ang2pix");

    let directions: Vec<(f64, f64)> = (0..10_000)
        .map(|i| {
            let t = i as f64 / 10_000.0;
            (t * std::f64::consts::PI, t * 37.0 * std::f64::consts::TAU)
        })
        .collect();
    group.throughput(Throughput::Elements(directions.len() as u64));

    for nside in [64u32, 1024] {
        group.bench_with_input(BenchmarkId::new("ring", nside), &nside, |b, &nside| {
            b.iter(|| {
                for &(theta, phi) in &directions {
                    black_box(healpix::ang2pix_ring(nside, theta, phi));
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("nest", nside), &nside, |b, &nside| {
            b.iter(|| {
                for &(theta, phi) in &directions {
                    black_box(healpix::ang2pix_nest(nside, theta, phi));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_render, benchmark_ang2pix);
criterion_main!(benches);
