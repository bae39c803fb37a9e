//! Rotation Benchmarks
//!
//! Per-update cost of the spherical-harmonic rotation and of one graph
//! block through a ready renderer.

use af_core::AudioBuffer;
use af_graph::{AudioGraph, CaptureNode, SourceNode};
use af_spatial::{
    AmbisonicOrder, HoaRenderer, RendererConfig, ResourceLoader, ResourceRequest,
    SphericalHarmonicRotation, SpatialResult,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const ORDERS: [AmbisonicOrder; 3] = [
    AmbisonicOrder::First,
    AmbisonicOrder::Second,
    AmbisonicOrder::Third,
];

fn head_rotation(angle: f64) -> [f64; 9] {
    let (s, c) = angle.sin_cos();
    [c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0]
}

/// 256-tap decaying stereo HRIRs for every request
struct SyntheticLoader;

impl ResourceLoader for SyntheticLoader {
    async fn load(&self, _request: &ResourceRequest) -> SpatialResult<AudioBuffer> {
        let left = (0..256).map(|n| 0.97f64.powi(n)).collect();
        let right = (0..256).map(|n| 0.95f64.powi(n)).collect();
        Ok(AudioBuffer::from_channels(vec![left, right], 48000)?)
    }
}

fn bench_world_matrix_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("sh_rotation_update");

    for order in ORDERS {
        let mut rotation = SphericalHarmonicRotation::identity(order.as_usize());
        let mut angle = 0.0;

        group.bench_with_input(
            BenchmarkId::from_parameter(order.as_usize()),
            &order,
            |b, _| {
                b.iter(|| {
                    angle += 0.01;
                    rotation.set_world_matrix3(black_box(&head_rotation(angle)));
                    black_box(rotation.band(order.as_usize()).is_some())
                })
            },
        );
    }

    group.finish();
}

fn bench_render_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_block");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let block_size = 512;

    for order in ORDERS {
        let mut graph = AudioGraph::new(block_size, 48000.0).unwrap();
        let mut renderer =
            HoaRenderer::with_config(&mut graph, RendererConfig::for_order(order)).unwrap();
        runtime
            .block_on(renderer.initialize(&mut graph, &SyntheticLoader))
            .unwrap();

        let values = (0..order.channel_count()).map(|k| 0.1 * k as f64).collect();
        let source = graph.add_node(Box::new(SourceNode::constant(values)));
        let capture = graph.add_node(Box::new(CaptureNode::new(2)));
        graph.connect_channels(source, renderer.input()).unwrap();
        graph.connect_channels(renderer.output(), capture).unwrap();

        group.throughput(Throughput::Elements(block_size as u64));
        let mut angle = 0.0;
        group.bench_with_input(
            BenchmarkId::from_parameter(order.as_usize()),
            &order,
            |b, _| {
                b.iter(|| {
                    angle += 0.01;
                    renderer
                        .set_rotation_matrix3(&mut graph, &head_rotation(angle))
                        .unwrap();
                    graph.process();
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_world_matrix_update, bench_render_block);
criterion_main!(benches);
