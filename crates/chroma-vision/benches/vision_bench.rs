//! chroma-vision 성능 벤치마크
//!
//! 실행: cargo bench -p chroma-vision
//!
//! 벤치마크 대상:
//! - 프레임 분석 (FrameAnalyzer::analyze)
//! - 변화 감지 지표 (reduce_frame + change_metric)

use std::hint::black_box;

use chroma_core::models::frame::RawFrame;
use chroma_core::models::geometry::Rect;
use chroma_vision::analyzer::{AnalysisOptions, FrameAnalyzer};
use chroma_vision::change::{change_metric, reduce_frame};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// 테스트용 그라디언트 프레임 생성
fn create_test_frame(width: u32, height: u32, seed: u8) -> RawFrame {
    let mut bgr = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x as u8).wrapping_add(seed).wrapping_mul(17);
            let g = (y as u8).wrapping_add(seed).wrapping_mul(31);
            let b = (x as u8).wrapping_add(y as u8).wrapping_add(seed);
            bgr.extend_from_slice(&[b, g, r]);
        }
    }
    RawFrame::from_bgr8(width, height, bgr, Rect::new(0, 0, width, height))
        .expect("버퍼 길이 일치")
}

/// 분석 해상도별 프레임 분석 벤치마크
fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_frame");
    let frame = create_test_frame(1920, 1080, 42);
    group.throughput(Throughput::Elements(1920 * 1080));

    for max_dim in [400u32, 800, 1600] {
        let analyzer = FrameAnalyzer::new(AnalysisOptions {
            max_analysis_dim: max_dim,
            ..AnalysisOptions::default()
        });
        group.bench_with_input(
            BenchmarkId::new("full", format!("max_dim={max_dim}")),
            &frame,
            |b, frame| {
                b.iter(|| black_box(analyzer.analyze(frame)));
            },
        );
    }

    // 그래프 생략 사이클 (미리보기 + 비율만)
    let light = FrameAnalyzer::new(AnalysisOptions {
        full_update: false,
        ..AnalysisOptions::default()
    });
    group.bench_function("light", |b| {
        b.iter(|| black_box(light.analyze(&frame)));
    });

    group.finish();
}

/// 변화 감지 벤치마크
fn bench_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("change_detect");

    for (width, height) in [(640, 360), (1920, 1080), (3840, 2160)] {
        let prev = create_test_frame(width, height, 1);
        let curr = create_test_frame(width, height, 2);
        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_with_input(
            BenchmarkId::new("reduce_and_diff", format!("{width}x{height}")),
            &(&prev, &curr),
            |b, (prev, curr)| {
                b.iter(|| {
                    let (Ok(p), Ok(c)) = (reduce_frame(prev), reduce_frame(curr)) else {
                        return None;
                    };
                    black_box(change_metric(&p, &c))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_change);
criterion_main!(benches);
