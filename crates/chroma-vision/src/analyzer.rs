//! 프레임 색상 분석.
//!
//! BGR 프레임 하나를 받아 H/S/V 히스토그램, 색상환 분포, 난색/한색 비율,
//! 상위 색상, 산점도 샘플을 계산한다. 부수 효과 없음.
//!
//! 처리 순서 (진행률 마일스톤):
//! 1. 15%: 긴 변 축소 + HSV 변환
//! 2. 30%: 색상 분포 집계 (히스토그램, 색상환, 비율, 표준편차)
//! 3. 45%: 산점도 샘플링
//! 4. 65%: 상위 색상 계산
//! 5. 85%: 결과 정리
//!
//! 각 마일스톤 보고 직후 취소 여부를 확인하고, 취소되면 부분 결과 없이 `Ok(None)`.

use std::time::Instant;

use chroma_core::config::{AnalysisConfig, ViewNeeds, TOP_COLORS_COUNT};
use chroma_core::error::{AnalysisFailure, CoreError};
use chroma_core::models::analysis::{
    AnalysisResult, HsvSpread, PreviewFrame, ScatterSample, TopColor, HUE_BINS, SV_BINS,
};
use chroma_core::models::frame::{PixelData, RawFrame, CHANNELS};
use chroma_core::ports::progress::{CancelCheck, NeverCancel, NoProgress, ProgressReporter};
use chrono::Utc;
use rand::Rng;
use tracing::debug;

use crate::color::{bgr8_to_hsv, normalize_to_unit, unit_bgr_to_hsv, unit_to_u8, HsvPlanes};
use crate::resize::resize_long_edge;

/// 색상 구간 폭 (8비트 hue 단위, 20°)
const SEGMENT_WIDTH: u8 = 10;

/// 색상 구간 수
pub const SEGMENT_COUNT: usize = HUE_BINS / SEGMENT_WIDTH as usize;

/// 색상환 평활화 커널 (합 9)
const WHEEL_KERNEL: [f64; 5] = [1.0, 2.0, 3.0, 2.0, 1.0];

/// 분석 옵션: 사이클마다 설정 스냅샷에서 만든다
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// 산점도 샘플 수
    pub sample_points: usize,
    /// 색상환 포함 최소 채도
    pub wheel_saturation_threshold: u8,
    /// 분석 해상도 긴 변 상한 (0 = 제한 없음)
    pub max_analysis_dim: u32,
    /// 계산할 뷰
    pub views: ViewNeeds,
    /// false면 미리보기와 비율만 계산 (그래프 갱신 생략)
    pub full_update: bool,
}

impl AnalysisOptions {
    /// 설정 스냅샷에서 생성
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            sample_points: config.sample_points,
            wheel_saturation_threshold: config.wheel_saturation_threshold,
            max_analysis_dim: config.max_analysis_dim,
            views: config.views,
            full_update: true,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// 분석 해상도로 준비된 프레임
struct PreparedFrame {
    width: u32,
    height: u32,
    bgr8: Vec<u8>,
    hsv: HsvPlanes,
}

/// 색상 분포 집계 결과
#[derive(Debug, Clone)]
pub struct HueStats {
    /// 색상 히스토그램 (채도 0 제외)
    pub hue_hist: Vec<u64>,
    /// 채도 히스토그램
    pub sat_hist: Vec<u64>,
    /// 명도 히스토그램
    pub val_hist: Vec<u64>,
    /// 평활화 전 색상환 분포
    pub wheel_raw: Vec<u64>,
    /// 색상환 포함 픽셀 수
    pub wheel_count: u64,
}

/// 프레임 분석기
#[derive(Debug, Clone, Default)]
pub struct FrameAnalyzer {
    options: AnalysisOptions,
}

impl FrameAnalyzer {
    /// 새 분석기
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    /// 현재 옵션
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// 진행률/취소 없이 분석
    pub fn analyze(&self, frame: &RawFrame) -> Result<AnalysisResult, CoreError> {
        let result = self.analyze_with(frame, &NoProgress, &NeverCancel)?;
        result.ok_or_else(|| CoreError::Internal("취소되지 않은 분석이 결과를 내지 않음".to_string()))
    }

    /// 진행률 보고와 취소 확인을 포함한 분석
    pub fn analyze_with(
        &self,
        frame: &RawFrame,
        progress: &dyn ProgressReporter,
        cancel: &dyn CancelCheck,
    ) -> Result<Option<AnalysisResult>, CoreError> {
        self.analyze_with_rng(frame, progress, cancel, &mut rand::rng())
    }

    /// 난수 생성기를 주입하는 분석 (결정적 테스트용)
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &self,
        frame: &RawFrame,
        progress: &dyn ProgressReporter,
        cancel: &dyn CancelCheck,
        rng: &mut R,
    ) -> Result<Option<AnalysisResult>, CoreError> {
        if frame.is_empty() {
            return Err(AnalysisFailure::EmptyFrame.into());
        }
        let started = Instant::now();
        let opts = &self.options;
        let full = opts.full_update;

        let milestone = |percent: u8, message: &str| -> bool {
            progress.report(percent, message);
            !cancel.is_canceled()
        };

        if !milestone(15, "HSV 변환 중…") {
            return Ok(None);
        }
        let prepared = prepare_frame(frame, opts.max_analysis_dim)?;

        if !milestone(30, "색상 분포 집계 중…") {
            return Ok(None);
        }
        let stats = hue_stats(&prepared.hsv, opts.wheel_saturation_threshold);
        let (warm_ratio, cool_ratio, other_ratio) = warm_cool_ratios(&stats.wheel_raw);
        let hsv_spread = hsv_spread(&prepared.hsv);

        if !milestone(45, "산점도 샘플링 중…") {
            return Ok(None);
        }
        let scatter = (full && opts.views.scatter)
            .then(|| scatter_sample(&prepared.hsv, &prepared.bgr8, opts.sample_points, rng));

        if !milestone(65, "상위 색상 계산 중…") {
            return Ok(None);
        }
        let top_colors = if full && opts.views.top_colors {
            top_colors(
                &prepared.hsv,
                &prepared.bgr8,
                opts.wheel_saturation_threshold,
                TOP_COLORS_COUNT,
            )
        } else {
            Vec::new()
        };

        if !milestone(85, "결과 정리 중…") {
            return Ok(None);
        }
        let with_hist = full && opts.views.histograms;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "프레임 분석 완료: {}x{} → {}x{}, 색상환 {}px, {:.1}ms",
            frame.width, frame.height, prepared.width, prepared.height, stats.wheel_count, elapsed_ms
        );

        Ok(Some(AnalysisResult {
            wheel_histogram: (full && opts.views.wheel).then(|| smooth_wheel(&stats.wheel_raw)),
            hue_hist: with_hist.then(|| stats.hue_hist.clone()),
            sat_hist: with_hist.then(|| stats.sat_hist.clone()),
            val_hist: with_hist.then(|| stats.val_hist.clone()),
            scatter,
            top_colors,
            wheel_pixel_count: stats.wheel_count,
            warm_ratio,
            cool_ratio,
            other_ratio,
            hsv_spread,
            capture_rect: frame.capture_rect,
            elapsed_ms,
            is_full_update: full,
            captured_at: Utc::now(),
            preview_frame: opts.views.preview.then(|| PreviewFrame {
                width: prepared.width,
                height: prepared.height,
                bgr: prepared.bgr8,
            }),
        }))
    }
}

/// 축소 후 HSV 변환. 8비트가 아니면 정규화를 거친다
fn prepare_frame(frame: &RawFrame, max_dim: u32) -> Result<PreparedFrame, CoreError> {
    let small = resize_long_edge(frame, max_dim)?;
    let (width, height) = (small.width, small.height);

    let (bgr8, hsv) = match &small.pixels {
        PixelData::U8(bgr) => (bgr.clone(), bgr8_to_hsv(bgr, width, height)),
        other => {
            let unit = normalize_to_unit(other);
            (unit_to_u8(&unit), unit_bgr_to_hsv(&unit, width, height))
        }
    };

    Ok(PreparedFrame {
        width,
        height,
        bgr8,
        hsv,
    })
}

/// 색상/채도/명도 히스토그램과 색상환 원본 분포
pub fn hue_stats(hsv: &HsvPlanes, wheel_threshold: u8) -> HueStats {
    let mut stats = HueStats {
        hue_hist: vec![0; HUE_BINS],
        sat_hist: vec![0; SV_BINS],
        val_hist: vec![0; SV_BINS],
        wheel_raw: vec![0; HUE_BINS],
        wheel_count: 0,
    };

    for ((&h, &s), &v) in hsv.h.iter().zip(&hsv.s).zip(&hsv.v) {
        let h = h as usize;
        if s > 0 {
            stats.hue_hist[h] += 1;
        }
        stats.sat_hist[s as usize] += 1;
        stats.val_hist[v as usize] += 1;
        if s >= wheel_threshold {
            stats.wheel_raw[h] += 1;
            stats.wheel_count += 1;
        }
    }
    stats
}

/// 색상환 원형 평활화 (커널 `[1,2,3,2,1]/9`, 0/179 경계에서 순환)
pub fn smooth_wheel(raw: &[u64]) -> Vec<f64> {
    let n = raw.len();
    if n == 0 {
        return Vec::new();
    }
    let norm: f64 = WHEEL_KERNEL.iter().sum();
    (0..n)
        .map(|i| {
            WHEEL_KERNEL
                .iter()
                .enumerate()
                .map(|(k, w)| w * raw[(i + n + k - 2) % n] as f64)
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// 난색/한색/기타 비율. 색상환 포함 픽셀이 없으면 모두 0
///
/// 난색: hue ∈ [0,30) ∪ [150,180), 한색: hue ∈ [75,135)
pub fn warm_cool_ratios(wheel_raw: &[u64]) -> (f64, f64, f64) {
    let total: u64 = wheel_raw.iter().sum();
    if total == 0 {
        return (0.0, 0.0, 0.0);
    }
    let mut warm = 0u64;
    let mut cool = 0u64;
    for (h, &count) in wheel_raw.iter().enumerate() {
        if !(30..150).contains(&h) {
            warm += count;
        } else if (75..135).contains(&h) {
            cool += count;
        }
    }
    let other = total.saturating_sub(warm + cool);
    let total = total as f64;
    (warm as f64 / total, cool as f64 / total, other as f64 / total)
}

/// H/S/V 평면 모표준편차
pub fn hsv_spread(hsv: &HsvPlanes) -> HsvSpread {
    fn std_dev(plane: &[u8]) -> f64 {
        if plane.is_empty() {
            return 0.0;
        }
        let n = plane.len() as f64;
        let mean = plane.iter().map(|&x| x as f64).sum::<f64>() / n;
        let var = plane
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        var.sqrt()
    }
    HsvSpread {
        h_std: std_dev(&hsv.h),
        s_std: std_dev(&hsv.s),
        v_std: std_dev(&hsv.v),
    }
}

/// 산점도 샘플. 픽셀 수가 `sample_points`보다 많으면 복원 추출
pub fn scatter_sample<R: Rng + ?Sized>(
    hsv: &HsvPlanes,
    bgr8: &[u8],
    sample_points: usize,
    rng: &mut R,
) -> ScatterSample {
    let n = hsv.len();
    let k = sample_points.max(1);

    let pick = |i: usize| -> ([u8; 3], [u8; 3]) {
        let px = &bgr8[i * CHANNELS..i * CHANNELS + CHANNELS];
        ([hsv.h[i], hsv.s[i], hsv.v[i]], [px[2], px[1], px[0]])
    };

    let (hsv_pts, rgb_pts): (Vec<_>, Vec<_>) = if n > k {
        (0..k).map(|_| pick(rng.random_range(0..n))).unzip()
    } else {
        (0..n).map(pick).unzip()
    };

    ScatterSample {
        hsv: hsv_pts,
        rgb: rgb_pts,
    }
}

/// 상위 색상 구간
///
/// 180 bin을 20° 폭 18개 구간으로 나누고, 색상환 포함 픽셀 수가 많은 순으로 최대 `limit`개.
/// 동률은 구간 인덱스 오름차순. 비율은 선택된 구간 합 기준, RGB는 구간 내 포함 픽셀 평균.
pub fn top_colors(hsv: &HsvPlanes, bgr8: &[u8], wheel_threshold: u8, limit: usize) -> Vec<TopColor> {
    let mut counts = [0u64; SEGMENT_COUNT];
    let mut sums = [[0u64; 3]; SEGMENT_COUNT];

    for (i, (&h, &s)) in hsv.h.iter().zip(&hsv.s).enumerate() {
        if s < wheel_threshold {
            continue;
        }
        let seg = (h / SEGMENT_WIDTH) as usize;
        let px = &bgr8[i * CHANNELS..i * CHANNELS + CHANNELS];
        counts[seg] += 1;
        sums[seg][0] += px[2] as u64;
        sums[seg][1] += px[1] as u64;
        sums[seg][2] += px[0] as u64;
    }

    let mut order: Vec<usize> = (0..SEGMENT_COUNT).filter(|&i| counts[i] > 0).collect();
    // 안정 정렬이므로 동률은 구간 순서 유지
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    order.truncate(limit);

    let top_sum: u64 = order.iter().map(|&i| counts[i]).sum();
    if top_sum == 0 {
        return Vec::new();
    }

    order
        .into_iter()
        .map(|seg| {
            let cnt = counts[seg];
            TopColor {
                ratio: cnt as f64 / top_sum as f64,
                rgb: [
                    (sums[seg][0] / cnt) as u8,
                    (sums[seg][1] / cnt) as u8,
                    (sums[seg][2] / cnt) as u8,
                ],
                segment: seg as u8,
            }
        })
        .collect()
}
