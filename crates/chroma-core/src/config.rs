//! 애플리케이션 설정 구조체.
//!
//! 분석 주기, 변화 감지 임계값, 샘플 수, 필요한 뷰 플래그, 기본 캡처 영역 등
//! 런타임 설정을 정의한다. 파일 로드/저장은 [`crate::config_manager`] 담당.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 변화 감지 모드 폴링 간격
pub const CHANGE_POLL_INTERVAL: Duration = Duration::from_millis(80);

/// 변화 감지용 축소 프레임의 긴 변 (px)
pub const CHANGE_DETECT_DIM: u32 = 120;

/// 이미지 파일 분석 시 내부 긴 변 상한 (px)
pub const IMAGE_FILE_MAX_DIM: u32 = 3072;

/// 상위 색상 최대 개수
pub const TOP_COLORS_COUNT: usize = 5;

/// 최소 분석 주기 (ms)
pub const MIN_INTERVAL_MS: u64 = 50;

/// 산점도 샘플 수 범위
pub const SAMPLE_POINTS_RANGE: (usize, usize) = (500, 500_000);

/// 분석 해상도 범위 (0은 제한 없음)
pub const ANALYSIS_DIM_RANGE: (u32, u32) = (120, 4096);

/// 최소 변화 임계값
pub const MIN_DIFF_THRESHOLD: f32 = 0.5;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 분석 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 분석 설정
// ============================================================

/// 갱신 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// 고정 주기마다 분석
    #[default]
    Interval,
    /// 화면이 바뀐 뒤 안정되면 분석
    Change,
}

/// 소비자가 현재 표시 중인 뷰: 꺼진 뷰의 통계는 계산하지 않는다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNeeds {
    /// 미리보기 프레임
    #[serde(default = "default_true")]
    pub preview: bool,
    /// 색상환 분포
    #[serde(default = "default_true")]
    pub wheel: bool,
    /// H/S/V 히스토그램
    #[serde(default = "default_true")]
    pub histograms: bool,
    /// S-V 산점도
    #[serde(default = "default_true")]
    pub scatter: bool,
    /// 상위 색상
    #[serde(default = "default_true")]
    pub top_colors: bool,
}

impl ViewNeeds {
    /// 모든 뷰 활성
    pub fn all() -> Self {
        Self {
            preview: true,
            wheel: true,
            histograms: true,
            scatter: true,
            top_colors: true,
        }
    }

    /// 모든 뷰 비활성 (비율만 계산)
    pub fn none() -> Self {
        Self {
            preview: false,
            wheel: false,
            histograms: false,
            scatter: false,
            top_colors: false,
        }
    }
}

impl Default for ViewNeeds {
    fn default() -> Self {
        Self::all()
    }
}

/// 분석 설정: 루프가 매 사이클 시작 시 스냅샷으로 읽는다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// 갱신 모드
    #[serde(default)]
    pub update_mode: UpdateMode,
    /// 분석 주기 (ms). 변화 감지 모드에서는 발행 후 쿨다운으로 쓰인다
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 변화 판정 임계값
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f32,
    /// 발행 전 필요한 연속 안정 프레임 수
    #[serde(default = "default_stable_frames")]
    pub stable_frames: u32,
    /// 산점도 샘플 수
    #[serde(default = "default_sample_points")]
    pub sample_points: usize,
    /// 분석 해상도 긴 변 상한 (0 = 제한 없음)
    #[serde(default = "default_max_analysis_dim")]
    pub max_analysis_dim: u32,
    /// 색상환 포함 최소 채도 (0~255)
    #[serde(default = "default_wheel_saturation_threshold")]
    pub wheel_saturation_threshold: u8,
    /// 고정 주기 모드에서 그래프를 N 프레임마다 갱신
    #[serde(default = "default_graph_every")]
    pub graph_every: u32,
    /// 필요한 뷰
    #[serde(default)]
    pub views: ViewNeeds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::default(),
            interval_ms: default_interval_ms(),
            diff_threshold: default_diff_threshold(),
            stable_frames: default_stable_frames(),
            sample_points: default_sample_points(),
            max_analysis_dim: default_max_analysis_dim(),
            wheel_saturation_threshold: default_wheel_saturation_threshold(),
            graph_every: default_graph_every(),
            views: ViewNeeds::default(),
        }
    }
}

impl AnalysisConfig {
    /// 분석 주기
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 모든 필드를 허용 범위로 보정한 복제본
    pub fn sanitized(&self) -> Self {
        Self {
            update_mode: self.update_mode,
            interval_ms: clamp_interval_ms(self.interval_ms),
            diff_threshold: clamp_diff_threshold(self.diff_threshold),
            stable_frames: self.stable_frames.max(1),
            sample_points: clamp_sample_points(self.sample_points),
            max_analysis_dim: clamp_analysis_dim(self.max_analysis_dim),
            wheel_saturation_threshold: self.wheel_saturation_threshold,
            graph_every: self.graph_every.max(1),
            views: self.views,
        }
    }
}

/// 분석 주기 하한 적용
pub fn clamp_interval_ms(ms: u64) -> u64 {
    ms.max(MIN_INTERVAL_MS)
}

/// 변화 임계값 하한 적용 (NaN은 기본값)
pub fn clamp_diff_threshold(value: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_DIFF_THRESHOLD)
    } else {
        default_diff_threshold()
    }
}

/// 산점도 샘플 수 범위 적용
pub fn clamp_sample_points(n: usize) -> usize {
    n.clamp(SAMPLE_POINTS_RANGE.0, SAMPLE_POINTS_RANGE.1)
}

/// 분석 해상도 범위 적용 (0은 그대로)
pub fn clamp_analysis_dim(dim: u32) -> u32 {
    if dim == 0 {
        0
    } else {
        dim.clamp(ANALYSIS_DIM_RANGE.0, ANALYSIS_DIM_RANGE.1)
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_diff_threshold() -> f32 {
    4.0
}

fn default_stable_frames() -> u32 {
    3
}

fn default_sample_points() -> usize {
    30_000
}

fn default_max_analysis_dim() -> u32 {
    400
}

fn default_wheel_saturation_threshold() -> u8 {
    1
}

fn default_graph_every() -> u32 {
    1
}

// ============================================================
// 캡처 설정
// ============================================================

/// 캡처 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 영역 미지정 시 가상 화면 중앙에 잡는 기본 ROI 너비
    #[serde(default = "default_roi_width")]
    pub default_roi_width: u32,
    /// 기본 ROI 높이
    #[serde(default = "default_roi_height")]
    pub default_roi_height: u32,
    /// 창 목록 최대 개수
    #[serde(default = "default_window_list_limit")]
    pub window_list_limit: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_roi_width: default_roi_width(),
            default_roi_height: default_roi_height(),
            window_list_limit: default_window_list_limit(),
        }
    }
}

fn default_roi_width() -> u32 {
    640
}

fn default_roi_height() -> u32 {
    360
}

fn default_window_list_limit() -> usize {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default_config();
        assert_eq!(config.analysis.interval_ms, 2_000);
        assert_eq!(config.analysis.sample_points, 30_000);
        assert_eq!(config.analysis.max_analysis_dim, 400);
        assert_eq!(config.analysis.wheel_saturation_threshold, 1);
        assert_eq!(config.analysis.stable_frames, 3);
        assert_eq!(config.analysis.update_mode, UpdateMode::Interval);
        assert_eq!(config.capture.default_roi_width, 640);
        assert_eq!(config.capture.default_roi_height, 360);
        assert_eq!(config.capture.window_list_limit, 500);
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let raw = AnalysisConfig {
            interval_ms: 1,
            diff_threshold: 0.0,
            stable_frames: 0,
            sample_points: 10,
            max_analysis_dim: 50,
            graph_every: 0,
            ..AnalysisConfig::default()
        };
        let s = raw.sanitized();
        assert_eq!(s.interval_ms, MIN_INTERVAL_MS);
        assert_eq!(s.diff_threshold, MIN_DIFF_THRESHOLD);
        assert_eq!(s.stable_frames, 1);
        assert_eq!(s.sample_points, 500);
        assert_eq!(s.max_analysis_dim, 120);
        assert_eq!(s.graph_every, 1);
    }

    #[test]
    fn zero_analysis_dim_means_unlimited() {
        assert_eq!(clamp_analysis_dim(0), 0);
        assert_eq!(clamp_analysis_dim(10_000), 4096);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "analysis": { "update_mode": "change", "views": { "scatter": false } } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis.update_mode, UpdateMode::Change);
        assert!(!config.analysis.views.scatter);
        assert!(config.analysis.views.wheel);
        assert_eq!(config.analysis.interval_ms, 2_000);
        assert_eq!(config.capture, CaptureConfig::default());
    }
}
