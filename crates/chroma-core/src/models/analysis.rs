//! 분석 결과 페이로드.
//!
//! 사이클당 한 번 생성되어 소비자에게 소유권이 넘어간다. 생성 후 불변.
//! 선택 필드는 해당 뷰가 구독되지 않았거나 그래프 갱신 주기가 아니면 `None`.

use crate::models::geometry::Rect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 색상환 bin 수 (OpenCV 8비트 hue 범위 0..180)
pub const HUE_BINS: usize = 180;

/// 채도/명도 bin 수
pub const SV_BINS: usize = 256;

/// 분석 해상도의 BGR 미리보기
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFrame {
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
    /// 8비트 BGR 인터리브
    #[serde(skip)]
    pub bgr: Vec<u8>,
}

/// 상위 색상 (색상 구간 하나)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopColor {
    /// 상위 구간 합 대비 비율 (0.0 ~ 1.0)
    pub ratio: f64,
    /// 구간 평균 RGB
    pub rgb: [u8; 3],
    /// 구간 인덱스 (0..18, 20° 폭)
    pub segment: u8,
}

/// 산점도 샘플 (인덱스별로 짝을 이룸)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSample {
    /// 샘플 HSV (8비트)
    pub hsv: Vec<[u8; 3]>,
    /// 샘플 RGB
    pub rgb: Vec<[u8; 3]>,
}

impl ScatterSample {
    /// 샘플 수
    pub fn len(&self) -> usize {
        self.hsv.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.hsv.is_empty()
    }
}

/// H/S/V 평면 표준편차 (8비트 스케일)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HsvSpread {
    /// 색상 표준편차
    pub h_std: f64,
    /// 채도 표준편차
    pub s_std: f64,
    /// 명도 표준편차
    pub v_std: f64,
}

/// 분석 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 분석 해상도 미리보기
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_frame: Option<PreviewFrame>,
    /// 평활화된 색상환 분포 (180 bin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wheel_histogram: Option<Vec<f64>>,
    /// 색상 히스토그램 (채도 0 제외, 180 bin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue_hist: Option<Vec<u64>>,
    /// 채도 히스토그램 (256 bin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat_hist: Option<Vec<u64>>,
    /// 명도 히스토그램 (256 bin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_hist: Option<Vec<u64>>,
    /// 산점도 샘플
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scatter: Option<ScatterSample>,
    /// 상위 색상 (최대 5개, 비율 내림차순)
    pub top_colors: Vec<TopColor>,
    /// 색상환 포함 픽셀 수 (채도 ≥ 임계값)
    pub wheel_pixel_count: u64,
    /// 따뜻한 색 비율
    pub warm_ratio: f64,
    /// 차가운 색 비율
    pub cool_ratio: f64,
    /// 나머지 비율
    pub other_ratio: f64,
    /// H/S/V 표준편차
    pub hsv_spread: HsvSpread,
    /// 캡처 영역 (화면 좌표)
    pub capture_rect: Rect,
    /// 처리 시간 (ms)
    pub elapsed_ms: f64,
    /// 그래프 전체 갱신 여부 (false면 미리보기/비율만 유효)
    pub is_full_update: bool,
    /// 생성 시각
    pub captured_at: DateTime<Utc>,
}
