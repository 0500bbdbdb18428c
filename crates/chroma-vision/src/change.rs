//! 화면 변화 감지.
//!
//! "변화 시 갱신" 모드의 발행 게이트. 화면이 바뀌는 동안은 발행하지 않고,
//! 축소 HSV 프레임의 차이 지표가 임계값 아래로 N 프레임 연속 유지되면 한 번 발행한다.
//!
//! 상태: `Idle → CoolingDown → Watching → StablePending → (발행) → Watching …`

use std::time::{Duration, Instant};

use chroma_core::config::CHANGE_DETECT_DIM;
use chroma_core::error::CoreError;
use chroma_core::models::frame::{PixelData, RawFrame};
use tracing::debug;

use crate::color::{bgr8_to_hsv, normalize_to_unit, unit_bgr_to_hsv, HsvPlanes};
use crate::resize::resize_long_edge;

/// 변화 감지 상태
#[derive(Debug, Clone, Default)]
pub struct ChangeState {
    /// 직전 축소 HSV 프레임
    pub previous: Option<HsvPlanes>,
    /// 연속 안정 프레임 수
    pub consecutive_stable_frames: u32,
    /// 현재 안정 구간에서 이미 발행했는지
    pub was_already_emitted: bool,
    /// 이 시각 전에는 발행하지 않음
    pub cooldown_until: Option<Instant>,
    /// 다음 판정에서 조건 없이 한 번 발행
    pub force_emit_once: bool,
}

/// 관찰 가능한 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    /// 비교할 직전 프레임 없음
    Idle,
    /// 발행 직후 쿨다운 중
    CoolingDown,
    /// 변화 중이거나 안정 프레임 부족
    Watching,
    /// 안정 조건 충족, 발행 대기
    StablePending,
}

/// 판정 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeDecision {
    /// 발행 필요 (`forced`: 대상 변경에 의한 강제 발행)
    Emit {
        /// 강제 발행 여부
        forced: bool,
    },
    /// 발행 안 함
    Hold {
        /// 이번 차이 지표 (비교 불가면 `None`)
        metric: Option<f32>,
    },
}

impl ChangeDecision {
    /// 발행 여부
    pub fn should_emit(&self) -> bool {
        matches!(self, Self::Emit { .. })
    }
}

/// 변화 감지기
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    state: ChangeState,
    diff_threshold: f32,
    stable_frames: u32,
}

impl ChangeDetector {
    /// 새 감지기
    pub fn new(diff_threshold: f32, stable_frames: u32) -> Self {
        Self {
            state: ChangeState::default(),
            diff_threshold,
            stable_frames: stable_frames.max(1),
        }
    }

    /// 임계값 갱신 (다음 판정부터 적용)
    pub fn set_thresholds(&mut self, diff_threshold: f32, stable_frames: u32) {
        self.diff_threshold = diff_threshold;
        self.stable_frames = stable_frames.max(1);
    }

    /// 현재 상태
    pub fn state(&self) -> &ChangeState {
        &self.state
    }

    /// 상태 전체 초기화 (대상/ROI/모드 변경)
    pub fn reset(&mut self) {
        debug!("변화 감지 상태 초기화");
        self.state = ChangeState::default();
    }

    /// 다음 판정에서 한 번 강제 발행
    pub fn request_force_emit(&mut self) {
        self.state.force_emit_once = true;
    }

    /// 현재 단계
    pub fn phase(&self, now: Instant) -> ChangePhase {
        let s = &self.state;
        if s.previous.is_none() {
            ChangePhase::Idle
        } else if s.cooldown_until.is_some_and(|until| now < until) {
            ChangePhase::CoolingDown
        } else if s.consecutive_stable_frames >= self.stable_frames && !s.was_already_emitted {
            ChangePhase::StablePending
        } else {
            ChangePhase::Watching
        }
    }

    /// 새 축소 프레임 관찰 후 발행 여부 판정
    ///
    /// 판정만 하고 발행 기록은 남기지 않는다. 실제로 발행했으면 [`Self::commit_emit`] 호출.
    pub fn observe(&mut self, planes: HsvPlanes, now: Instant) -> ChangeDecision {
        let metric = self
            .state
            .previous
            .as_ref()
            .and_then(|prev| change_metric(prev, &planes));

        match metric {
            None => {
                // 첫 프레임 또는 해상도 변경
                self.state.consecutive_stable_frames = 0;
                self.state.was_already_emitted = false;
            }
            Some(m) if m < self.diff_threshold => {
                self.state.consecutive_stable_frames =
                    self.state.consecutive_stable_frames.saturating_add(1);
            }
            Some(_) => {
                self.state.consecutive_stable_frames = 0;
                self.state.was_already_emitted = false;
            }
        }
        self.state.previous = Some(planes);

        if self.state.force_emit_once {
            debug!("강제 발행 (대상 변경)");
            return ChangeDecision::Emit { forced: true };
        }

        let due = metric.is_some()
            && self.state.consecutive_stable_frames >= self.stable_frames
            && !self.state.was_already_emitted
            && self.state.cooldown_until.is_none_or(|until| now >= until);

        if due {
            debug!(
                "변화 안정 → 발행 (안정 {}프레임, 지표 {:.2})",
                self.state.consecutive_stable_frames,
                metric.unwrap_or_default()
            );
            ChangeDecision::Emit { forced: false }
        } else {
            ChangeDecision::Hold { metric }
        }
    }

    /// 발행 기록. 쿨다운 시작
    pub fn commit_emit(&mut self, now: Instant, cooldown: Duration) {
        self.state.force_emit_once = false;
        self.state.was_already_emitted = true;
        self.state.cooldown_until = Some(now + cooldown);
    }
}

/// 두 축소 HSV 프레임의 차이 지표. 크기가 다르면 `None`
///
/// `mean(원형 hue 거리) + 0.5·mean(|ΔS|) + 0.5·mean(|ΔV|)`, hue 주기는 180.
pub fn change_metric(prev: &HsvPlanes, curr: &HsvPlanes) -> Option<f32> {
    if !prev.same_shape(curr) || prev.len() != curr.len() || curr.is_empty() {
        return None;
    }

    let mut dh_sum = 0u64;
    let mut ds_sum = 0u64;
    let mut dv_sum = 0u64;
    for i in 0..curr.len() {
        let dh = prev.h[i].abs_diff(curr.h[i]) as u64;
        dh_sum += dh.min(180 - dh.min(180));
        ds_sum += prev.s[i].abs_diff(curr.s[i]) as u64;
        dv_sum += prev.v[i].abs_diff(curr.v[i]) as u64;
    }

    let n = curr.len() as f32;
    Some(dh_sum as f32 / n + 0.5 * ds_sum as f32 / n + 0.5 * dv_sum as f32 / n)
}

/// 변화 감지용 축소 HSV 프레임 (긴 변 120px)
pub fn reduce_frame(frame: &RawFrame) -> Result<HsvPlanes, CoreError> {
    let small = resize_long_edge(frame, CHANGE_DETECT_DIM)?;
    Ok(match &small.pixels {
        PixelData::U8(bgr) => bgr8_to_hsv(bgr, small.width, small.height),
        other => unit_bgr_to_hsv(&normalize_to_unit(other), small.width, small.height),
    })
}
