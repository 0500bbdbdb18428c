//! 논리 ↔ 네이티브 좌표 변환.
//!
//! UI 툴킷의 논리 좌표(모니터별 배율 적용)와 캡처 백엔드의 네이티브 픽셀 좌표를
//! 멀티모니터 환경에서 서로 변환한다.
//!
//! 두 좌표계는 모니터 열거 순서도 배율도 같다는 보장이 없으므로, 모니터 쌍마다
//! 비용(배율 불일치 + 정규화 중심 위치 차이)을 계산해 낮은 순으로 탐욕 배정하고,
//! 남은 논리 모니터는 인덱스 순서로 채운다. 근사 매칭이다.

use std::sync::Arc;

use chroma_core::models::geometry::Rect;
use chroma_core::ports::capture::MonitorProvider;
use tracing::{debug, warn};

/// 가로/세로 배율 차이 가중치
const W_ASPECT: f64 = 300.0;
/// 배율과 devicePixelRatio 차이 가중치
const W_DPR: f64 = 80.0;
/// 정규화 중심 위치 차이 가중치
const W_POSITION: f64 = 60.0;
/// devicePixelRatio 하한
const MIN_DPR: f64 = 0.5;

/// UI 툴킷이 보고한 논리 화면
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalScreen {
    /// 논리 좌표 영역
    pub geometry: Rect,
    /// 보고된 배율
    pub device_pixel_ratio: f64,
}

impl LogicalScreen {
    /// 새 논리 화면
    pub fn new(geometry: Rect, device_pixel_ratio: f64) -> Self {
        Self {
            geometry,
            device_pixel_ratio,
        }
    }
}

/// 논리 화면 ↔ 네이티브 모니터 매칭 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorMap {
    pairs: Vec<(LogicalScreen, Rect)>,
}

/// 모니터 매칭 생성
///
/// 네이티브 모니터나 논리 화면이 없으면 빈 맵 (항등 변환).
pub fn build_screen_monitor_map(logical: &[LogicalScreen], native: &[Rect]) -> MonitorMap {
    if logical.is_empty() || native.is_empty() {
        return MonitorMap::default();
    }

    let (Some(q_bounds), Some(m_bounds)) = (
        Rect::bounding(logical.iter().map(|s| &s.geometry)),
        Rect::bounding(native.iter()),
    ) else {
        return MonitorMap::default();
    };

    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(logical.len() * native.len());
    for (qi, q) in logical.iter().enumerate() {
        let qw = (q.geometry.width as f64).max(1.0);
        let qh = (q.geometry.height as f64).max(1.0);
        let dpr = q.device_pixel_ratio.max(MIN_DPR);
        let (qx, qy) = normalized_center(&q.geometry, &q_bounds);

        for (mi, m) in native.iter().enumerate() {
            let sx = m.width as f64 / qw;
            let sy = m.height as f64 / qh;
            let (mx, my) = normalized_center(m, &m_bounds);
            let cost = (sx - sy).abs() * W_ASPECT
                + (sx - dpr).abs() * W_DPR
                + (sy - dpr).abs() * W_DPR
                + (qx - mx).abs() * W_POSITION
                + (qy - my).abs() * W_POSITION;
            candidates.push((cost, qi, mi));
        }
    }
    // 안정 정렬: 동점은 (논리, 네이티브) 인덱스 순
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut assigned: Vec<Option<usize>> = vec![None; logical.len()];
    let mut used = vec![false; native.len()];
    for (_, qi, mi) in candidates {
        if assigned[qi].is_some() || used[mi] {
            continue;
        }
        assigned[qi] = Some(mi);
        used[mi] = true;
    }

    let pairs = logical
        .iter()
        .zip(assigned)
        .enumerate()
        .map(|(i, (q, mi))| {
            let mi = mi.unwrap_or_else(|| i.min(native.len() - 1));
            (*q, native[mi])
        })
        .collect::<Vec<_>>();

    debug!("모니터 매칭: 논리 {}개 ↔ 네이티브 {}개", logical.len(), native.len());
    MonitorMap { pairs }
}

/// 합집합 경계 안에서 중심의 정규화 위치 (0..1)
fn normalized_center(rect: &Rect, bounds: &Rect) -> (f64, f64) {
    let (cx, cy) = rect.center();
    let bw = (bounds.width as f64).max(1.0);
    let bh = (bounds.height as f64).max(1.0);
    ((cx - bounds.x as f64) / bw, (cy - bounds.y as f64) / bh)
}

/// `from` 영역의 점을 `to` 영역으로 아핀 변환
fn map_point(x: f64, y: f64, from: &Rect, to: &Rect) -> (f64, f64) {
    let fw = (from.width as f64).max(1.0);
    let fh = (from.height as f64).max(1.0);
    (
        to.x as f64 + (x - from.x as f64) * (to.width as f64 / fw),
        to.y as f64 + (y - from.y as f64) * (to.height as f64 / fh),
    )
}

/// 점을 포함하는 영역 인덱스. 경계 포함 판정까지 보고 없으면 0
fn locate<'a, I>(rects: I, x: f64, y: f64) -> usize
where
    I: Iterator<Item = &'a Rect> + Clone,
{
    rects
        .clone()
        .position(|r| r.contains(x, y))
        .or_else(|| {
            rects.clone().position(|r| {
                x >= r.x as f64 && y >= r.y as f64 && x <= r.right() as f64 && y <= r.bottom() as f64
            })
        })
        .unwrap_or(0)
}

impl MonitorMap {
    /// 매칭 없음 (항등 변환)
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 매칭 쌍 목록
    pub fn pairs(&self) -> &[(LogicalScreen, Rect)] {
        &self.pairs
    }

    /// 논리 좌표 점 → 네이티브
    pub fn logical_point_to_native(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pairs.is_empty() {
            return (x, y);
        }
        let i = locate(self.pairs.iter().map(|(q, _)| &q.geometry), x, y);
        let (q, m) = &self.pairs[i];
        map_point(x, y, &q.geometry, m)
    }

    /// 네이티브 좌표 점 → 논리
    pub fn native_point_to_logical(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pairs.is_empty() {
            return (x, y);
        }
        let i = locate(self.pairs.iter().map(|(_, m)| m), x, y);
        let (q, m) = &self.pairs[i];
        map_point(x, y, m, &q.geometry)
    }

    /// 논리 좌표 직사각형 → 네이티브 (양 꼭짓점 변환 후 정규화)
    pub fn logical_rect_to_native(&self, rect: &Rect) -> Rect {
        if self.pairs.is_empty() {
            return *rect;
        }
        let (x1, y1) = self.logical_point_to_native(rect.x as f64, rect.y as f64);
        let (x2, y2) = self.logical_point_to_native(rect.right() as f64, rect.bottom() as f64);
        Rect::from_corners(x1, y1, x2, y2)
    }

    /// 네이티브 좌표 직사각형 → 논리
    pub fn native_rect_to_logical(&self, rect: &Rect) -> Rect {
        if self.pairs.is_empty() {
            return *rect;
        }
        let (x1, y1) = self.native_point_to_logical(rect.x as f64, rect.y as f64);
        let (x2, y2) = self.native_point_to_logical(rect.right() as f64, rect.bottom() as f64);
        Rect::from_corners(x1, y1, x2, y2)
    }
}

/// 좌표 변환기: 네이티브 모니터는 호출 시점마다 다시 열거한다
pub struct CoordinateMapper {
    logical: Vec<LogicalScreen>,
    provider: Arc<dyn MonitorProvider>,
}

impl CoordinateMapper {
    /// 새 변환기
    pub fn new(logical: Vec<LogicalScreen>, provider: Arc<dyn MonitorProvider>) -> Self {
        Self { logical, provider }
    }

    /// 논리 화면 구성 갱신 (모니터 연결/해제, 배율 변경)
    pub fn set_logical_screens(&mut self, logical: Vec<LogicalScreen>) {
        self.logical = logical;
    }

    /// 논리 화면 목록
    pub fn logical_screens(&self) -> &[LogicalScreen] {
        &self.logical
    }

    /// 현재 모니터 매칭. 네이티브 열거 실패 시 빈 맵
    pub fn build_screen_monitor_map(&self) -> MonitorMap {
        match self.provider.native_monitors() {
            Ok(native) => build_screen_monitor_map(&self.logical, &native),
            Err(e) => {
                warn!("네이티브 모니터 열거 실패, 좌표 변환 생략: {e}");
                MonitorMap::default()
            }
        }
    }

    /// 논리 좌표 점 → 네이티브
    pub fn logical_point_to_native(&self, x: f64, y: f64) -> (f64, f64) {
        self.build_screen_monitor_map().logical_point_to_native(x, y)
    }

    /// 논리 좌표 직사각형 → 네이티브
    pub fn logical_rect_to_native(&self, rect: &Rect) -> Rect {
        self.build_screen_monitor_map().logical_rect_to_native(rect)
    }

    /// 네이티브 좌표 직사각형 → 논리
    pub fn native_rect_to_logical(&self, rect: &Rect) -> Rect {
        self.build_screen_monitor_map().native_rect_to_logical(rect)
    }
}
