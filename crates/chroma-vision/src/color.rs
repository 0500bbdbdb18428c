//! BGR → HSV 변환.
//!
//! 8비트 입력은 OpenCV 규약(H 0..180, S/V 0..256)으로 바로 변환한다.
//! 16비트/float 입력은 단위 구간 [0, 1]로 정규화한 뒤 변환하고 같은 8비트 스케일로 맞춘다.

use chroma_core::models::frame::{PixelData, CHANNELS};

/// 분석 해상도의 HSV 평면 (8비트 스케일)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsvPlanes {
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
    /// 색상 (0..180)
    pub h: Vec<u8>,
    /// 채도 (0..256)
    pub s: Vec<u8>,
    /// 명도 (0..256)
    pub v: Vec<u8>,
}

impl HsvPlanes {
    /// 픽셀 수
    pub fn len(&self) -> usize {
        self.h.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.h.is_empty()
    }

    /// 크기가 같은지 (변화 감지의 비교 가능 조건)
    pub fn same_shape(&self, other: &HsvPlanes) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// 8비트 BGR 픽셀 하나를 HSV로 변환
#[inline]
pub fn bgr8_pixel_to_hsv(b: u8, g: u8, r: u8) -> [u8; 3] {
    let v = b.max(g).max(r);
    let min = b.min(g).min(r);
    let diff = (v - min) as f32;

    let s = if v == 0 {
        0.0
    } else {
        (diff * 255.0 / v as f32).round()
    };

    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (gf - bf) / diff
    } else if v == g {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let mut h8 = (h * 0.5).round() as u16;
    if h8 >= 180 {
        h8 -= 180;
    }
    [h8 as u8, s as u8, v]
}

/// 단위 구간 BGR 픽셀 하나를 8비트 스케일 HSV로 변환
#[inline]
pub fn unit_pixel_to_hsv(b: f32, g: f32, r: f32) -> [u8; 3] {
    let v = b.max(g).max(r);
    let min = b.min(g).min(r);
    let diff = v - min;

    let s = if v > 0.0 { diff / v } else { 0.0 };
    let mut h = if diff <= 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 8비트 경로와 같이 180은 0으로 감는다
    let h8 = ((h * 0.5).round().clamp(0.0, 180.0) as u16) % 180;
    [
        h8 as u8,
        (s * 255.0).round().clamp(0.0, 255.0) as u8,
        (v * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// 8비트 BGR 버퍼 → HSV 평면
pub fn bgr8_to_hsv(bgr: &[u8], width: u32, height: u32) -> HsvPlanes {
    let n = bgr.len() / CHANNELS;
    let mut planes = HsvPlanes {
        width,
        height,
        h: Vec::with_capacity(n),
        s: Vec::with_capacity(n),
        v: Vec::with_capacity(n),
    };
    for px in bgr.chunks_exact(CHANNELS) {
        let [h, s, v] = bgr8_pixel_to_hsv(px[0], px[1], px[2]);
        planes.h.push(h);
        planes.s.push(s);
        planes.v.push(v);
    }
    planes
}

/// 단위 구간 BGR 버퍼 → HSV 평면
pub fn unit_bgr_to_hsv(unit: &[f32], width: u32, height: u32) -> HsvPlanes {
    let n = unit.len() / CHANNELS;
    let mut planes = HsvPlanes {
        width,
        height,
        h: Vec::with_capacity(n),
        s: Vec::with_capacity(n),
        v: Vec::with_capacity(n),
    };
    for px in unit.chunks_exact(CHANNELS) {
        let [h, s, v] = unit_pixel_to_hsv(px[0], px[1], px[2]);
        planes.h.push(h);
        planes.s.push(s);
        planes.v.push(v);
    }
    planes
}

/// 8비트가 아닌 버퍼를 단위 구간으로 정규화
///
/// - 16비트: 65535로 나눔
/// - float: 비유한값은 0. 이미 [0, 1]이면 그대로, 음수가 없고 최대 255 이하면 255로 나누고,
///   그 외에는 관측 최대값(최소 1)으로 나눈 뒤 [0, 1]로 자른다.
///
/// 8비트 입력은 255로 나눈다.
pub fn normalize_to_unit(pixels: &PixelData) -> Vec<f32> {
    match pixels {
        PixelData::U8(v) => v.iter().map(|&x| x as f32 / 255.0).collect(),
        PixelData::U16(v) => v.iter().map(|&x| x as f32 / 65535.0).collect(),
        PixelData::F32(v) => {
            let finite = |x: f32| if x.is_finite() { x } else { 0.0 };
            let (lo, hi) = v.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &x| {
                let x = finite(x);
                (lo.min(x), hi.max(x))
            });
            let divisor = if v.is_empty() || (lo >= 0.0 && hi <= 1.0) {
                1.0
            } else if lo >= 0.0 && hi <= 255.0 {
                255.0
            } else {
                hi.max(1.0)
            };
            v.iter()
                .map(|&x| (finite(x) / divisor).clamp(0.0, 1.0))
                .collect()
        }
    }
}

/// 단위 구간 버퍼 → 8비트 (미리보기, 평균 RGB 계산용)
pub fn unit_to_u8(unit: &[f32]) -> Vec<u8> {
    unit.iter()
        .map(|&x| (x * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}
