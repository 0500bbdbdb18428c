//! 캡처 프레임 모델.
//!
//! 모든 프레임은 3채널 BGR 인터리브 버퍼다. 라이브 캡처는 8비트,
//! 이미지 파일은 원본 비트 깊이(16비트, 32비트 float)를 유지할 수 있다.

use crate::error::CoreError;
use crate::models::geometry::Rect;

/// 채널 수 (B, G, R)
pub const CHANNELS: usize = 3;

/// 비트 깊이별 픽셀 버퍼
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// 8비트 정수
    U8(Vec<u8>),
    /// 16비트 정수
    U16(Vec<u16>),
    /// 32비트 부동소수 (범위 미정, 분석 시 정규화)
    F32(Vec<f32>),
}

impl PixelData {
    /// 샘플(채널값) 개수
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 로그용 깊이 이름
    pub fn depth_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::F32(_) => "f32",
        }
    }
}

/// 한 번의 캡처로 얻은 BGR 프레임
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// 너비 (px)
    pub width: u32,
    /// 높이 (px)
    pub height: u32,
    /// BGR 인터리브 픽셀
    pub pixels: PixelData,
    /// 캡처 원본 영역 (화면 좌표)
    pub capture_rect: Rect,
}

impl RawFrame {
    /// 픽셀 버퍼 길이를 검증하며 생성
    pub fn new(
        width: u32,
        height: u32,
        pixels: PixelData,
        capture_rect: Rect,
    ) -> Result<Self, CoreError> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(CoreError::Validation {
                field: "pixels".to_string(),
                message: format!(
                    "{}x{} BGR 프레임은 {}개 샘플이 필요하지만 {}개",
                    width,
                    height,
                    expected,
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            capture_rect,
        })
    }

    /// 8비트 BGR 프레임 생성
    pub fn from_bgr8(
        width: u32,
        height: u32,
        bgr: Vec<u8>,
        capture_rect: Rect,
    ) -> Result<Self, CoreError> {
        Self::new(width, height, PixelData::U8(bgr), capture_rect)
    }

    /// 단색 8비트 프레임 (테스트/벤치용 편의 함수)
    pub fn solid_bgr8(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = bgr
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            width,
            height,
            pixels: PixelData::U8(pixels),
            capture_rect: Rect::new(0, 0, width, height),
        }
    }

    /// 픽셀 수
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 크기 0 여부
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// 8비트 버퍼 참조 (다른 깊이면 `None`)
    pub fn as_bgr8(&self) -> Option<&[u8]> {
        match &self.pixels {
            PixelData::U8(v) => Some(v),
            _ => None,
        }
    }
}
