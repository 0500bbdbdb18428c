//! 스크린/창 캡처.
//!
//! xcap 기반 `CaptureSource` 구현. 화면 영역은 겹치는 모니터마다 부분 캡처해 합성하고,
//! 창은 오프스크린 렌더(가려져도 캡처됨) 후 ROI를 현재 해상도로 환산해 자른다.
//! 예상 가능한 실패는 `CaptureFailure`로 돌려준다.

use chroma_core::error::{CaptureFailure, CoreError};
use chroma_core::models::capture::{CaptureRegion, WindowHandle, WindowInfo, WindowRoi};
use chroma_core::models::frame::RawFrame;
use chroma_core::models::geometry::Rect;
use chroma_core::ports::capture::{CaptureSource, MonitorProvider};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, warn};
use xcap::{Monitor, Window};

use crate::window_list::{self, window_rect};

/// 캡처 가능한 최소 변 길이 (px)
const MIN_CAPTURE_EDGE: u32 = 2;

/// 스크린 캡처: xcap 기반
pub struct ScreenCapture;

impl ScreenCapture {
    /// 새 캡처 인스턴스 생성
    pub fn new() -> Self {
        Self
    }

    /// 모니터와 영역 목록
    fn monitors() -> Result<Vec<(Monitor, Rect)>, CaptureFailure> {
        let monitors = Monitor::all()
            .map_err(|e| CaptureFailure::BackendError(format!("모니터 목록 조회 실패: {e}")))?;
        let with_rects: Vec<(Monitor, Rect)> = monitors
            .into_iter()
            .filter_map(|m| {
                let rect = Rect::new(m.x().ok()?, m.y().ok()?, m.width().ok()?, m.height().ok()?);
                Some((m, rect))
            })
            .collect();
        if with_rects.is_empty() {
            return Err(CaptureFailure::BackendError("모니터를 찾을 수 없음".to_string()));
        }
        Ok(with_rects)
    }

    /// 화면 영역 캡처
    fn capture_screen_rect(&self, rect: &Rect) -> Result<RawFrame, CaptureFailure> {
        let monitors = Self::monitors()?;
        let bounds = Rect::bounding(monitors.iter().map(|(_, r)| r))
            .ok_or_else(|| CaptureFailure::BackendError("모니터를 찾을 수 없음".to_string()))?;
        let clipped = clip_to_screen(rect, &bounds)?;

        let mut canvas = RgbaImage::new(clipped.width, clipped.height);
        let mut covered = false;
        for (monitor, mrect) in &monitors {
            let Some(part) = clipped.intersect(mrect) else {
                continue;
            };
            let mut image = monitor
                .capture_region(
                    (part.x - mrect.x) as u32,
                    (part.y - mrect.y) as u32,
                    part.width,
                    part.height,
                )
                .map_err(|e| CaptureFailure::BackendError(e.to_string()))?;
            // HiDPI 백엔드는 물리 픽셀로 돌려줄 수 있다
            if image.dimensions() != (part.width, part.height) {
                image = imageops::resize(&image, part.width, part.height, FilterType::Triangle);
            }
            imageops::replace(
                &mut canvas,
                &image,
                (part.x - clipped.x) as i64,
                (part.y - clipped.y) as i64,
            );
            covered = true;
        }
        if !covered {
            // 모니터 사이 빈 공간
            return Err(CaptureFailure::OffScreen);
        }

        debug!("화면 캡처 완료: {}", CaptureRegion::Screen { rect: clipped }.describe());
        to_frame(&canvas, clipped)
    }

    /// 창 캡처 (ROI 적용)
    fn capture_window(
        &self,
        handle: WindowHandle,
        roi: Option<&WindowRoi>,
    ) -> Result<RawFrame, CaptureFailure> {
        let windows = Window::all()
            .map_err(|e| CaptureFailure::BackendError(format!("창 목록 조회 실패: {e}")))?;
        let window = windows
            .into_iter()
            .find(|w| w.id().ok() == Some(handle.0))
            .ok_or(CaptureFailure::WindowRectUnavailable)?;

        if window.is_minimized().unwrap_or(false) {
            return Err(CaptureFailure::WindowMinimized);
        }
        let wrect = window_rect(&window).ok_or(CaptureFailure::WindowRectUnavailable)?;

        let image = window
            .capture_image()
            .map_err(|e| CaptureFailure::BackendError(e.to_string()))?;
        let (crop, capture_rect) = window_roi_crop(image.width(), image.height(), &wrect, roi)?;

        let image = if (crop.width, crop.height) == image.dimensions() {
            image
        } else {
            imageops::crop_imm(&image, crop.x as u32, crop.y as u32, crop.width, crop.height)
                .to_image()
        };

        debug!(
            "창 캡처 완료: #{} {}x{}",
            handle.0,
            image.width(),
            image.height()
        );
        to_frame(&image, capture_rect)
    }
}

impl Default for ScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for ScreenCapture {
    fn capture(&mut self, region: &CaptureRegion) -> Result<RawFrame, CaptureFailure> {
        let result = match region {
            CaptureRegion::Screen { rect } => self.capture_screen_rect(rect),
            CaptureRegion::Window { handle, roi } => self.capture_window(*handle, roi.as_ref()),
        };
        if let Err(e) = &result {
            warn!("캡처 실패 ({}): {e}", region.describe());
        }
        result
    }

    fn virtual_screen(&self) -> Option<Rect> {
        let monitors = Self::monitors().ok()?;
        Rect::bounding(monitors.iter().map(|(_, r)| r))
    }

    fn list_windows(&self, limit: usize) -> Result<Vec<WindowInfo>, CoreError> {
        window_list::list_windows(limit)
    }
}

impl MonitorProvider for ScreenCapture {
    fn native_monitors(&self) -> Result<Vec<Rect>, CoreError> {
        Self::monitors()
            .map(|m| m.into_iter().map(|(_, r)| r).collect())
            .map_err(CoreError::from)
    }
}

/// 가상 화면 경계로 자르기. 2px 미만이면 `OffScreen`
pub fn clip_to_screen(rect: &Rect, bounds: &Rect) -> Result<Rect, CaptureFailure> {
    match rect.intersect(bounds) {
        Some(r) if r.width >= MIN_CAPTURE_EDGE && r.height >= MIN_CAPTURE_EDGE => Ok(r),
        _ => Err(CaptureFailure::OffScreen),
    }
}

/// 창 이미지에서 잘라낼 영역과 그 화면 좌표
///
/// ROI는 선택 당시 캡처 해상도 기준이므로 현재 이미지 해상도로 비례 환산한다.
/// 반환: (이미지 내 크롭 영역, 화면 좌표 캡처 영역)
pub fn window_roi_crop(
    image_width: u32,
    image_height: u32,
    window: &Rect,
    roi: Option<&WindowRoi>,
) -> Result<(Rect, Rect), CaptureFailure> {
    if image_width < MIN_CAPTURE_EDGE || image_height < MIN_CAPTURE_EDGE {
        return Err(CaptureFailure::WindowRectUnavailable);
    }
    let Some(roi) = roi else {
        return Ok((Rect::new(0, 0, image_width, image_height), *window));
    };

    let sx = image_width as f64 / roi.reference_width.max(1) as f64;
    let sy = image_height as f64 / roi.reference_height.max(1) as f64;
    let x0 = (roi.rect.x as f64 * sx).round().max(0.0);
    let y0 = (roi.rect.y as f64 * sy).round().max(0.0);
    let x1 = (roi.rect.right() as f64 * sx).round().min(image_width as f64);
    let y1 = (roi.rect.bottom() as f64 * sy).round().min(image_height as f64);
    let (w, h) = (x1 - x0, y1 - y0);
    if w <= 1.0 || h <= 1.0 {
        return Err(CaptureFailure::OffScreen);
    }
    let crop = Rect::new(x0 as i32, y0 as i32, w as u32, h as u32);

    // 이미지 픽셀 → 화면 좌표
    let kx = window.width as f64 / image_width as f64;
    let ky = window.height as f64 / image_height as f64;
    let capture_rect = Rect::new(
        window.x + (x0 * kx).round() as i32,
        window.y + (y0 * ky).round() as i32,
        ((w * kx).round() as u32).max(1),
        ((h * ky).round() as u32).max(1),
    );
    Ok((crop, capture_rect))
}

/// RGBA 이미지 → BGR 프레임
fn to_frame(image: &RgbaImage, capture_rect: Rect) -> Result<RawFrame, CaptureFailure> {
    RawFrame::from_bgr8(
        image.width(),
        image.height(),
        rgba_to_bgr(image.as_raw()),
        capture_rect,
    )
    .map_err(|e| CaptureFailure::BackendError(e.to_string()))
}

/// RGBA 인터리브 → BGR 인터리브 (알파 버림)
pub fn rgba_to_bgr(rgba: &[u8]) -> Vec<u8> {
    let mut bgr = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        bgr.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    bgr
}
