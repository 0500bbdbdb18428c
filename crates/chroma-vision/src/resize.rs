//! 긴 변 기준 축소.
//!
//! 8비트 프레임은 fast_image_resize(Box 필터, 면적 평균)로,
//! 16비트/float 프레임은 image crate의 제네릭 리사이즈로 축소한다.
//! 확대는 하지 않는다.

use std::borrow::Cow;

use chroma_core::error::CoreError;
use chroma_core::models::frame::{PixelData, RawFrame};
use fast_image_resize::{images::Image as FirImage, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::imageops::{self, FilterType as ImageFilter};
use image::{ImageBuffer, Rgb};
use tracing::debug;

/// 긴 변을 `max_dim`에 맞춘 목표 크기. 축소가 필요 없으면 `None`
///
/// `max_dim == 0`은 제한 없음.
pub fn target_size(width: u32, height: u32, max_dim: u32) -> Option<(u32, u32)> {
    let long_edge = width.max(height);
    if max_dim == 0 || long_edge <= max_dim || long_edge == 0 {
        return None;
    }
    let scale = max_dim as f64 / long_edge as f64;
    let w = ((width as f64 * scale) as u32).max(1);
    let h = ((height as f64 * scale) as u32).max(1);
    Some((w, h))
}

/// 프레임의 긴 변을 `max_dim` 이하로 축소. 필요 없으면 빌린 채로 반환
pub fn resize_long_edge(frame: &RawFrame, max_dim: u32) -> Result<Cow<'_, RawFrame>, CoreError> {
    let Some((w, h)) = target_size(frame.width, frame.height, max_dim) else {
        return Ok(Cow::Borrowed(frame));
    };

    let pixels = match &frame.pixels {
        PixelData::U8(bgr) => PixelData::U8(resize_bgr8(bgr, frame.width, frame.height, w, h)?),
        PixelData::U16(bgr) => PixelData::U16(resize_generic(bgr, frame.width, frame.height, w, h)?),
        PixelData::F32(bgr) => PixelData::F32(resize_generic(bgr, frame.width, frame.height, w, h)?),
    };

    debug!(
        "프레임 축소: {}x{} → {}x{} ({})",
        frame.width,
        frame.height,
        w,
        h,
        frame.pixels.depth_name()
    );

    Ok(Cow::Owned(RawFrame {
        width: w,
        height: h,
        pixels,
        capture_rect: frame.capture_rect,
    }))
}

/// 8비트 3채널 고속 축소
pub fn resize_bgr8(
    bgr: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Result<Vec<u8>, CoreError> {
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::Internal("소스 이미지 크기 0".to_string()));
    }
    if dst_w == 0 || dst_h == 0 {
        return Err(CoreError::Internal("목표 이미지 크기 0".to_string()));
    }

    let src_image = FirImage::from_vec_u8(src_w, src_h, bgr.to_vec(), PixelType::U8x3)
        .map_err(|e| CoreError::Internal(format!("소스 이미지 생성 실패: {e}")))?;
    let mut dst_image = FirImage::new(dst_w, dst_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Internal(format!("리사이즈 실패: {e}")))?;

    Ok(dst_image.into_vec())
}

/// 16비트/float 3채널 축소
fn resize_generic<T>(
    bgr: &[T],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Result<Vec<T>, CoreError>
where
    T: image::Primitive + 'static,
    Rgb<T>: image::Pixel<Subpixel = T>,
{
    let src: ImageBuffer<Rgb<T>, Vec<T>> = ImageBuffer::from_raw(src_w, src_h, bgr.to_vec())
        .ok_or_else(|| CoreError::Internal("소스 버퍼 크기 불일치".to_string()))?;
    Ok(imageops::resize(&src, dst_w, dst_h, ImageFilter::Triangle).into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_core::models::geometry::Rect;

    #[test]
    fn target_size_keeps_aspect() {
        assert_eq!(target_size(1920, 1080, 400), Some((400, 225)));
        assert_eq!(target_size(1080, 1920, 400), Some((225, 400)));
    }

    #[test]
    fn no_resize_when_small_or_unlimited() {
        assert_eq!(target_size(300, 200, 400), None);
        assert_eq!(target_size(4000, 3000, 0), None);
    }

    #[test]
    fn thin_strip_never_collapses_to_zero() {
        assert_eq!(target_size(5000, 2, 100), Some((100, 1)));
    }

    #[test]
    fn solid_frame_stays_solid_after_resize() {
        let frame = RawFrame::solid_bgr8(800, 600, [10, 20, 30]);
        let small = resize_long_edge(&frame, 200).unwrap();
        assert_eq!((small.width, small.height), (200, 150));
        let bgr = small.as_bgr8().unwrap();
        assert_eq!(bgr.len(), 200 * 150 * 3);
        assert!(bgr.chunks_exact(3).all(|p| p == [10, 20, 30]));
        assert_eq!(small.capture_rect, frame.capture_rect);
    }

    #[test]
    fn u16_frame_resized_in_native_depth() {
        let pixels = PixelData::U16(vec![40_000; 64 * 32 * 3]);
        let frame = RawFrame::new(64, 32, pixels, Rect::new(0, 0, 64, 32)).unwrap();
        let small = resize_long_edge(&frame, 16).unwrap();
        assert_eq!((small.width, small.height), (16, 8));
        match &small.pixels {
            PixelData::U16(v) => assert!(v.iter().all(|&x| x == 40_000)),
            other => panic!("unexpected depth {}", other.depth_name()),
        }
    }
}
