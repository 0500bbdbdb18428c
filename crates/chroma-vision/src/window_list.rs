//! 최상위 창 열거.
//!
//! 제목이 있는 창만 모아 제목 기준(대소문자 무시)으로 정렬하고 개수를 제한한다.

use chroma_core::error::CoreError;
use chroma_core::models::capture::{WindowHandle, WindowInfo};
use chroma_core::models::geometry::Rect;
use tracing::debug;
use xcap::Window;

/// xcap 창 → 목록 항목. 제목이 비어 있거나 속성 조회가 실패하면 `None`
pub(crate) fn window_info(window: &Window) -> Option<WindowInfo> {
    let title = window.title().ok()?;
    if title.trim().is_empty() {
        return None;
    }
    Some(WindowInfo {
        handle: WindowHandle(window.id().ok()?),
        title,
        app_name: window.app_name().unwrap_or_default(),
        rect: window_rect(window)?,
        minimized: window.is_minimized().unwrap_or(false),
    })
}

/// 창 영역 (화면 좌표). 크기 0이면 `None`
pub(crate) fn window_rect(window: &Window) -> Option<Rect> {
    let rect = Rect::new(
        window.x().ok()?,
        window.y().ok()?,
        window.width().ok()?,
        window.height().ok()?,
    );
    (!rect.is_empty()).then_some(rect)
}

/// 제목 기준 대소문자 무시 정렬 후 `limit`개로 제한
pub fn sort_and_limit(mut windows: Vec<WindowInfo>, limit: usize) -> Vec<WindowInfo> {
    windows.sort_by_cached_key(|w| w.title.to_lowercase());
    windows.truncate(limit);
    windows
}

/// 제목 있는 최상위 창 목록
pub fn list_windows(limit: usize) -> Result<Vec<WindowInfo>, CoreError> {
    let windows =
        Window::all().map_err(|e| CoreError::Internal(format!("창 목록 조회 실패: {e}")))?;
    let infos: Vec<WindowInfo> = windows.iter().filter_map(window_info).collect();
    debug!("창 목록: {}개 (전체 {}개)", infos.len().min(limit), windows.len());
    Ok(sort_and_limit(infos, limit))
}
