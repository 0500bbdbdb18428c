//! 캡처 대상 모델.

use crate::models::geometry::Rect;
use serde::{Deserialize, Serialize};

/// 최상위 창 식별자 (캡처 백엔드가 부여한 ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u32);

/// 창 내부 관심 영역
///
/// `rect`는 선택 당시 창 캡처 해상도(`reference_width`×`reference_height`) 기준
/// 좌표다. 캡처 시 현재 해상도에 맞춰 비례 환산한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRoi {
    /// 창 기준 ROI
    pub rect: Rect,
    /// 선택 당시 창 캡처 너비
    pub reference_width: u32,
    /// 선택 당시 창 캡처 높이
    pub reference_height: u32,
}

/// 캡처 영역. 변경 시 통째로 교체한다
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureRegion {
    /// 대상 창 (오프스크린 렌더 후 선택적으로 ROI 크롭)
    Window {
        /// 창 식별자
        handle: WindowHandle,
        /// 창 내부 ROI (없으면 창 전체)
        roi: Option<WindowRoi>,
    },
    /// 화면 직사각형 (네이티브 좌표)
    Screen {
        /// 캡처 영역
        rect: Rect,
    },
}

impl CaptureRegion {
    /// 로그용 요약
    pub fn describe(&self) -> String {
        match self {
            Self::Window { handle, roi: None } => format!("창 #{}", handle.0),
            Self::Window {
                handle,
                roi: Some(roi),
            } => format!(
                "창 #{} ROI {}x{}+{}+{}",
                handle.0, roi.rect.width, roi.rect.height, roi.rect.x, roi.rect.y
            ),
            Self::Screen { rect } => {
                format!("화면 {}x{}+{}+{}", rect.width, rect.height, rect.x, rect.y)
            }
        }
    }
}

/// 창 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// 창 식별자
    pub handle: WindowHandle,
    /// 창 제목
    pub title: String,
    /// 소유 앱 이름
    pub app_name: String,
    /// 창 영역 (화면 좌표)
    pub rect: Rect,
    /// 최소화 여부
    pub minimized: bool,
}
