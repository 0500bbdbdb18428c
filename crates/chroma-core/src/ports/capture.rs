//! 캡처 포트.
//!
//! 구현: `chroma-vision::capture` (xcap)

use crate::error::{CaptureFailure, CoreError};
use crate::models::capture::{CaptureRegion, WindowInfo};
use crate::models::frame::RawFrame;
use crate::models::geometry::Rect;

/// 캡처 소스: 현재 캡처 영역에서 BGR 프레임 하나를 만든다
///
/// 예상 가능한 실패는 패닉 없이 `CaptureFailure`로 돌려준다.
pub trait CaptureSource: Send {
    /// 영역 캡처
    fn capture(&mut self, region: &CaptureRegion) -> Result<RawFrame, CaptureFailure>;

    /// 전체 모니터를 덮는 가상 화면 경계 (네이티브 좌표)
    fn virtual_screen(&self) -> Option<Rect>;

    /// 제목 있는 최상위 창 목록 (제목 기준 대소문자 무시 정렬, 최대 `limit`개)
    ///
    /// 창 API가 없는 백엔드는 빈 목록을 돌려준다 (화면 캡처만 지원).
    fn list_windows(&self, limit: usize) -> Result<Vec<WindowInfo>, CoreError> {
        let _ = limit;
        Ok(Vec::new())
    }
}

/// 네이티브 모니터 열거: 좌표 변환기가 사용
pub trait MonitorProvider: Send + Sync {
    /// 네이티브(캡처 백엔드) 좌표계의 모니터 영역 목록
    fn native_monitors(&self) -> Result<Vec<Rect>, CoreError>;
}
