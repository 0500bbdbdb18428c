//! Chroma Monitor 핵심 에러 타입.
//!
//! 캡처 실패(`CaptureFailure`)는 루프를 멈추지 않는 상태값이고,
//! 분석 실패(`AnalysisFailure`)는 해당 호출만 실패시킨다.
//! 취소는 에러가 아니다: 분석 함수는 `Ok(None)`을 반환한다.

use std::time::Duration;
use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 캡처 실패
    #[error(transparent)]
    Capture(#[from] CaptureFailure),

    /// 분석 실패
    #[error(transparent)]
    Analysis(#[from] AnalysisFailure),
}

/// 캡처 실패 종류.
///
/// `Display` 문자열이 그대로 사용자 상태 메시지로 쓰인다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureFailure {
    /// 화면 경계로 자른 영역이 2px 미만
    #[error("영역이 화면 밖에 있습니다 (범위를 다시 선택하세요)")]
    OffScreen,

    /// 대상 창이 최소화됨
    #[error("대상 창이 최소화되어 있습니다 (색상을 가져올 수 없음)")]
    WindowMinimized,

    /// 창 영역 조회 실패 (닫힘, 크기 0 등)
    #[error("대상 창의 영역을 가져올 수 없습니다")]
    WindowRectUnavailable,

    /// 캡처 백엔드 에러 (권한, 디스플레이 서버 등)
    #[error("화면 캡처 실패 (권한/디스플레이 설정 확인): {0}")]
    BackendError(String),
}

impl CaptureFailure {
    /// 실패 종류별 재시도 대기 시간
    pub fn retry_delay(&self) -> Duration {
        match self {
            Self::OffScreen | Self::WindowRectUnavailable => Duration::from_millis(300),
            Self::WindowMinimized | Self::BackendError(_) => Duration::from_millis(500),
        }
    }
}

/// 분석 실패 종류
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisFailure {
    /// 크기 0 프레임 (호출자 계약 위반)
    #[error("빈 프레임은 분석할 수 없습니다")]
    EmptyFrame,

    /// 이미지 파일 디코딩 실패
    #[error("이미지 파일을 읽을 수 없습니다: {0}")]
    DecodeFailure(String),
}
