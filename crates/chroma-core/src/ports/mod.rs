//! 포트 인터페이스 (trait).
//!
//! 플랫폼 의존 부분(캡처 백엔드, 모니터 열거)과 진행/취소 콜백을 trait으로 분리한다.
//! 구현은 `chroma-vision` crate가 제공하고, 테스트는 가짜 구현을 주입한다.

pub mod capture;
pub mod progress;
