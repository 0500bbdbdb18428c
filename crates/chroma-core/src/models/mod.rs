//! Chroma Monitor 도메인 모델.
//!
//! 캡처 → 분석 → 소비자 전달 파이프라인에서 오가는 데이터 구조체.
//! 소비자에게 넘어가는 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod analysis;
pub mod capture;
pub mod frame;
pub mod geometry;
