//! # chroma-vision
//!
//! 색상 분석 파이프라인 크레이트.
//! 스크린/창 캡처, 좌표 변환, 변화 감지, HSV 통계 계산, 백그라운드 분석 루프,
//! 이미지 파일 분석을 담당한다.

pub mod analyzer;
pub mod analyzer_loop;
pub mod capture;
pub mod change;
pub mod color;
pub mod coords;
pub mod image_file;
pub mod resize;
pub mod session;
pub mod window_list;
