//! 설정 및 구성 요소 와이어링 통합 테스트.
//!
//! 설정 파일 → AnalysisConfig → 분석기/루프 생성 검증.

use chroma_core::config::{AppConfig, UpdateMode, ViewNeeds};
use chroma_core::config_manager::ConfigManager;
use chroma_core::error::CaptureFailure;
use chroma_core::models::capture::CaptureRegion;
use chroma_core::models::frame::RawFrame;
use chroma_core::models::geometry::Rect;
use chroma_core::ports::capture::CaptureSource;
use chroma_vision::analyzer::{AnalysisOptions, FrameAnalyzer};
use chroma_vision::analyzer_loop::AnalyzerLoop;

struct Black;

impl CaptureSource for Black {
    fn capture(&mut self, _region: &CaptureRegion) -> Result<RawFrame, CaptureFailure> {
        Ok(RawFrame::solid_bgr8(8, 8, [0, 0, 0]))
    }

    fn virtual_screen(&self) -> Option<Rect> {
        Some(Rect::new(0, 0, 1024, 768))
    }
}

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();

    assert!(config.analysis.interval().as_millis() >= 50);
    assert!(config.analysis.diff_threshold >= 0.5);
    assert!(config.analysis.stable_frames >= 1);
    assert!(config.analysis.graph_every >= 1);
    assert_eq!(config.analysis.views, ViewNeeds::all());
    assert!(config.capture.default_roi_width > 0);
    assert!(config.capture.default_roi_height > 0);
    assert_eq!(config.analysis, config.analysis.sanitized());
}

#[test]
fn saved_config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());
    manager
        .update_with(|c| {
            c.analysis.update_mode = UpdateMode::Change;
            c.analysis.views.scatter = false;
            c.capture.default_roi_width = 800;
        })
        .unwrap();

    let reopened = ConfigManager::with_path(path).unwrap().get();
    assert_eq!(reopened.analysis.update_mode, UpdateMode::Change);
    assert!(!reopened.analysis.views.scatter);
    assert_eq!(reopened.capture.default_roi_width, 800);
}

#[test]
fn disabled_views_are_not_computed() {
    let mut config = AppConfig::default_config();
    config.analysis.views = ViewNeeds {
        scatter: false,
        histograms: false,
        ..ViewNeeds::all()
    };
    let analyzer = FrameAnalyzer::new(AnalysisOptions::from_config(&config.analysis));
    let result = analyzer
        .analyze(&RawFrame::solid_bgr8(32, 32, [0, 0, 255]))
        .unwrap();

    assert!(result.scatter.is_none());
    assert!(result.hue_hist.is_none());
    assert!(result.sat_hist.is_none());
    assert!(result.wheel_histogram.is_some());
    assert!(result.preview_frame.is_some());
}

#[test]
fn loop_builds_from_config_and_adopts_default_region() {
    let config = AppConfig::default_config();
    let lp = AnalyzerLoop::new(Box::new(Black), config.analysis.clone(), config.capture.clone());
    assert!(!lp.is_running());
    assert_eq!(lp.config(), config.analysis);

    let frame = lp.capture_once().unwrap();
    assert_eq!((frame.width, frame.height), (8, 8));
    assert_eq!(
        lp.region(),
        Some(CaptureRegion::Screen {
            rect: Rect::new(192, 204, 640, 360)
        })
    );
}
