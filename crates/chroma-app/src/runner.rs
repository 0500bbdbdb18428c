//! 하위 명령 실행.
//!
//! 분석 스레드가 보낸 이벤트를 짧은 주기로 비우며 출력하고, 결과를 처리할 때마다 확인 응답한다.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chroma_core::models::capture::{CaptureRegion, WindowHandle, WindowRoi};
use chroma_core::models::geometry::Rect;
use chroma_core::ports::capture::{CaptureSource, MonitorProvider};
use chroma_vision::analyzer_loop::LoopEvent;
use chroma_vision::coords::{build_screen_monitor_map, CoordinateMapper, LogicalScreen};
use chroma_vision::image_file::ImageAnalysisEvent;
use chroma_vision::session::{AnalysisSession, LiveStart};
use tracing::{debug, info, warn};

use crate::cli::WatchArgs;
use crate::lifecycle::StopReceiver;
use crate::report::{self, OutputMode};

/// 이벤트 비우기 주기
const DRAIN_INTERVAL: Duration = Duration::from_millis(30);

/// 네이티브 모니터를 배율로 나눈 논리 화면 구성
pub fn logical_screens_for(native: &[Rect], scale: f64) -> Vec<LogicalScreen> {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    native
        .iter()
        .map(|m| {
            let geometry = Rect::new(
                (m.x as f64 / scale).round() as i32,
                (m.y as f64 / scale).round() as i32,
                ((m.width as f64 / scale).round() as u32).max(1),
                ((m.height as f64 / scale).round() as u32).max(1),
            );
            LogicalScreen::new(geometry, scale)
        })
        .collect()
}

/// `watch` 인자 → 캡처 영역. 아무것도 지정하지 않으면 `None` (기본 영역)
pub fn resolve_target(
    args: &WatchArgs,
    source: &dyn CaptureSource,
    monitors: Arc<dyn MonitorProvider>,
    window_limit: usize,
) -> Result<Option<CaptureRegion>> {
    if let Some(id) = args.window {
        let handle = WindowHandle(id);
        let roi = match args.roi {
            None => None,
            Some(rect) => {
                let (reference_width, reference_height) = match args.roi_ref {
                    Some(size) => size,
                    None => {
                        let windows = source.list_windows(window_limit)?;
                        let window = windows
                            .iter()
                            .find(|w| w.handle == handle)
                            .ok_or_else(|| anyhow!("창 #{id}을(를) 찾을 수 없습니다"))?;
                        (window.rect.width, window.rect.height)
                    }
                };
                Some(WindowRoi {
                    rect,
                    reference_width,
                    reference_height,
                })
            }
        };
        return Ok(Some(CaptureRegion::Window { handle, roi }));
    }

    let Some(logical) = args.rect else {
        return Ok(None);
    };
    let native = monitors.native_monitors().unwrap_or_else(|e| {
        warn!("모니터 열거 실패, 논리 좌표를 그대로 사용: {e}");
        Vec::new()
    });
    let mapper = CoordinateMapper::new(logical_screens_for(&native, args.scale), monitors);
    let rect = mapper.logical_rect_to_native(&logical);
    debug!(
        "논리 {} → 네이티브 {}",
        report::format_rect(&logical),
        report::format_rect(&rect)
    );
    Ok(Some(CaptureRegion::Screen { rect }))
}

/// 실시간 측정. 받은 결과 수 반환
pub async fn run_watch(
    session: &mut AnalysisSession,
    output: OutputMode,
    count: Option<u64>,
    mut shutdown: StopReceiver,
) -> Result<u64> {
    if let LiveStart::Refused(message) = session.start_live()? {
        bail!(message);
    }
    let events = session.live().events();
    let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
    let mut received = 0u64;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                for event in events.try_iter() {
                    match event {
                        LoopEvent::Result(result) => {
                            println!("{}", report::format_result(&result, output));
                            received += 1;
                            session.live().acknowledge();
                        }
                        LoopEvent::Status(status) => info!("상태: {status}"),
                    }
                }
                if count.is_some_and(|n| received >= n) {
                    break;
                }
                if !session.live().is_running() {
                    warn!("분석 루프가 예기치 않게 종료됨");
                    break;
                }
            }
        }
    }

    session.stop();
    Ok(received)
}

/// 이미지 파일 분석. 완료면 `true`, 취소면 `false`
pub async fn run_image(
    session: &mut AnalysisSession,
    path: &Path,
    output: OutputMode,
    mut shutdown: StopReceiver,
) -> Result<bool> {
    let events = session.analyze_image(path)?.events();
    let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            _ = shutdown.changed(), if !cancel_sent => {
                info!("이미지 분석 취소 요청");
                session.stop();
                cancel_sent = true;
            }
            _ = ticker.tick() => {
                for event in events.try_iter() {
                    match event {
                        ImageAnalysisEvent::Progress { percent, message } => {
                            if output == OutputMode::Text {
                                eprintln!("[{percent:>3}%] {message}");
                            }
                        }
                        ImageAnalysisEvent::Finished(result) => {
                            println!("{}", report::format_result(&result, output));
                            return Ok(true);
                        }
                        ImageAnalysisEvent::Failed(message) => bail!(message),
                        ImageAnalysisEvent::Canceled => {
                            info!("이미지 분석 취소됨");
                            return Ok(false);
                        }
                    }
                }
                if session.image_job().is_some_and(|job| job.is_finished()) && events.is_empty() {
                    bail!("이미지 분석 작업이 결과 없이 종료됨");
                }
            }
        }
    }
}

/// 창 목록 출력
pub fn print_windows(source: &dyn CaptureSource, limit: usize, output: OutputMode) -> Result<()> {
    let windows = source.list_windows(limit)?;
    match output {
        OutputMode::Json => println!("{}", report::to_json_line(&windows)),
        OutputMode::Text => {
            if windows.is_empty() {
                println!("캡처 가능한 창이 없습니다");
            }
            for window in &windows {
                println!("{}", report::format_window(window));
            }
        }
    }
    Ok(())
}

/// 모니터 구성 출력
pub fn print_monitors(monitors: &dyn MonitorProvider, scale: f64, output: OutputMode) -> Result<()> {
    let native = monitors.native_monitors()?;
    let logical = logical_screens_for(&native, scale);
    let map = build_screen_monitor_map(&logical, &native);

    match output {
        OutputMode::Json => {
            let pairs: Vec<(Rect, Rect)> = map.pairs().iter().map(|(q, m)| (q.geometry, *m)).collect();
            println!("{}", report::to_json_line(&serde_json::json!({
                "native": native,
                "pairs": pairs,
            })));
        }
        OutputMode::Text => {
            for (i, m) in native.iter().enumerate() {
                println!("모니터 {i}: {}", report::format_rect(m));
            }
            for (q, m) in map.pairs() {
                println!(
                    "논리 {} (배율 {:.2}) → 네이티브 {}",
                    report::format_rect(&q.geometry),
                    q.device_pixel_ratio,
                    report::format_rect(m)
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_core::config::{AnalysisConfig, CaptureConfig};
    use chroma_core::error::{CaptureFailure, CoreError};
    use chroma_core::models::capture::WindowInfo;
    use chroma_core::models::frame::RawFrame;
    use chroma_vision::analyzer_loop::AnalyzerLoop;
    use crate::lifecycle::{Shutdown, StopReason};

    struct FakeDesktop;

    impl CaptureSource for FakeDesktop {
        fn capture(&mut self, _region: &CaptureRegion) -> Result<RawFrame, CaptureFailure> {
            Ok(RawFrame::solid_bgr8(32, 18, [255, 0, 0]))
        }

        fn virtual_screen(&self) -> Option<Rect> {
            Some(Rect::new(0, 0, 3840, 2160))
        }

        fn list_windows(&self, _limit: usize) -> Result<Vec<WindowInfo>, CoreError> {
            Ok(vec![WindowInfo {
                handle: WindowHandle(9),
                title: "editor".to_string(),
                app_name: "code".to_string(),
                rect: Rect::new(100, 100, 1200, 800),
                minimized: false,
            }])
        }
    }

    impl MonitorProvider for FakeDesktop {
        fn native_monitors(&self) -> Result<Vec<Rect>, CoreError> {
            Ok(vec![Rect::new(0, 0, 3840, 2160)])
        }
    }

    #[test]
    fn logical_screens_divide_by_scale() {
        let screens = logical_screens_for(&[Rect::new(3840, 0, 3840, 2160)], 2.0);
        assert_eq!(screens[0].geometry, Rect::new(1920, 0, 1920, 1080));
        assert_eq!(screens[0].device_pixel_ratio, 2.0);
        // 잘못된 배율은 1.0
        let same = logical_screens_for(&[Rect::new(0, 0, 100, 100)], 0.0);
        assert_eq!(same[0].geometry, Rect::new(0, 0, 100, 100));
    }

    #[test]
    fn rect_target_mapped_to_native() {
        let args = WatchArgs {
            rect: Some(Rect::new(100, 50, 200, 100)),
            scale: 2.0,
            ..WatchArgs::default()
        };
        let target = resolve_target(&args, &FakeDesktop, Arc::new(FakeDesktop), 10).unwrap();
        assert_eq!(
            target,
            Some(CaptureRegion::Screen {
                rect: Rect::new(200, 100, 400, 200)
            })
        );
    }

    #[test]
    fn window_roi_defaults_reference_to_window_size() {
        let args = WatchArgs {
            window: Some(9),
            roi: Some(Rect::new(0, 0, 300, 200)),
            ..WatchArgs::default()
        };
        let target = resolve_target(&args, &FakeDesktop, Arc::new(FakeDesktop), 10).unwrap();
        let Some(CaptureRegion::Window { handle, roi: Some(roi) }) = target else {
            panic!("창 ROI 대상이어야 함");
        };
        assert_eq!(handle, WindowHandle(9));
        assert_eq!((roi.reference_width, roi.reference_height), (1200, 800));

        let missing = WatchArgs {
            window: Some(77),
            roi: Some(Rect::new(0, 0, 10, 10)),
            ..WatchArgs::default()
        };
        assert!(resolve_target(&missing, &FakeDesktop, Arc::new(FakeDesktop), 10).is_err());
    }

    #[test]
    fn no_target_means_default_region() {
        let target =
            resolve_target(&WatchArgs::default(), &FakeDesktop, Arc::new(FakeDesktop), 10).unwrap();
        assert_eq!(target, None);
    }

    #[tokio::test]
    async fn watch_stops_after_requested_count() {
        let config = AnalysisConfig {
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let mut session = AnalysisSession::new(AnalyzerLoop::new(
            Box::new(FakeDesktop),
            config,
            CaptureConfig::default(),
        ));
        let shutdown = Shutdown::new();
        let received = tokio::time::timeout(
            Duration::from_secs(10),
            run_watch(&mut session, OutputMode::Json, Some(2), shutdown.listen()),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(received, 2);
    }

    #[tokio::test]
    async fn watch_ends_on_stop_request() {
        let mut session = AnalysisSession::new(AnalyzerLoop::new(
            Box::new(FakeDesktop),
            AnalysisConfig::default(),
            CaptureConfig::default(),
        ));
        let shutdown = Shutdown::new();
        let stop = shutdown.listen();
        let requester = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            requester.request(StopReason::Interrupt);
        });

        let received = tokio::time::timeout(
            Duration::from_secs(10),
            run_watch(&mut session, OutputMode::Json, None, stop),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(received <= 1);
        session.shutdown();
        assert!(!session.live().is_running());
    }
}
