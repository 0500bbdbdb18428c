//! 백그라운드 분석 루프.
//!
//! 전용 스레드 하나가 `캡처 → (변화 판정) → 분석 → 발행 → 대기`를 반복한다.
//! 소비자 스레드는 결과를 받고 설정을 바꾸며, 결과를 처리한 뒤 [`AnalyzerLoop::acknowledge`]를 호출한다.
//!
//! - 발행은 단일 슬롯: 직전 결과가 확인되지 않았으면 이번 결과는 버린다 (큐에 쌓지 않음)
//! - 설정/영역 변경은 다음 사이클부터 적용. 영역/모드 변경은 변화 감지 상태를 초기화하고,
//!   영역 변경은 한 번 강제 발행한다
//! - 캡처 실패는 상태 문자열로 알리고 종류별 대기 후 재시도한다. 루프는 멈추지 않는다
//! - 정지는 협조적: 사이클마다, 그리고 대기 중에 정지 플래그를 확인한다

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chroma_core::config::{
    clamp_analysis_dim, clamp_diff_threshold, clamp_interval_ms, clamp_sample_points,
    AnalysisConfig, CaptureConfig, UpdateMode, ViewNeeds, CHANGE_POLL_INTERVAL,
};
use chroma_core::error::{CaptureFailure, CoreError};
use chroma_core::models::analysis::AnalysisResult;
use chroma_core::models::capture::CaptureRegion;
use chroma_core::models::frame::RawFrame;
use chroma_core::models::geometry::Rect;
use chroma_core::ports::capture::CaptureSource;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::analyzer::{AnalysisOptions, FrameAnalyzer};
use crate::change::{reduce_frame, ChangeDetector};

/// 이벤트 채널 용량 (결과는 단일 슬롯이므로 대부분 상태 문자열)
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 대기 중 정지 플래그 확인 간격
const STOP_CHECK_SLICE: Duration = Duration::from_millis(20);

/// 루프 → 소비자 이벤트
#[derive(Debug, Clone)]
pub enum LoopEvent {
    /// 분석 결과 (처리 후 `acknowledge` 필요)
    Result(Box<AnalysisResult>),
    /// 사람이 읽는 상태 문자열
    Status(String),
}

/// 한 사이클의 결과
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 결과 발행
    Published,
    /// 발행 조건은 충족했지만 직전 결과가 미확인이라 폐기
    Dropped,
    /// 변화 감지 게이트가 보류
    Held,
    /// 캡처 실패 (종류별 재시도 대기)
    CaptureFailed(CaptureFailure),
    /// 분석 실패 (재시도 없이 다음 사이클)
    AnalysisFailed,
}

/// 다음 사이클에 적용할 변화 감지 요청. 두 플래그는 항상 함께 읽고 비운다
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PendingReset {
    reset: bool,
    force: bool,
}

/// 생산자/소비자 공유 상태
struct Shared {
    config: RwLock<AnalysisConfig>,
    region: RwLock<Option<CaptureRegion>>,
    stop: AtomicBool,
    in_flight: AtomicBool,
    pending: Mutex<PendingReset>,
}

impl Shared {
    fn request_reset(&self) {
        self.pending.lock().reset = true;
    }

    fn take_pending(&self) -> PendingReset {
        std::mem::take(&mut *self.pending.lock())
    }
}

/// 분석 루프: 스레드 핸들, 정지/발행 플래그, 변화 감지 상태를 소유
///
/// 수명 주기: `new → start → stop → join` (재시작 가능)
pub struct AnalyzerLoop {
    shared: Arc<Shared>,
    source: Arc<Mutex<Box<dyn CaptureSource>>>,
    capture_config: CaptureConfig,
    events_tx: Sender<LoopEvent>,
    events_rx: Receiver<LoopEvent>,
    worker: Option<JoinHandle<()>>,
}

impl AnalyzerLoop {
    /// 새 루프 (아직 시작하지 않음)
    pub fn new(
        source: Box<dyn CaptureSource>,
        config: AnalysisConfig,
        capture_config: CaptureConfig,
    ) -> Self {
        let (events_tx, events_rx) = channel::bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                config: RwLock::new(config.sanitized()),
                region: RwLock::new(None),
                stop: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                pending: Mutex::new(PendingReset::default()),
            }),
            source: Arc::new(Mutex::new(source)),
            capture_config,
            events_tx,
            events_rx,
            worker: None,
        }
    }

    /// 이벤트 수신기
    pub fn events(&self) -> Receiver<LoopEvent> {
        self.events_rx.clone()
    }

    /// 루프 스레드 시작. 이미 실행 중이면 `false`
    pub fn start(&mut self) -> Result<bool, CoreError> {
        // 정지 요청된 스레드는 아직 대기/캡처 중일 수 있으므로 끝날 때까지 기다린다
        if self.shared.stop.load(Ordering::SeqCst) {
            self.join();
        }
        if self.is_running() {
            return Ok(false);
        }
        self.join();

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.in_flight.store(false, Ordering::SeqCst);
        self.shared.request_reset();

        let worker = self.worker();
        let handle = thread::Builder::new()
            .name("chroma-analyzer".to_string())
            .spawn(move || worker.run())
            .map_err(|e| CoreError::Internal(format!("분석 스레드 생성 실패: {e}")))?;
        self.worker = Some(handle);
        send_status(&self.events_tx, "측정 시작");
        Ok(true)
    }

    /// 정지 요청 (현재 캡처가 끝난 뒤 스레드 종료)
    pub fn stop(&self) {
        if !self.shared.stop.swap(true, Ordering::SeqCst) && self.worker.is_some() {
            info!("분석 루프 정지 요청");
            send_status(&self.events_tx, "정지");
        }
    }

    /// 스레드 종료 대기
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("분석 스레드가 비정상 종료됨");
            }
        }
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 소비자가 결과 처리를 마침 → 다음 결과 발행 허용
    pub fn acknowledge(&self) {
        self.shared.in_flight.store(false, Ordering::SeqCst);
    }

    /// 미확인 결과가 있는지
    pub fn in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// 현재 설정 스냅샷
    pub fn config(&self) -> AnalysisConfig {
        self.shared.config.read().clone()
    }

    /// 현재 캡처 영역
    pub fn region(&self) -> Option<CaptureRegion> {
        self.shared.region.read().clone()
    }

    /// 설정 전체 교체. 모드가 바뀌면 변화 감지 초기화
    pub fn set_config(&self, config: AnalysisConfig) {
        let config = config.sanitized();
        let mut current = self.shared.config.write();
        if current.update_mode != config.update_mode {
            self.shared.request_reset();
        }
        *current = config;
    }

    /// 캡처 대상 교체 (`None`이면 기본 화면 영역). 변화 감지 초기화 + 한 번 강제 발행
    pub fn set_region(&self, region: Option<CaptureRegion>) {
        if let Some(r) = &region {
            info!("캡처 대상 변경: {}", r.describe());
        }
        let mut slot = self.shared.region.write();
        *slot = region;
        *self.shared.pending.lock() = PendingReset {
            reset: true,
            force: true,
        };
    }

    /// 갱신 모드
    pub fn set_mode(&self, mode: UpdateMode) {
        let mut config = self.shared.config.write();
        if config.update_mode != mode {
            config.update_mode = mode;
            self.shared.request_reset();
        }
    }

    /// 분석 주기
    pub fn set_interval(&self, interval: Duration) {
        self.shared.config.write().interval_ms = clamp_interval_ms(interval.as_millis() as u64);
    }

    /// 산점도 샘플 수
    pub fn set_sample_points(&self, n: usize) {
        self.shared.config.write().sample_points = clamp_sample_points(n);
    }

    /// 분석 해상도 (0 = 제한 없음)
    pub fn set_max_analysis_dim(&self, dim: u32) {
        self.shared.config.write().max_analysis_dim = clamp_analysis_dim(dim);
    }

    /// 색상환 포함 최소 채도
    pub fn set_wheel_saturation_threshold(&self, threshold: u8) {
        self.shared.config.write().wheel_saturation_threshold = threshold;
    }

    /// 그래프 갱신 간격 (프레임)
    pub fn set_graph_every(&self, n: u32) {
        self.shared.config.write().graph_every = n.max(1);
    }

    /// 변화 판정 임계값
    pub fn set_diff_threshold(&self, threshold: f32) {
        self.shared.config.write().diff_threshold = clamp_diff_threshold(threshold);
    }

    /// 발행 전 연속 안정 프레임 수
    pub fn set_stable_frames(&self, n: u32) {
        self.shared.config.write().stable_frames = n.max(1);
    }

    /// 필요한 뷰
    pub fn set_views(&self, views: ViewNeeds) {
        self.shared.config.write().views = views;
    }

    /// 루프 밖에서 현재 영역을 한 번 캡처 (미리보기용)
    pub fn capture_once(&self) -> Result<RawFrame, CaptureFailure> {
        let region = resolve_region(&self.shared, &self.source, &self.capture_config)
            .ok_or_else(|| CaptureFailure::BackendError("캡처할 화면을 찾을 수 없음".to_string()))?;
        self.source.lock().capture(&region)
    }

    fn worker(&self) -> Worker {
        let config = self.shared.config.read();
        Worker {
            shared: Arc::clone(&self.shared),
            source: Arc::clone(&self.source),
            capture_config: self.capture_config.clone(),
            events: self.events_tx.clone(),
            detector: ChangeDetector::new(config.diff_threshold, config.stable_frames),
            frame_counter: 0,
        }
    }
}

impl Drop for AnalyzerLoop {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.join();
    }
}

/// 루프 스레드 쪽 상태
struct Worker {
    shared: Arc<Shared>,
    source: Arc<Mutex<Box<dyn CaptureSource>>>,
    capture_config: CaptureConfig,
    events: Sender<LoopEvent>,
    detector: ChangeDetector,
    frame_counter: u64,
}

impl Worker {
    fn run(mut self) {
        info!("분석 루프 시작");
        while !self.shared.stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            let config = self.shared.config.read().clone();
            let outcome = self.cycle(&config, started);
            let delay = next_delay(&outcome, &config, started.elapsed());
            self.sleep(delay);
        }
        info!("분석 루프 종료");
    }

    /// 한 사이클 실행
    fn cycle(&mut self, config: &AnalysisConfig, now: Instant) -> CycleOutcome {
        let pending = self.shared.take_pending();
        if pending.reset {
            // 아직 발행하지 못한 강제 발행은 초기화 후에도 유지
            let force_kept = self.detector.state().force_emit_once;
            self.detector.reset();
            self.frame_counter = 0;
            if force_kept {
                self.detector.request_force_emit();
            }
        }
        if pending.force {
            self.detector.request_force_emit();
        }
        self.detector
            .set_thresholds(config.diff_threshold, config.stable_frames);

        let Some(region) = resolve_region(&self.shared, &self.source, &self.capture_config) else {
            let failure = CaptureFailure::BackendError("캡처할 화면을 찾을 수 없음".to_string());
            send_status(&self.events, &failure.to_string());
            return CycleOutcome::CaptureFailed(failure);
        };

        let frame = match self.source.lock().capture(&region) {
            Ok(frame) => frame,
            Err(failure) => {
                send_status(&self.events, &failure.to_string());
                return CycleOutcome::CaptureFailed(failure);
            }
        };
        self.frame_counter += 1;

        let full_update = match config.update_mode {
            UpdateMode::Interval => {
                self.detector.state().force_emit_once
                    || self.frame_counter % u64::from(config.graph_every.max(1)) == 0
            }
            UpdateMode::Change => {
                let planes = match reduce_frame(&frame) {
                    Ok(planes) => planes,
                    Err(e) => {
                        send_status(&self.events, &format!("변화 감지 실패: {e}"));
                        return CycleOutcome::AnalysisFailed;
                    }
                };
                if !self.detector.observe(planes, now).should_emit() {
                    return CycleOutcome::Held;
                }
                true
            }
        };

        if self.shared.in_flight.load(Ordering::SeqCst) {
            debug!("직전 결과 미확인, 이번 결과 폐기");
            return CycleOutcome::Dropped;
        }

        let analyzer = FrameAnalyzer::new(AnalysisOptions {
            full_update,
            ..AnalysisOptions::from_config(config)
        });
        let mut result = match analyzer.analyze(&frame) {
            Ok(result) => result,
            Err(e) => {
                warn!("프레임 분석 실패: {e}");
                send_status(&self.events, &format!("분석 실패: {e}"));
                return CycleOutcome::AnalysisFailed;
            }
        };
        result.elapsed_ms = now.elapsed().as_secs_f64() * 1000.0;

        if !self.publish(result) {
            return CycleOutcome::Dropped;
        }
        self.detector.commit_emit(now, config.interval());
        CycleOutcome::Published
    }

    /// 단일 슬롯 발행
    fn publish(&self, result: AnalysisResult) -> bool {
        self.shared.in_flight.store(true, Ordering::SeqCst);
        match self.events.try_send(LoopEvent::Result(Box::new(result))) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("이벤트 채널 가득 참, 결과 폐기");
                self.shared.in_flight.store(false, Ordering::SeqCst);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.in_flight.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// 정지 플래그를 보며 대기
    fn sleep(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            if self.shared.stop.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
        }
    }
}

/// 현재 영역. 지정되지 않았으면 가상 화면 중앙 기본 영역을 채택 (강제 발행 없음)
fn resolve_region(
    shared: &Shared,
    source: &Mutex<Box<dyn CaptureSource>>,
    capture_config: &CaptureConfig,
) -> Option<CaptureRegion> {
    if let Some(region) = shared.region.read().clone() {
        return Some(region);
    }
    let screen = source.lock().virtual_screen()?;
    let rect = Rect::centered_in(
        &screen,
        capture_config.default_roi_width,
        capture_config.default_roi_height,
    );

    let mut slot = shared.region.write();
    if slot.is_none() {
        info!("기본 캡처 영역 사용: {}x{}+{}+{}", rect.width, rect.height, rect.x, rect.y);
        *slot = Some(CaptureRegion::Screen { rect });
    }
    slot.clone()
}

/// 다음 사이클까지 대기 시간
///
/// - 캡처 실패: 종류별 재시도 대기
/// - 고정 주기 모드: 주기 − 처리 시간 (음수면 0)
/// - 변화 감지 모드: 고정 폴링 간격
pub fn next_delay(outcome: &CycleOutcome, config: &AnalysisConfig, elapsed: Duration) -> Duration {
    if let CycleOutcome::CaptureFailed(failure) = outcome {
        return failure.retry_delay();
    }
    match config.update_mode {
        UpdateMode::Interval => config.interval().saturating_sub(elapsed),
        UpdateMode::Change => CHANGE_POLL_INTERVAL,
    }
}

fn send_status(events: &Sender<LoopEvent>, message: &str) {
    // 상태 문자열은 채널이 가득 차면 버린다
    let _ = events.try_send(LoopEvent::Status(message.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_core::models::capture::WindowHandle;
    use std::collections::VecDeque;

    /// 스크립트된 캡처 결과를 돌려주는 가짜 소스
    struct ScriptedSource {
        script: VecDeque<Result<RawFrame, CaptureFailure>>,
        fallback: RawFrame,
        screen: Option<Rect>,
    }

    impl ScriptedSource {
        fn solid(bgr: [u8; 3]) -> Self {
            Self {
                script: VecDeque::new(),
                fallback: RawFrame::solid_bgr8(64, 48, bgr),
                screen: Some(Rect::new(0, 0, 1920, 1080)),
            }
        }

        fn then(mut self, step: Result<RawFrame, CaptureFailure>) -> Self {
            self.script.push_back(step);
            self
        }
    }

    impl CaptureSource for ScriptedSource {
        fn capture(&mut self, _region: &CaptureRegion) -> Result<RawFrame, CaptureFailure> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        fn virtual_screen(&self) -> Option<Rect> {
            self.screen
        }
    }

    fn make_loop(source: ScriptedSource, config: AnalysisConfig) -> AnalyzerLoop {
        AnalyzerLoop::new(Box::new(source), config, CaptureConfig::default())
    }

    fn results_in(rx: &Receiver<LoopEvent>) -> usize {
        rx.try_iter()
            .filter(|e| matches!(e, LoopEvent::Result(_)))
            .count()
    }

    #[test]
    fn default_region_is_centered_on_virtual_screen() {
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), AnalysisConfig::default());
        let mut worker = lp.worker();
        assert_eq!(worker.cycle(&lp.config(), Instant::now()), CycleOutcome::Published);
        assert_eq!(
            lp.region(),
            Some(CaptureRegion::Screen {
                rect: Rect::new(640, 360, 640, 360)
            })
        );
    }

    #[test]
    fn unacknowledged_result_blocks_further_publishing() {
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), AnalysisConfig::default());
        let rx = lp.events();
        let mut worker = lp.worker();
        let config = lp.config();

        assert_eq!(worker.cycle(&config, Instant::now()), CycleOutcome::Published);
        for _ in 0..50 {
            assert_eq!(worker.cycle(&config, Instant::now()), CycleOutcome::Dropped);
        }
        assert!(lp.in_flight());
        assert_eq!(results_in(&rx), 1);

        lp.acknowledge();
        assert_eq!(worker.cycle(&config, Instant::now()), CycleOutcome::Published);
        assert_eq!(results_in(&rx), 1);
    }

    #[test]
    fn capture_failure_reports_status_and_backs_off() {
        let source = ScriptedSource::solid([0, 0, 255]).then(Err(CaptureFailure::WindowMinimized));
        let lp = make_loop(source, AnalysisConfig::default());
        lp.set_region(Some(CaptureRegion::Window {
            handle: WindowHandle(7),
            roi: None,
        }));
        let rx = lp.events();
        let mut worker = lp.worker();
        let config = lp.config();

        let outcome = worker.cycle(&config, Instant::now());
        assert_eq!(outcome, CycleOutcome::CaptureFailed(CaptureFailure::WindowMinimized));
        assert_eq!(
            next_delay(&outcome, &config, Duration::ZERO),
            Duration::from_millis(500)
        );
        let statuses: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                LoopEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![CaptureFailure::WindowMinimized.to_string()]);

        // 다음 사이클은 정상 복귀, 대상 변경의 강제 발행도 유지됨
        assert_eq!(worker.cycle(&config, Instant::now()), CycleOutcome::Published);
    }

    #[test]
    fn change_mode_emits_on_target_change_then_waits_for_new_change() {
        let config = AnalysisConfig {
            update_mode: UpdateMode::Change,
            stable_frames: 2,
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), config);
        let rx = lp.events();
        lp.set_region(Some(CaptureRegion::Screen {
            rect: Rect::new(0, 0, 64, 48),
        }));
        let mut worker = lp.worker();
        let config = lp.config();
        let t0 = Instant::now();

        // 강제 발행
        assert_eq!(worker.cycle(&config, t0), CycleOutcome::Published);
        lp.acknowledge();
        // 같은 화면: 이미 발행됨
        for i in 1..10 {
            let now = t0 + Duration::from_millis(100 * i);
            assert_eq!(worker.cycle(&config, now), CycleOutcome::Held);
        }
        assert_eq!(results_in(&rx), 1);

        // 대상 변경 → 다시 한 번 강제 발행
        lp.set_region(Some(CaptureRegion::Screen {
            rect: Rect::new(10, 10, 64, 48),
        }));
        assert_eq!(
            worker.cycle(&config, t0 + Duration::from_secs(2)),
            CycleOutcome::Published
        );
    }

    #[test]
    fn change_mode_emits_once_after_settling() {
        let config = AnalysisConfig {
            update_mode: UpdateMode::Change,
            stable_frames: 3,
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let lp = make_loop(ScriptedSource::solid([0, 200, 0]), config);
        let mut worker = lp.worker();
        let config = lp.config();
        let t0 = Instant::now();

        // 기본 영역 채택은 강제 발행하지 않음
        let outcomes: Vec<CycleOutcome> = (0..6)
            .map(|i| {
                let outcome = worker.cycle(&config, t0 + Duration::from_millis(100 * i));
                lp.acknowledge();
                outcome
            })
            .collect();
        assert_eq!(
            outcomes,
            vec![
                CycleOutcome::Held,
                CycleOutcome::Held,
                CycleOutcome::Held,
                CycleOutcome::Published,
                CycleOutcome::Held,
                CycleOutcome::Held,
            ]
        );
    }

    #[test]
    fn graph_updates_every_nth_frame_in_interval_mode() {
        let config = AnalysisConfig {
            graph_every: 2,
            ..AnalysisConfig::default()
        };
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), config);
        let rx = lp.events();
        let mut worker = lp.worker();
        let config = lp.config();

        let mut full_flags = Vec::new();
        for _ in 0..4 {
            assert_eq!(worker.cycle(&config, Instant::now()), CycleOutcome::Published);
            for event in rx.try_iter() {
                if let LoopEvent::Result(r) = event {
                    full_flags.push(r.is_full_update);
                }
            }
            lp.acknowledge();
        }
        assert_eq!(full_flags, vec![false, true, false, true]);
    }

    #[test]
    fn mode_change_resets_detector() {
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), AnalysisConfig::default());
        let mut worker = lp.worker();
        let config = lp.config();
        worker.cycle(&config, Instant::now());
        assert_eq!(worker.frame_counter, 1);

        lp.set_mode(UpdateMode::Change);
        let config = lp.config();
        worker.cycle(&config, Instant::now());
        // 초기화 후 첫 프레임
        assert_eq!(worker.frame_counter, 1);
        assert!(worker.detector.state().previous.is_some());
    }

    #[test]
    fn delays_follow_mode() {
        let interval = AnalysisConfig {
            interval_ms: 1_000,
            ..AnalysisConfig::default()
        };
        assert_eq!(
            next_delay(&CycleOutcome::Published, &interval, Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(
            next_delay(&CycleOutcome::Published, &interval, Duration::from_secs(5)),
            Duration::ZERO
        );
        let change = AnalysisConfig {
            update_mode: UpdateMode::Change,
            ..interval
        };
        assert_eq!(
            next_delay(&CycleOutcome::Held, &change, Duration::ZERO),
            CHANGE_POLL_INTERVAL
        );
    }

    #[test]
    fn setters_clamp_values() {
        let lp = make_loop(ScriptedSource::solid([0, 0, 0]), AnalysisConfig::default());
        lp.set_interval(Duration::from_millis(1));
        lp.set_sample_points(1);
        lp.set_max_analysis_dim(10);
        lp.set_stable_frames(0);
        lp.set_graph_every(0);
        lp.set_diff_threshold(f32::NAN);
        let config = lp.config();
        assert_eq!(config.interval_ms, 50);
        assert_eq!(config.sample_points, 500);
        assert_eq!(config.max_analysis_dim, 120);
        assert_eq!(config.stable_frames, 1);
        assert_eq!(config.graph_every, 1);
        assert_eq!(config.diff_threshold, 4.0);
    }

    #[test]
    fn capture_once_uses_current_region() {
        let lp = make_loop(ScriptedSource::solid([1, 2, 3]), AnalysisConfig::default());
        let frame = lp.capture_once().unwrap();
        assert_eq!(&frame.as_bgr8().unwrap()[..3], &[1u8, 2, 3][..]);
        assert!(!lp.is_running());
    }

    fn next_result(rx: &Receiver<LoopEvent>, timeout: Duration) -> Option<Box<AnalysisResult>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(LoopEvent::Result(result)) = rx.recv_timeout(Duration::from_millis(50)) {
                return Some(result);
            }
        }
        None
    }

    #[test]
    fn region_change_sets_reset_and_force_together() {
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), AnalysisConfig::default());
        lp.set_region(Some(CaptureRegion::Screen {
            rect: Rect::new(0, 0, 64, 48),
        }));
        assert_eq!(
            lp.shared.take_pending(),
            PendingReset {
                reset: true,
                force: true
            }
        );
        assert_eq!(lp.shared.take_pending(), PendingReset::default());

        lp.set_mode(UpdateMode::Change);
        assert_eq!(
            lp.shared.take_pending(),
            PendingReset {
                reset: true,
                force: false
            }
        );
    }

    #[test]
    fn dropped_forced_emission_survives_later_reset() {
        let config = AnalysisConfig {
            update_mode: UpdateMode::Change,
            stable_frames: 3,
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let lp = make_loop(ScriptedSource::solid([0, 0, 255]), config);
        let rx = lp.events();
        let mut worker = lp.worker();
        let config = lp.config();
        let t0 = Instant::now();

        // 소비자가 아직 직전 결과를 처리 중
        lp.shared.in_flight.store(true, Ordering::SeqCst);
        lp.set_region(Some(CaptureRegion::Screen {
            rect: Rect::new(0, 0, 64, 48),
        }));
        assert_eq!(worker.cycle(&config, t0), CycleOutcome::Dropped);

        // 확인 전에 초기화 요청이 들어와도 강제 발행은 남아 있어야 함
        lp.shared.request_reset();
        lp.acknowledge();
        assert_eq!(
            worker.cycle(&config, t0 + Duration::from_millis(100)),
            CycleOutcome::Published
        );
        assert_eq!(results_in(&rx), 1);
    }

    #[test]
    fn restart_immediately_after_stop() {
        let config = AnalysisConfig {
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let mut lp = make_loop(ScriptedSource::solid([0, 0, 255]), config);
        let rx = lp.events();
        assert!(lp.start().unwrap());
        assert!(next_result(&rx, Duration::from_secs(5)).is_some());

        // 정지 직후 바로 재시작: 이전 스레드가 대기 중이어도 새로 시작해야 함
        lp.stop();
        assert!(lp.start().unwrap());
        assert!(lp.is_running());
        assert!(next_result(&rx, Duration::from_secs(5)).is_some());

        lp.stop();
        lp.join();
        assert!(!lp.is_running());
    }

    #[test]
    fn thread_publishes_and_stops() {
        let config = AnalysisConfig {
            interval_ms: 50,
            ..AnalysisConfig::default()
        };
        let mut lp = make_loop(ScriptedSource::solid([0, 0, 255]), config);
        let rx = lp.events();
        assert!(lp.start().unwrap());
        assert!(!lp.start().unwrap());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = 0;
        while received < 2 && Instant::now() < deadline {
            if let Ok(LoopEvent::Result(result)) = rx.recv_timeout(Duration::from_millis(200)) {
                assert!((result.warm_ratio - 1.0).abs() < 1e-9);
                received += 1;
                lp.acknowledge();
            }
        }
        assert_eq!(received, 2);

        lp.stop();
        lp.join();
        assert!(!lp.is_running());
    }
}
