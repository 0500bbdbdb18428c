//! 정지 이미지 파일 분석.
//!
//! 파일 하나를 디코딩해 `FrameAnalyzer`를 한 번 실행한다. 원본 비트 깊이(8/16비트, float)는
//! 유지하고 채널만 BGR 3채널로 맞춘다. 아주 큰 이미지는 긴 변 3072px로 먼저 줄인다.
//!
//! 진행률: 1% 로딩 → 8% 준비 → 분석기 마일스톤(15~85%) → 100% 완료.
//! 단계 사이마다 취소를 확인하고, 취소되면 `Ok(None)`.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chroma_core::config::IMAGE_FILE_MAX_DIM;
use chroma_core::error::{AnalysisFailure, CoreError};
use chroma_core::models::analysis::AnalysisResult;
use chroma_core::models::frame::{PixelData, RawFrame, CHANNELS};
use chroma_core::models::geometry::Rect;
use chroma_core::ports::progress::{CancelCheck, CancelToken, ProgressReporter};
use crossbeam::channel::{self, Receiver, Sender};
use image::DynamicImage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analyzer::{AnalysisOptions, FrameAnalyzer};
use crate::resize::resize_long_edge;

/// 이미지 분석 작업 → 소비자 이벤트
#[derive(Debug, Clone)]
pub enum ImageAnalysisEvent {
    /// 진행률
    Progress {
        /// 0~100
        percent: u8,
        /// 상태 문구
        message: String,
    },
    /// 분석 완료
    Finished(Box<AnalysisResult>),
    /// 실패 (사용자용 메시지)
    Failed(String),
    /// 취소됨
    Canceled,
}

/// 이미지 파일 분석기
///
/// 실시간 측정의 `max_analysis_dim`은 적용하지 않는다. 해상도 상한은 디코딩 시의
/// [`IMAGE_FILE_MAX_DIM`] 하나뿐이다.
#[derive(Debug, Clone)]
pub struct ImageFileAnalyzer {
    options: AnalysisOptions,
}

impl Default for ImageFileAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl ImageFileAnalyzer {
    /// 새 분석기 (그래프는 항상 전체 갱신, 디코딩된 해상도 그대로 분석)
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options: AnalysisOptions {
                full_update: true,
                max_analysis_dim: 0,
                ..options
            },
        }
    }

    /// 실제 적용되는 분석 옵션
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// 현재 스레드에서 분석. 취소되면 `Ok(None)`
    pub fn run(
        &self,
        path: &Path,
        progress: &dyn ProgressReporter,
        cancel: &dyn CancelCheck,
    ) -> Result<Option<AnalysisResult>, CoreError> {
        let started = Instant::now();

        progress.report(1, "이미지 로딩 중…");
        if cancel.is_canceled() {
            return Ok(None);
        }
        let frame = load_image_frame(path)?;

        progress.report(8, &format!("분석 준비 중… ({}x{})", frame.width, frame.height));
        if cancel.is_canceled() {
            return Ok(None);
        }

        let analyzer = FrameAnalyzer::new(self.options.clone());
        let Some(mut result) = analyzer.analyze_with(&frame, progress, cancel)? else {
            return Ok(None);
        };
        result.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        progress.report(100, "분석 완료");
        if cancel.is_canceled() {
            return Ok(None);
        }
        info!(
            "이미지 분석 완료: {} ({}x{}, {:.0}ms)",
            path.display(),
            frame.width,
            frame.height,
            result.elapsed_ms
        );
        Ok(Some(result))
    }

    /// 전용 스레드에서 분석 시작
    pub fn spawn(&self, path: impl Into<PathBuf>) -> Result<ImageAnalysisJob, CoreError> {
        let path = path.into();
        let id = Uuid::new_v4();
        let cancel = CancelToken::new();
        let (tx, rx) = channel::unbounded();

        let analyzer = self.clone();
        let worker_path = path.clone();
        let worker_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name(format!("chroma-image-{}", &id.simple().to_string()[..8]))
            .spawn(move || analyzer.run_job(&worker_path, &worker_cancel, &tx))
            .map_err(|e| CoreError::Internal(format!("이미지 분석 스레드 생성 실패: {e}")))?;

        debug!("이미지 분석 작업 시작: {id} {}", path.display());
        Ok(ImageAnalysisJob {
            id,
            path,
            cancel,
            events: rx,
            handle: Some(handle),
        })
    }

    fn run_job(&self, path: &Path, cancel: &CancelToken, tx: &Sender<ImageAnalysisEvent>) {
        let progress = |percent: u8, message: &str| {
            let _ = tx.send(ImageAnalysisEvent::Progress {
                percent,
                message: message.to_string(),
            });
        };

        let event = match self.run(path, &progress, cancel) {
            Ok(Some(result)) => ImageAnalysisEvent::Finished(Box::new(result)),
            Ok(None) => {
                info!("이미지 분석 취소: {}", path.display());
                ImageAnalysisEvent::Canceled
            }
            Err(CoreError::Analysis(failure)) => {
                warn!("이미지 분석 실패: {failure}");
                ImageAnalysisEvent::Failed(failure.to_string())
            }
            Err(e) => {
                error!("이미지 분석 중 예기치 않은 오류: {e}");
                ImageAnalysisEvent::Failed(format!("분석 실패: {e}"))
            }
        };
        let _ = tx.send(event);
    }
}

/// 실행 중인 이미지 분석 작업 핸들
#[derive(Debug)]
pub struct ImageAnalysisJob {
    id: Uuid,
    path: PathBuf,
    cancel: CancelToken,
    events: Receiver<ImageAnalysisEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ImageAnalysisJob {
    /// 작업 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 분석 중인 파일
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 취소 요청 (다음 마일스톤에서 반영)
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 이벤트 수신기
    pub fn events(&self) -> Receiver<ImageAnalysisEvent> {
        self.events.clone()
    }

    /// 스레드 종료 여부
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// 스레드 종료 대기
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("이미지 분석 스레드가 비정상 종료됨: {}", self.id);
            }
        }
    }
}

/// 파일을 읽어 BGR 프레임으로 디코딩 (긴 변 상한 적용)
pub fn load_image_frame(path: &Path) -> Result<RawFrame, CoreError> {
    let bytes = std::fs::read(path).map_err(|e| {
        AnalysisFailure::DecodeFailure(format!("{}: {e}", path.display()))
    })?;
    decode_image_frame(&bytes)
}

/// 메모리의 인코딩된 이미지를 BGR 프레임으로 디코딩 (긴 변 상한 적용)
pub fn decode_image_frame(bytes: &[u8]) -> Result<RawFrame, CoreError> {
    if bytes.is_empty() {
        return Err(AnalysisFailure::DecodeFailure("빈 파일".to_string()).into());
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| AnalysisFailure::DecodeFailure(e.to_string()))?;
    let frame = dynamic_to_frame(image)?;
    if frame.is_empty() {
        return Err(AnalysisFailure::EmptyFrame.into());
    }

    let capped = resize_long_edge(&frame, IMAGE_FILE_MAX_DIM)?;
    if capped.width != frame.width {
        debug!(
            "큰 이미지 축소: {}x{} → {}x{}",
            frame.width, frame.height, capped.width, capped.height
        );
    }
    Ok(capped.into_owned())
}

/// 디코딩된 이미지 → BGR 프레임. 비트 깊이 유지, 알파 버림, 회색조는 3채널로 복제
fn dynamic_to_frame(image: DynamicImage) -> Result<RawFrame, CoreError> {
    let (width, height) = (image.width(), image.height());
    let pixels = match image {
        DynamicImage::ImageLuma8(buf) => PixelData::U8(interleave_bgr(buf.as_raw(), 1)),
        DynamicImage::ImageLumaA8(buf) => PixelData::U8(interleave_bgr(buf.as_raw(), 2)),
        DynamicImage::ImageRgb8(buf) => PixelData::U8(interleave_bgr(buf.as_raw(), 3)),
        DynamicImage::ImageRgba8(buf) => PixelData::U8(interleave_bgr(buf.as_raw(), 4)),
        DynamicImage::ImageLuma16(buf) => PixelData::U16(interleave_bgr(buf.as_raw(), 1)),
        DynamicImage::ImageLumaA16(buf) => PixelData::U16(interleave_bgr(buf.as_raw(), 2)),
        DynamicImage::ImageRgb16(buf) => PixelData::U16(interleave_bgr(buf.as_raw(), 3)),
        DynamicImage::ImageRgba16(buf) => PixelData::U16(interleave_bgr(buf.as_raw(), 4)),
        DynamicImage::ImageRgb32F(buf) => PixelData::F32(interleave_bgr(buf.as_raw(), 3)),
        DynamicImage::ImageRgba32F(buf) => PixelData::F32(interleave_bgr(buf.as_raw(), 4)),
        other => PixelData::U8(interleave_bgr(other.to_rgb8().as_raw(), 3)),
    };
    RawFrame::new(width, height, pixels, Rect::new(0, 0, width, height))
}

/// 1/2/3/4 채널 인터리브(회색, 회색+알파, RGB, RGBA) → BGR 인터리브
fn interleave_bgr<T: Copy>(samples: &[T], channels: usize) -> Vec<T> {
    let mut bgr = Vec::with_capacity(samples.len() / channels * CHANNELS);
    for px in samples.chunks_exact(channels) {
        match channels {
            1 | 2 => bgr.extend_from_slice(&[px[0], px[0], px[0]]),
            _ => bgr.extend_from_slice(&[px[2], px[1], px[0]]),
        }
    }
    bgr
}
