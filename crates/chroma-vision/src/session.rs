//! 분석 세션: 실시간 루프와 이미지 파일 분석의 상호 배타 관리.
//!
//! 이미지 분석을 시작하면 실시간 루프를 멈추고, 이미지 분석 중에는 실시간 측정을 시작하지 않는다.

use std::path::PathBuf;

use chroma_core::error::CoreError;
use tracing::{info, warn};

use crate::analyzer::AnalysisOptions;
use crate::analyzer_loop::AnalyzerLoop;
use crate::image_file::{ImageAnalysisJob, ImageFileAnalyzer};

/// 실시간 측정 시작 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStart {
    /// 시작됨
    Started,
    /// 이미 실행 중
    AlreadyRunning,
    /// 이미지 분석 중이라 거부 (상태 문자열)
    Refused(String),
}

/// 분석 세션
pub struct AnalysisSession {
    live: AnalyzerLoop,
    image_job: Option<ImageAnalysisJob>,
}

impl AnalysisSession {
    /// 새 세션
    pub fn new(live: AnalyzerLoop) -> Self {
        Self {
            live,
            image_job: None,
        }
    }

    /// 실시간 루프 참조
    pub fn live(&self) -> &AnalyzerLoop {
        &self.live
    }

    /// 진행 중인 이미지 작업
    pub fn image_job(&self) -> Option<&ImageAnalysisJob> {
        self.image_job.as_ref()
    }

    /// 이미지 분석 진행 중 여부
    pub fn image_busy(&mut self) -> bool {
        self.reap_image_job();
        self.image_job.is_some()
    }

    /// 실시간 측정 시작
    pub fn start_live(&mut self) -> Result<LiveStart, CoreError> {
        if self.image_busy() {
            let message = "이미지 분석 중에는 측정을 시작할 수 없습니다".to_string();
            warn!("{message}");
            return Ok(LiveStart::Refused(message));
        }
        Ok(if self.live.start()? {
            LiveStart::Started
        } else {
            LiveStart::AlreadyRunning
        })
    }

    /// 이미지 파일 분석 시작. 실시간 루프는 정지
    pub fn analyze_image(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<&ImageAnalysisJob, CoreError> {
        if self.image_busy() {
            return Err(CoreError::Validation {
                field: "image".to_string(),
                message: "이미 이미지 분석이 진행 중입니다".to_string(),
            });
        }
        if self.live.is_running() {
            info!("이미지 분석을 위해 실시간 측정 정지");
            self.live.stop();
            self.live.join();
        }

        let options = AnalysisOptions::from_config(&self.live.config());
        let job = ImageFileAnalyzer::new(options).spawn(path)?;
        Ok(self.image_job.insert(job))
    }

    /// 정지: 이미지 작업은 취소 요청, 실시간 루프는 정지
    pub fn stop(&mut self) {
        if let Some(job) = &self.image_job {
            info!("이미지 분석 취소 요청: {}", job.id());
            job.cancel();
        }
        self.live.stop();
    }

    /// 모든 스레드 종료 대기
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(mut job) = self.image_job.take() {
            job.join();
        }
        self.live.join();
    }

    fn reap_image_job(&mut self) {
        if self.image_job.as_ref().is_some_and(ImageAnalysisJob::is_finished) {
            if let Some(mut job) = self.image_job.take() {
                job.join();
            }
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
