//! # chroma-app
//!
//! Chroma Monitor 바이너리 진입점.
//! 설정 로드, 로깅 초기화, 캡처/분석 구성 요소 와이어링, 라이프사이클 관리.

mod cli;
mod lifecycle;
mod report;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chroma_core::config_manager::ConfigManager;
use chroma_vision::analyzer_loop::AnalyzerLoop;
use chroma_vision::capture::ScreenCapture;
use chroma_vision::session::AnalysisSession;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::lifecycle::Shutdown;
use crate::report::OutputMode;

/// 설정 관리자 생성. 플랫폼 기본 경로를 쓸 수 없으면 임시 디렉토리로 대체
fn open_config(path: Option<PathBuf>) -> Result<ConfigManager> {
    if let Some(path) = path {
        return ConfigManager::with_path(path).map_err(|e| anyhow!("설정 파일 로드 실패: {e}"));
    }
    ConfigManager::new().or_else(|e| {
        warn!("설정 관리자 초기화 실패, 임시 경로 사용: {e}");
        let fallback = std::env::temp_dir().join("chroma-monitor").join("config.json");
        ConfigManager::with_path(fallback).map_err(|e| anyhow!("설정 관리자 생성 실패: {e}"))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 결과는 stdout, 로그는 stderr
    let log_filter = format!(
        "chroma_monitor={},chroma_app={},chroma_core={},chroma_vision={}",
        args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    // 설정 로드 + CLI 재정의
    let config_manager = open_config(args.config.clone())?;
    info!("설정 파일: {}", config_manager.config_path().display());
    let mut config = config_manager.get();
    args.overrides.apply(&mut config.analysis);
    if args.save_config && !args.overrides.is_empty() {
        config_manager.update(config.clone())?;
        info!("재정의한 설정 저장 완료");
    }

    let output = OutputMode::from_flag(args.json);
    let capture = ScreenCapture::new();

    match args.command {
        Command::Windows => runner::print_windows(&capture, config.capture.window_list_limit, output),
        Command::Monitors { scale } => runner::print_monitors(&capture, scale, output),
        Command::Watch(watch_args) => {
            let target = runner::resolve_target(
                &watch_args,
                &capture,
                Arc::new(ScreenCapture::new()),
                config.capture.window_list_limit,
            )?;

            let live = AnalyzerLoop::new(
                Box::new(capture),
                config.analysis.clone(),
                config.capture.clone(),
            );
            if target.is_some() {
                live.set_region(target);
            }
            let mut session = AnalysisSession::new(live);

            let shutdown = Shutdown::new();
            shutdown.spawn_signal_listener();

            info!(
                "Chroma Monitor 측정 시작 ({:?} 모드, Ctrl+C로 종료)",
                config.analysis.update_mode
            );
            let received =
                runner::run_watch(&mut session, output, watch_args.count, shutdown.listen())
                    .await?;
            session.shutdown();
            if let Some(reason) = shutdown.reason() {
                info!("{}(으)로 측정 중단", reason.label());
            }
            info!("측정 종료: 결과 {received}개");
            Ok(())
        }
        Command::Image { path } => {
            let live = AnalyzerLoop::new(
                Box::new(capture),
                config.analysis.clone(),
                config.capture.clone(),
            );
            let mut session = AnalysisSession::new(live);

            let shutdown = Shutdown::new();
            shutdown.spawn_signal_listener();

            let finished = runner::run_image(&mut session, &path, output, shutdown.listen()).await;
            session.shutdown();
            if !finished? {
                info!("이미지 분석이 취소되었습니다");
            }
            Ok(())
        }
    }
}
