//! 명령줄 인자.
//!
//! 전역 옵션(로그, 설정 파일, 출력 형식, 분석 설정 재정의)과 하위 명령을 정의한다.

use std::path::PathBuf;

use chroma_core::config::{AnalysisConfig, UpdateMode};
use chroma_core::models::geometry::Rect;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

/// Chroma Monitor
///
/// 화면 영역이나 창의 색상 분포를 실시간으로 측정한다
#[derive(Parser, Debug)]
#[command(name = "chroma-monitor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    pub log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼별 설정 디렉토리)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// 결과를 JSON 한 줄씩 출력
    #[arg(long, global = true)]
    pub json: bool,

    /// 재정의한 설정을 설정 파일에 저장
    #[arg(long, global = true)]
    pub save_config: bool,

    #[command(flatten)]
    pub overrides: AnalysisOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// 하위 명령
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 실시간 측정 (Ctrl+C로 종료)
    Watch(WatchArgs),
    /// 캡처 가능한 창 목록
    Windows,
    /// 모니터 구성과 논리 ↔ 네이티브 매칭
    Monitors {
        /// 논리 좌표 배율 (UI 배율)
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// 이미지 파일 한 번 분석 (Ctrl+C로 취소)
    Image {
        /// 분석할 이미지 파일
        path: PathBuf,
    },
}

/// 실시간 측정 대상
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct WatchArgs {
    /// 화면 영역 `x,y,w,h` (논리 좌표)
    #[arg(long, value_parser = parse_rect, conflicts_with = "window")]
    pub rect: Option<Rect>,

    /// 논리 좌표 배율 (`--rect` 변환용)
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// 대상 창 ID (`windows` 명령으로 확인)
    #[arg(long)]
    pub window: Option<u32>,

    /// 창 내부 ROI `x,y,w,h` (창 캡처 해상도 기준)
    #[arg(long, value_parser = parse_rect, requires = "window")]
    pub roi: Option<Rect>,

    /// ROI 선택 당시 창 캡처 해상도 `WxH` (기본: 현재 창 크기)
    #[arg(long, value_parser = parse_size, requires = "roi")]
    pub roi_ref: Option<(u32, u32)>,

    /// N개 결과를 받으면 종료
    #[arg(long)]
    pub count: Option<u64>,
}

/// 갱신 모드 인자
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// 고정 주기
    Interval,
    /// 변화 후 안정 시
    Change,
}

impl From<ModeArg> for UpdateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Interval => UpdateMode::Interval,
            ModeArg::Change => UpdateMode::Change,
        }
    }
}

/// 분석 설정 재정의 (지정한 항목만 적용)
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct AnalysisOverrides {
    /// 갱신 모드
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,

    /// 분석 주기 (밀리초)
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// 산점도 샘플 수
    #[arg(long, global = true)]
    pub sample_points: Option<usize>,

    /// 분석 해상도 긴 변 상한 (0 = 제한 없음)
    #[arg(long, global = true)]
    pub max_dim: Option<u32>,

    /// 색상환 포함 최소 채도 (0~255)
    #[arg(long, global = true)]
    pub wheel_threshold: Option<u8>,

    /// 변화 판정 임계값
    #[arg(long, global = true)]
    pub diff_threshold: Option<f32>,

    /// 발행 전 연속 안정 프레임 수
    #[arg(long, global = true)]
    pub stable_frames: Option<u32>,

    /// 그래프를 N 프레임마다 갱신
    #[arg(long, global = true)]
    pub graph_every: Option<u32>,
}

impl AnalysisOverrides {
    /// 지정된 항목을 설정에 적용하고 범위를 보정
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(mode) = self.mode {
            config.update_mode = mode.into();
        }
        if let Some(ms) = self.interval_ms {
            config.interval_ms = ms;
        }
        if let Some(n) = self.sample_points {
            config.sample_points = n;
        }
        if let Some(dim) = self.max_dim {
            config.max_analysis_dim = dim;
        }
        if let Some(t) = self.wheel_threshold {
            config.wheel_saturation_threshold = t;
        }
        if let Some(t) = self.diff_threshold {
            config.diff_threshold = t;
        }
        if let Some(n) = self.stable_frames {
            config.stable_frames = n;
        }
        if let Some(n) = self.graph_every {
            config.graph_every = n;
        }
        *config = config.sanitized();
    }

    /// 재정의 항목이 하나라도 있는지
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.interval_ms.is_none()
            && self.sample_points.is_none()
            && self.max_dim.is_none()
            && self.wheel_threshold.is_none()
            && self.diff_threshold.is_none()
            && self.stable_frames.is_none()
            && self.graph_every.is_none()
    }
}

/// `x,y,w,h` → Rect
pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[x, y, w, h] = parts.as_slice() else {
        return Err(format!("'x,y,w,h' 형식이어야 합니다: {s}"));
    };
    let int = |v: &str| v.parse::<i32>().map_err(|e| format!("잘못된 좌표 '{v}': {e}"));
    let dim = |v: &str| v.parse::<u32>().map_err(|e| format!("잘못된 크기 '{v}': {e}"));
    let rect = Rect::new(int(x)?, int(y)?, dim(w)?, dim(h)?);
    if rect.is_empty() {
        return Err("너비와 높이는 0보다 커야 합니다".to_string());
    }
    Ok(rect)
}

/// `WxH` → (너비, 높이)
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("'WxH' 형식이어야 합니다: {s}"))?;
    let dim = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("잘못된 크기 '{v}': {e}"));
    let (w, h) = (dim(w)?, dim(h)?);
    if w == 0 || h == 0 {
        return Err("너비와 높이는 0보다 커야 합니다".to_string());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_parsing() {
        assert_eq!(parse_rect("10,-20,300,200"), Ok(Rect::new(10, -20, 300, 200)));
        assert_eq!(parse_rect(" 0, 0, 1, 1 "), Ok(Rect::new(0, 0, 1, 1)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("0,0,0,10").is_err());
        assert!(parse_rect("a,0,10,10").is_err());
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size("1920X1080"), Ok((1920, 1080)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn overrides_apply_and_clamp() {
        let overrides = AnalysisOverrides {
            mode: Some(ModeArg::Change),
            interval_ms: Some(10),
            sample_points: Some(1_000),
            ..AnalysisOverrides::default()
        };
        let mut config = AnalysisConfig::default();
        overrides.apply(&mut config);
        assert_eq!(config.update_mode, UpdateMode::Change);
        assert_eq!(config.interval_ms, 50);
        assert_eq!(config.sample_points, 1_000);
        assert_eq!(config.max_analysis_dim, 400);
        assert!(!overrides.is_empty());
        assert!(AnalysisOverrides::default().is_empty());
    }

    #[test]
    fn watch_command_parses() {
        let args = Args::parse_from([
            "chroma-monitor",
            "--json",
            "watch",
            "--window",
            "42",
            "--roi",
            "0,0,100,50",
            "--roi-ref",
            "800x600",
            "--mode",
            "change",
        ]);
        assert!(args.json);
        assert_eq!(args.overrides.mode, Some(ModeArg::Change));
        let Command::Watch(watch) = args.command else {
            panic!("watch 명령이어야 함");
        };
        assert_eq!(watch.window, Some(42));
        assert_eq!(watch.roi, Some(Rect::new(0, 0, 100, 50)));
        assert_eq!(watch.roi_ref, Some((800, 600)));
    }

    #[test]
    fn rect_and_window_conflict() {
        let parsed = Args::try_parse_from([
            "chroma-monitor",
            "watch",
            "--rect",
            "0,0,10,10",
            "--window",
            "1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn image_command_parses() {
        let args = Args::parse_from(["chroma-monitor", "image", "photo.png", "--sample-points", "600"]);
        assert_eq!(args.overrides.sample_points, Some(600));
        assert!(matches!(args.command, Command::Image { ref path } if path.ends_with("photo.png")));
    }
}
