//! 결과 출력.
//!
//! 사람이 읽는 한 줄 요약 또는 JSON 한 줄.

use chroma_core::models::analysis::{AnalysisResult, TopColor};
use chroma_core::models::capture::WindowInfo;
use chroma_core::models::geometry::Rect;
use chrono::Local;
use serde::Serialize;

/// 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// 사람이 읽는 요약
    Text,
    /// JSON 한 줄
    Json,
}

impl OutputMode {
    /// `--json` 플래그에서
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// 결과 한 줄
pub fn format_result(result: &AnalysisResult, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json_line(result),
        OutputMode::Text => summarize(result),
    }
}

/// 사람이 읽는 요약
pub fn summarize(result: &AnalysisResult) -> String {
    let time = result.captured_at.with_timezone(&Local).format("%H:%M:%S");
    let mut line = format!(
        "[{time}] 난색 {:5.1}% | 한색 {:5.1}% | 기타 {:5.1}%",
        result.warm_ratio * 100.0,
        result.cool_ratio * 100.0,
        result.other_ratio * 100.0,
    );
    if !result.top_colors.is_empty() {
        let colors: Vec<String> = result.top_colors.iter().map(format_top_color).collect();
        line.push_str(&format!(" | 상위 {}", colors.join(" ")));
    }
    if result.wheel_pixel_count == 0 {
        line.push_str(" | 유채색 없음");
    }
    line.push_str(&format!(
        " | {} | {:.1}ms{}",
        format_rect(&result.capture_rect),
        result.elapsed_ms,
        if result.is_full_update { "" } else { " (미리보기)" }
    ));
    line
}

/// `#rrggbb 42%`
pub fn format_top_color(color: &TopColor) -> String {
    let [r, g, b] = color.rgb;
    format!("#{r:02x}{g:02x}{b:02x} {:.0}%", color.ratio * 100.0)
}

/// `WxH+X+Y`
pub fn format_rect(rect: &Rect) -> String {
    format!("{}x{}+{}+{}", rect.width, rect.height, rect.x, rect.y)
}

/// 창 목록 한 줄
pub fn format_window(window: &WindowInfo) -> String {
    let app = if window.app_name.is_empty() {
        String::new()
    } else {
        format!(" [{}]", window.app_name)
    };
    format!(
        "{:>10}  {}{}  {}{}",
        window.handle.0,
        window.title,
        app,
        format_rect(&window.rect),
        if window.minimized { " (최소화)" } else { "" }
    )
}

/// 직렬화 가능한 값을 JSON 한 줄로
pub fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"직렬화 실패: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_core::models::analysis::HsvSpread;
    use chrono::Utc;

    fn result() -> AnalysisResult {
        AnalysisResult {
            preview_frame: None,
            wheel_histogram: None,
            hue_hist: None,
            sat_hist: None,
            val_hist: None,
            scatter: None,
            top_colors: vec![TopColor {
                ratio: 0.75,
                rgb: [255, 0, 16],
                segment: 0,
            }],
            wheel_pixel_count: 100,
            warm_ratio: 0.75,
            cool_ratio: 0.25,
            other_ratio: 0.0,
            hsv_spread: HsvSpread::default(),
            capture_rect: Rect::new(10, 20, 640, 360),
            elapsed_ms: 12.34,
            is_full_update: false,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn summary_contains_ratios_and_colors() {
        let line = summarize(&result());
        assert!(line.contains("난색  75.0%"));
        assert!(line.contains("#ff0010 75%"));
        assert!(line.contains("640x360+10+20"));
        assert!(line.contains("12.3ms"));
        assert!(line.contains("(미리보기)"));
    }

    #[test]
    fn json_line_omits_absent_views() {
        let line = format_result(&result(), OutputMode::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["warm_ratio"], 0.75);
        assert!(value.get("hue_hist").is_none());
        assert!(!line.contains('\n'));
    }
}
