//! テキスト表示
//!
//! 画面はセッション状態だけから組み立てる（副作用なし）。

use crate::session::{AppState, Session};
use crate::types::{FaceMetrics, GeneratedImage, GenerationStatus};

/// 計測値バーの幅
const BAR_WIDTH: usize = 20;

/// セッション状態を画面テキストに変換
pub fn render(session: &Session) -> String {
    let mut out = match session.state() {
        AppState::Idle => render_idle(),
        AppState::Scanning => render_scanning(),
        AppState::Analyzing => render_analyzing(),
        AppState::Results => render_results(session),
    };

    if let Some(error) = session.error() {
        out.push_str(&format!("\n✖ {}\n", error));
    }
    out
}

fn render_idle() -> String {
    "AI FACE ANALYZER\n\
     写真を撮影するか、画像ファイルを指定してください。\n"
        .to_string()
}

fn render_scanning() -> String {
    "📷 カメラ起動中 - Enterで撮影\n".to_string()
}

fn render_analyzing() -> String {
    "ANALYZING FACIAL GEOMETRY...\n".to_string()
}

fn render_results(session: &Session) -> String {
    let Some(report) = session.report() else {
        return String::new();
    };

    let mut out = String::new();
    out.push_str("ANALYSIS REPORT");
    if let Some(id) = session.fingerprint() {
        out.push_str(&format!("  ID: {}", id));
    }
    out.push('\n');

    out.push_str(&format!(
        "顔型: {}  肌色: {}\n",
        report.metrics.face_shape, report.metrics.skin_tone
    ));
    out.push_str(&render_metrics(&report.metrics));
    out.push_str(&format!("{}\n\n", report.metrics.description));

    out.push_str("ヘアスタイル:\n");
    for (i, item) in session.generated().iter().enumerate() {
        let reason = report
            .suggestions
            .get(i)
            .map(|s| s.reason.as_str())
            .unwrap_or_default();
        out.push_str(&render_style_line(i, item));
        if !reason.is_empty() {
            out.push_str(&format!("      {}\n", reason));
        }
    }
    out
}

/// 計測値をバー表示
pub fn render_metrics(metrics: &FaceMetrics) -> String {
    [
        ("Jawline", metrics.jawline),
        ("Cheekbones", metrics.cheekbones),
        ("Forehead", metrics.forehead),
        ("Symmetry", metrics.symmetry),
    ]
    .iter()
    .map(|(label, value)| format!("  {:<11}{} {:>5.1}\n", label, metric_bar(*value), value))
    .collect()
}

fn metric_bar(value: f64) -> String {
    let filled = ((value.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// スタイル1件分の状態行
pub fn render_style_line(index: usize, item: &GeneratedImage) -> String {
    let status = match &item.status {
        GenerationStatus::Pending { .. } => "⏳ 生成中".to_string(),
        GenerationStatus::Succeeded { .. } => "✔ 生成完了".to_string(),
        GenerationStatus::Failed { reason, previous: None } => format!("✖ 生成失敗 ({})", reason),
        GenerationStatus::Failed { reason, previous: Some(_) } => {
            format!("✖ 再生成失敗 ({}) - 前回の画像を表示中", reason)
        }
    };
    format!("  [{}] {} - {}\n", index + 1, item.style_name, status)
}
