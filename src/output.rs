//! 解析結果の書き出し
//!
//! `<出力先>/<タイムスタンプ>/` に report.json・original.jpg・style-N.<拡張子> を保存する。

use crate::error::{HairstyleAiError, Result};
use crate::media::decode_base64;
use hairstyle_ai_common::{extract_mime_type_from_data_url, AnalysisReport, GeneratedImage, Session};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// report.json の内容
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedReport<'a> {
    session_id: String,
    report: &'a AnalysisReport,
    styles: Vec<ExportedStyle<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedStyle<'a> {
    #[serde(flatten)]
    item: &'a GeneratedImage,
    /// 保存した画像ファイル名（成功時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

/// 結果画面の内容を保存し、作成したディレクトリを返す
pub fn export_session(session: &Session, output_dir: &Path) -> Result<PathBuf> {
    let report = session
        .report()
        .ok_or_else(|| HairstyleAiError::Export("書き出す解析結果がありません".into()))?;
    let original = session
        .original_image()
        .ok_or_else(|| HairstyleAiError::Export("元画像がありません".into()))?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let dir = output_dir.join(stamp);
    std::fs::create_dir_all(&dir)?;

    std::fs::write(dir.join("original.jpg"), decode_base64(original)?)?;

    let mut styles = Vec::with_capacity(session.generated().len());
    for item in session.generated() {
        let file = if item.image_url().is_empty() {
            None
        } else {
            let mime_type = extract_mime_type_from_data_url(item.image_url());
            let name = format!("{}.{}", item.id, file_extension(mime_type));
            std::fs::write(dir.join(&name), decode_base64(item.image_url())?)?;
            Some(name)
        };
        styles.push(ExportedStyle { item, file });
    }

    let exported = ExportedReport {
        session_id: session.fingerprint().unwrap_or_default(),
        report,
        styles,
    };
    let json = serde_json::to_string_pretty(&exported)?;
    std::fs::write(dir.join("report.json"), json)?;

    tracing::info!(dir = %dir.display(), "results exported");
    Ok(dir)
}

/// MIMEタイプから拡張子を決める（不明ならjpg）
fn file_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}
