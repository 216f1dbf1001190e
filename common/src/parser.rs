//! APIレスポンスパーサー
//!
//! 解析APIのレスポンスからJSONを抽出してAnalysisReportへ変換する。
//! Data URLの分解・組み立てもここで扱う。

use crate::error::{Error, Result};
use crate::types::AnalysisReport;

/// JPEGのData URLプレフィックス
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// APIレスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use hairstyle_ai_common::extract_json;
///
/// let response = "Result: {\"key\": \"value\"}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"key\": \"value\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 顔型解析レスポンスをパース
///
/// 必須フィールドが1つでも欠けていれば失敗とする（部分的な復元はしない）。
pub fn parse_analysis_response(response: &str) -> Result<AnalysisReport> {
    if response.trim().is_empty() {
        return Err(Error::Parse("解析レスポンスが空です".into()));
    }
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("解析 JSONパースエラー: {}", e)))
}

/// Data URLからBase64データ部分を取り出す
///
/// プレフィックスが無い場合は入力をそのまま返す。
pub fn strip_data_url_prefix(data: &str) -> &str {
    let trimmed = data.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

/// Base64 JPEGをData URLに変換
pub fn to_jpeg_data_url(base64: &str) -> String {
    format!("{}{}", JPEG_DATA_URL_PREFIX, base64)
}

/// Base64画像をMIMEタイプ付きのData URLに変換
pub fn to_data_url(mime_type: &str, base64: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64)
}

/// 画像をData URLに揃える（プレフィックスなしのBase64はJPEG扱い）
pub fn to_image_data_url(image: &str) -> String {
    let trimmed = image.trim();
    if trimmed.starts_with("data:") {
        trimmed.to_string()
    } else {
        to_jpeg_data_url(trimmed)
    }
}

/// Data URLからMIMEタイプを抽出（取れない場合は image/jpeg）
pub fn extract_mime_type_from_data_url(data_url: &str) -> &str {
    data_url
        .trim()
        .strip_prefix("data:")
        .and_then(|s| s.split([';', ',']).next())
        .filter(|s| !s.is_empty())
        .unwrap_or("image/jpeg")
}
