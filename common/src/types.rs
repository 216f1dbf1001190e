//! 解析結果・生成結果の型定義
//!
//! - FaceMetrics / HairstyleSuggestion / AnalysisReport: 顔型解析APIの出力
//! - GeneratedImage / GenerationStatus: スタイルごとの生成スロット

use serde::{Deserialize, Serialize};

/// 顔の計測値
///
/// 数値は0-100の評価値。範囲チェックはせず、APIの値をそのまま信頼する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMetrics {
    pub face_shape: String,     // 顔型（Oval, Square など）
    pub skin_tone: String,      // 肌色
    pub jawline: f64,           // フェイスラインの明瞭さ
    pub cheekbones: f64,        // 頬骨の高さ
    pub forehead: f64,          // 額のバランス
    pub symmetry: f64,          // 左右対称性
    pub description: String,    // 解析コメント
}

/// ヘアスタイル提案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HairstyleSuggestion {
    pub name: String,
    pub description: String,
    /// 顔型に合う理由
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}

/// 顔型解析レポート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metrics: FaceMetrics,
    pub suggestions: Vec<HairstyleSuggestion>,
}

/// 生成スロットの状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum GenerationStatus {
    /// 生成待ち・生成中（再生成時は直前の画像を保持）
    Pending {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous: Option<String>,
    },
    /// 生成成功（data URL）
    #[serde(rename_all = "camelCase")]
    Succeeded { image_url: String },
    /// 生成失敗（再生成の失敗なら直前の画像を保持）
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous: Option<String>,
    },
}

impl GenerationStatus {
    /// 表示中の画像（成功画像、なければ保持している直前の画像）
    pub fn visible_image(&self) -> Option<&str> {
        match self {
            GenerationStatus::Succeeded { image_url } => Some(image_url),
            GenerationStatus::Pending { previous } | GenerationStatus::Failed { previous, .. } => {
                previous.as_deref()
            }
        }
    }
}

/// スタイルごとの生成結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// スロットID（`style-<index>`）
    pub id: String,
    pub style_name: String,
    #[serde(flatten)]
    pub status: GenerationStatus,
}

impl GeneratedImage {
    /// 生成待ちのプレースホルダを作成
    pub fn placeholder(index: usize, style_name: &str) -> Self {
        Self {
            id: slot_id(index),
            style_name: style_name.to_string(),
            status: GenerationStatus::Pending { previous: None },
        }
    }

    pub fn loading(&self) -> bool {
        matches!(self.status, GenerationStatus::Pending { .. })
    }

    /// 表示する画像URL（画像がなければ空文字）
    ///
    /// 再生成中・再生成失敗のスロットは直前の成功画像を返す。
    pub fn image_url(&self) -> &str {
        self.status.visible_image().unwrap_or_default()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, GenerationStatus::Failed { .. })
    }
}

/// スロットIDを生成
pub fn slot_id(index: usize) -> String {
    format!("style-{}", index)
}
