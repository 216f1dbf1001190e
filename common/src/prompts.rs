//! プロンプト生成モジュール
//!
//! CLIと各クライアントで共有されるプロンプト生成ロジック:
//! - ANALYSIS_INSTRUCTION: 顔型解析の指示文
//! - analysis_response_schema: 構造化出力スキーマ
//! - build_generation_prompt: ヘアスタイル編集用プロンプト

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 顔型解析の指示文
pub const ANALYSIS_INSTRUCTION: &str = "Analyze this person's face structure in detail. \
Identify face shape, key metrics, and suggest 4 DISTINCT modern hairstyles that would suit them perfectly. Return JSON.";

/// 再生成時に説明文へ付加するサフィックス
pub const ALTERNATIVE_VARIATION_SUFFIX: &str = " (alternative variation)";

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#?([0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})$").unwrap();
}

/// 生成リクエストのスタイル指定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRequest {
    pub name: String,
    pub description: String,
    pub color_hex: Option<String>,
}

impl StyleRequest {
    /// 別バリエーション用のリクエストを作成
    pub fn alternative(&self) -> Self {
        Self {
            description: format!("{}{}", self.description, ALTERNATIVE_VARIATION_SUFFIX),
            ..self.clone()
        }
    }
}

/// 色指定を正規化
///
/// `3b2a1f` / `#3B2A1F` は `#3B2A1F` に揃える。16進でない指定（"auburn" など）は
/// トリムしてそのまま返す。空文字はNone。
pub fn normalize_color(color: &str) -> Option<String> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return None;
    }
    match HEX_COLOR.captures(trimmed) {
        Some(caps) => Some(format!("#{}", caps[1].to_ascii_uppercase())),
        None => Some(trimmed.to_string()),
    }
}

/// 顔型解析の構造化出力スキーマ
///
/// colorHex以外はすべて必須。
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "metrics": {
                "type": "OBJECT",
                "properties": {
                    "faceShape": { "type": "STRING", "description": "e.g., Oval, Square, Heart, Diamond" },
                    "skinTone": { "type": "STRING", "description": "Description of skin tone" },
                    "jawline": { "type": "NUMBER", "description": "0-100 rating of jawline definition" },
                    "cheekbones": { "type": "NUMBER", "description": "0-100 rating of cheekbone prominence" },
                    "forehead": { "type": "NUMBER", "description": "0-100 rating of forehead height/width balance" },
                    "symmetry": { "type": "NUMBER", "description": "0-100 rating of facial symmetry" },
                    "description": { "type": "STRING", "description": "A detailed paragraph analyzing the facial structure." }
                },
                "required": ["faceShape", "skinTone", "jawline", "cheekbones", "forehead", "symmetry", "description"]
            },
            "suggestions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "reason": { "type": "STRING" },
                        "colorHex": { "type": "STRING", "description": "Suggested hex color code for this style" }
                    },
                    "required": ["name", "description", "reason"]
                }
            }
        },
        "required": ["metrics", "suggestions"]
    })
}

/// ヘアスタイル編集プロンプト生成
///
/// 顔・肌・照明・背景は維持し、髪だけを変更するよう指示する。
pub fn build_generation_prompt(style: &StyleRequest) -> String {
    let color_line = style
        .color_hex
        .as_deref()
        .and_then(normalize_color)
        .map(|c| format!("Hair color: {}\n", c))
        .unwrap_or_default();

    format!(
        "Edit this image. Keep the person's face, identity, skin texture, lighting, and background EXACTLY the same. ONLY change the hair.\n\
The new hairstyle is: {name}. Description: {description}.\n\
{color_line}\
The hair should look ultra-realistic, physically correct, and blend naturally with the head.\n\
Do not change the face.",
        name = style.name,
        description = style.description,
    )
}
