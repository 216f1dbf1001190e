//! Gemini API連携
//!
//! - analyze: 顔型解析（構造化JSON出力）
//! - generate: ヘアスタイル編集（画像出力）

pub mod types;

use crate::backend::StyleBackend;
use crate::config::Config;
use crate::error::{HairstyleAiError, Result};
use async_trait::async_trait;
use hairstyle_ai_common::prompts::{analysis_response_schema, ANALYSIS_INSTRUCTION};
use hairstyle_ai_common::{
    build_generation_prompt, parse_analysis_response, to_data_url, AnalysisReport, StyleRequest,
};
use std::time::{Duration, Instant};
use types::{GeminiRequest, GeminiResponse, GenerationConfig, ThinkingConfig};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    analysis_model: String,
    generation_model: String,
    thinking_budget: u32,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| HairstyleAiError::ApiCall(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            analysis_model: config.analysis_model.clone(),
            generation_model: config.generation_model.clone(),
            thinking_budget: config.thinking_budget,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Gemini API呼び出し（共通処理）
    async fn call(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let started = Instant::now();
        let response = self
            .http
            .post(self.endpoint_for_model(model))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| HairstyleAiError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "gemini request failed");
            return Err(HairstyleAiError::ApiCall(format!("API error {}: {}", status, body)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| HairstyleAiError::ApiParse(e.to_string()))?;
        tracing::debug!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            candidates = payload.candidates.len(),
            "gemini response"
        );
        Ok(payload)
    }
}

#[async_trait]
impl StyleBackend for GeminiClient {
    async fn analyze(&self, image: &str) -> Result<AnalysisReport> {
        let request = GeminiRequest::image_with_text(image, ANALYSIS_INSTRUCTION.to_string())
            .with_config(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_response_schema(),
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            });

        let response = self.call(&self.analysis_model, &request).await?;
        let text = response
            .text()
            .ok_or_else(|| HairstyleAiError::Analysis("No response from AI".into()))?;

        parse_analysis_response(&text).map_err(|e| HairstyleAiError::Analysis(e.to_string()))
    }

    async fn generate(&self, image: &str, style: &StyleRequest) -> Result<String> {
        let request = GeminiRequest::image_with_text(image, build_generation_prompt(style));

        let response = self.call(&self.generation_model, &request).await?;
        let image = response
            .first_image()
            .ok_or_else(|| HairstyleAiError::Generation("No image generated".into()))?;
        let mime_type = if image.mime_type.is_empty() { "image/png" } else { image.mime_type.as_str() };
        tracing::debug!(mime_type, bytes = image.data.len(), "image generated");
        Ok(to_data_url(mime_type, &image.data))
    }
}
