//! 画像取得モジュール
//!
//! カメラ撮影・ファイル指定のどちらも、Data URLプレフィックスなしの
//! Base64 JPEG（ImagePayload）に揃えて返す。

pub mod camera;
#[cfg(feature = "camera")]
pub mod v4l_camera;

use crate::error::{HairstyleAiError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hairstyle_ai_common::strip_data_url_prefix;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::Path;

pub use camera::{CameraSession, CameraSource};

/// JPEG SOIマーカー
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Base64エンコード済みJPEG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// JPEGバイト列から作成
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Base64文字列（Data URL可）から作成
    ///
    /// JPEG以外の画像なら再エンコードする。
    pub fn from_base64(data: &str, quality: u8) -> Result<Self> {
        let bytes = BASE64
            .decode(strip_data_url_prefix(data))
            .map_err(|e| HairstyleAiError::ImageLoad(format!("Base64デコード失敗: {}", e)))?;
        Self::from_image_bytes(&bytes, quality)
    }

    /// 任意の画像バイト列から作成
    pub fn from_image_bytes(bytes: &[u8], quality: u8) -> Result<Self> {
        if is_jpeg(bytes) {
            return Ok(Self::from_jpeg_bytes(bytes));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| HairstyleAiError::ImageLoad(e.to_string()))?;
        let jpeg = encode_jpeg(&image.to_rgb8(), quality)?;
        Ok(Self::from_jpeg_bytes(&jpeg))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(JPEG_MAGIC)
}

/// RGB画像をJPEGにエンコード
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(image)
        .map_err(|e| HairstyleAiError::ImageLoad(format!("JPEGエンコード失敗: {}", e)))?;
    Ok(buffer)
}

/// ファイルから画像を読み込む（アップロード経路）
///
/// - JPEGはそのまま
/// - Data URL / Base64 テキストはプレフィックスを外してデコード
/// - その他の画像形式はJPEGに再エンコード
pub fn load_upload(path: &Path, quality: u8) -> Result<ImagePayload> {
    if !path.is_file() {
        return Err(HairstyleAiError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    if bytes.starts_with(b"data:") {
        let text = String::from_utf8_lossy(&bytes);
        return ImagePayload::from_base64(&text, quality);
    }

    let payload = ImagePayload::from_image_bytes(&bytes, quality)?;
    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        reencoded = !is_jpeg(&bytes),
        "loaded upload"
    );
    Ok(payload)
}

/// カメラを開く
#[cfg(feature = "camera")]
pub fn open_camera(device: &str) -> Result<v4l_camera::V4lCamera> {
    v4l_camera::V4lCamera::open(device)
}

/// カメラを開く（`camera` フィーチャー無効時は常に失敗）
#[cfg(not(feature = "camera"))]
pub fn open_camera(device: &str) -> Result<camera::NoCamera> {
    Err(HairstyleAiError::PermissionDenied(format!(
        "{}: `camera` フィーチャーなしでビルドされています",
        device
    )))
}

/// Base64 JPEGをデコード
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(strip_data_url_prefix(data))
        .map_err(|e| HairstyleAiError::ImageLoad(format!("Base64デコード失敗: {}", e)))
}
