//! カメラ撮影
//!
//! CameraSession はストリームを1回だけ停止する。撮影・キャンセル・drop の
//! どの経路でも停止され、Scanning を抜けた後にカメラが動き続けることはない。

use super::{encode_jpeg, ImagePayload};
use crate::error::{HairstyleAiError, Result};
use image::RgbImage;

/// フレーム取得元
pub trait CameraSource: Send {
    /// ネイティブ解像度で1フレーム取得
    fn grab_frame(&mut self) -> Result<RgbImage>;

    /// ストリーム停止（全トラック解放）
    fn stop(&mut self);
}

/// カメラ非対応ビルド用（値は作れない）
pub enum NoCamera {}

impl CameraSource for NoCamera {
    fn grab_frame(&mut self) -> Result<RgbImage> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}

/// 撮影中のカメラ
pub struct CameraSession<C: CameraSource> {
    source: Option<C>,
    quality: u8,
}

impl<C: CameraSource> CameraSession<C> {
    pub fn new(source: C, quality: u8) -> Self {
        Self {
            source: Some(source),
            quality,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// 撮影してカメラを停止する
    ///
    /// フレーム取得に失敗してもカメラは停止する。
    pub fn capture(mut self) -> Result<ImagePayload> {
        let mut source = self
            .source
            .take()
            .ok_or_else(|| HairstyleAiError::PermissionDenied("カメラは停止済みです".into()))?;
        let frame = source.grab_frame();
        source.stop();
        tracing::debug!("camera stopped after capture");

        let frame = frame?;
        let jpeg = encode_jpeg(&frame, self.quality)?;
        Ok(ImagePayload::from_jpeg_bytes(&jpeg))
    }

    /// 撮影せずにカメラを停止する
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            tracing::debug!("camera stopped");
        }
    }
}

impl<C: CameraSource> Drop for CameraSession<C> {
    fn drop(&mut self) {
        self.release();
    }
}

/// YUYV 4:2:2 を RGB に変換（BT.601）
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let expected = (width * height * 2) as usize;
    if width % 2 != 0 || yuyv.len() < expected {
        return Err(HairstyleAiError::ImageLoad(format!(
            "YUYV buffer invalid: {}x{}, expected {} bytes, got {}",
            width,
            height,
            expected,
            yuyv.len()
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| HairstyleAiError::ImageLoad("RGB buffer size mismatch".into()))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let r = 1.164 * c + 1.596 * e;
    let g = 1.164 * c - 0.392 * d - 0.813 * e;
    let b = 1.164 * c + 2.017 * d;
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}
