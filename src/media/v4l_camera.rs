//! V4L2カメラ撮影（`camera` フィーチャー）

use super::camera::{yuyv_to_rgb, CameraSource};
use crate::error::{HairstyleAiError, Result};
use image::RgbImage;
use std::path::Path;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// 自動露出が安定するまで捨てるフレーム数
const WARMUP_FRAMES: usize = 5;

/// ネゴシエートしたピクセルフォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Yuyv,
    Mjpeg,
}

/// V4L2カメラ（Deviceをdropするとストリームが閉じる）
pub struct V4lCamera {
    device: Option<Device>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl V4lCamera {
    /// デバイスを現在の解像度のまま開く（例: "/dev/video0"）
    pub fn open(device_path: &str) -> Result<Self> {
        if !Path::new(device_path).exists() {
            return Err(HairstyleAiError::PermissionDenied(format!(
                "device not found: {device_path}"
            )));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            HairstyleAiError::PermissionDenied(format!("{device_path}: {e}"))
        })?;

        let caps = device.query_caps().map_err(|e| {
            HairstyleAiError::PermissionDenied(format!("failed to query capabilities: {e}"))
        })?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(HairstyleAiError::PermissionDenied(format!(
                "{device_path} is not a capture device"
            )));
        }

        // 解像度はそのまま、デコードできるフォーマットだけ要求
        let mut fmt = device.format().map_err(|e| {
            HairstyleAiError::PermissionDenied(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        let negotiated = device.set_format(&fmt).map_err(|e| {
            HairstyleAiError::PermissionDenied(format!("failed to set format: {e}"))
        })?;

        let pixel_format = if negotiated.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if negotiated.fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpeg
        } else {
            return Err(HairstyleAiError::PermissionDenied(format!(
                "unsupported pixel format: {:?} (need YUYV or MJPG)",
                negotiated.fourcc
            )));
        };

        tracing::info!(
            device = device_path,
            card = %caps.card,
            width = negotiated.width,
            height = negotiated.height,
            format = ?pixel_format,
            "opened camera"
        );

        Ok(Self {
            device: Some(device),
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
        })
    }
}

impl CameraSource for V4lCamera {
    fn grab_frame(&mut self) -> Result<RgbImage> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| HairstyleAiError::PermissionDenied("camera already stopped".into()))?;

        let mut stream = MmapStream::with_buffers(device, BufType::VideoCapture, 4)
            .map_err(|e| HairstyleAiError::ImageLoad(format!("failed to create mmap stream: {e}")))?;

        for _ in 0..WARMUP_FRAMES {
            stream
                .next()
                .map_err(|e| HairstyleAiError::ImageLoad(format!("failed to dequeue buffer: {e}")))?;
        }
        let (buf, meta) = stream
            .next()
            .map_err(|e| HairstyleAiError::ImageLoad(format!("failed to dequeue buffer: {e}")))?;
        tracing::debug!(seq = meta.sequence, bytes = buf.len(), "captured frame");

        match self.pixel_format {
            PixelFormat::Yuyv => yuyv_to_rgb(buf, self.width, self.height),
            PixelFormat::Mjpeg => image::load_from_memory(buf)
                .map(|img| img.to_rgb8())
                .map_err(|e| HairstyleAiError::ImageLoad(format!("MJPG decode failed: {e}"))),
        }
    }

    fn stop(&mut self) {
        self.device = None;
    }
}
