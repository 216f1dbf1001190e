//! 解析パイプライン
//!
//! 撮影/アップロード → 顔型解析 → スタイルごとの逐次生成 を順に実行する。
//! 状態はすべて Session に集約し、変更のたびに watch チャネルへ配信する。
//! ロックは await をまたいで保持しない。

use crate::backend::StyleBackend;
use crate::error::{HairstyleAiError, Result};
use crate::media::{CameraSession, CameraSource, ImagePayload};
use hairstyle_ai_common::{AppState, GenerationTask, Session};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

pub struct Orchestrator<B: StyleBackend> {
    backend: B,
    session: Mutex<Session>,
    publisher: watch::Sender<Session>,
    /// 生成リクエストの間隔
    delay: Duration,
    jpeg_quality: u8,
}

impl<B: StyleBackend> Orchestrator<B> {
    pub fn new(backend: B, delay: Duration) -> Self {
        let (publisher, _) = watch::channel(Session::new());
        Self {
            backend,
            session: Mutex::new(Session::new()),
            publisher,
            delay,
            jpeg_quality: 80,
        }
    }

    /// カメラ撮影時のJPEG品質
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// 状態変更の購読
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.publisher.subscribe()
    }

    /// 現在の状態のコピー
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// セッションを変更して配信する
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.lock();
        let out = f(&mut session);
        self.publisher.send_replace(session.clone());
        out
    }

    /// カメラ起動: Idle → Scanning
    ///
    /// 起動に失敗した場合はIdleのままバナーを表示してエラーを返す。
    pub fn start_camera<C, F>(&self, open: F) -> Result<CameraSession<C>>
    where
        C: CameraSource,
        F: FnOnce() -> Result<C>,
    {
        let state = self.lock().state();
        if state != AppState::Idle {
            return Err(hairstyle_ai_common::Error::InvalidTransition {
                from: state,
                to: AppState::Scanning,
            }
            .into());
        }

        match open() {
            Ok(source) => {
                self.update(|s| s.begin_scan())?;
                tracing::info!("camera started");
                Ok(CameraSession::new(source, self.jpeg_quality))
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera unavailable");
                self.update(|s| s.camera_denied());
                Err(HairstyleAiError::PermissionDenied(e.to_string()))
            }
        }
    }

    /// 撮影: カメラは必ず停止する
    ///
    /// 取得に失敗した場合は Scanning → Idle に戻す。
    pub fn capture<C: CameraSource>(&self, camera: CameraSession<C>) -> Result<ImagePayload> {
        match camera.capture() {
            Ok(payload) => Ok(payload),
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                if let Err(transition) = self.update(|s| s.cancel_scan()) {
                    tracing::warn!(error = %transition, "could not leave scanning after failed capture");
                }
                Err(e)
            }
        }
    }

    /// 撮影せずにカメラを閉じる: Scanning → Idle
    pub fn cancel_scan<C: CameraSource>(&self, camera: CameraSession<C>) -> Result<()> {
        camera.cancel();
        self.update(|s| s.cancel_scan())?;
        Ok(())
    }

    /// 解析パイプライン
    ///
    /// 1. Analyzing へ遷移して解析
    /// 2. 失敗したらバナーを出してIdleへ戻り、エラーを返す
    /// 3. 成功したら生成待ちスロットを作ってResultsへ遷移
    /// 4. 提案順に、間隔を空けて1件ずつ生成（失敗してもバッチは続行）
    pub async fn run_analysis_pipeline(&self, image: ImagePayload) -> Result<()> {
        let image = image.into_string();
        let run_id = self.update(|s| s.begin_analysis(image.clone()))?;
        tracing::info!(run_id, bytes = image.len(), "analysis started");

        let report = match self.backend.analyze(&image).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "analysis failed");
                self.update(|s| s.analysis_failed(run_id));
                return Err(match e {
                    HairstyleAiError::Analysis(_) => e,
                    other => HairstyleAiError::Analysis(other.to_string()),
                });
            }
        };

        let suggestions = report.suggestions.len();
        let Some(tasks) = self.update(|s| s.analysis_succeeded(run_id, report)) else {
            tracing::debug!(run_id, "analysis result discarded (session reset)");
            return Ok(());
        };
        tracing::info!(run_id, suggestions, "analysis complete");

        for task in tasks {
            tokio::time::sleep(self.delay).await;
            let current = self.lock().run_id();
            if current != run_id {
                tracing::info!(run_id, "pipeline stopped (session reset)");
                break;
            }
            self.run_generation(&image, task).await;
        }

        tracing::info!(run_id, "pipeline finished");
        Ok(())
    }

    /// 指定スロットを別バリエーションで再生成
    pub async fn regenerate(&self, index: usize) -> Result<()> {
        let (task, image) = self.update(|s| {
            let task = s.begin_regenerate(index)?;
            let image = s.original_image().unwrap_or_default().to_string();
            Ok::<_, hairstyle_ai_common::Error>((task, image))
        })?;
        tracing::info!(slot = %task.slot_id, style = %task.style.name, "regenerate");
        self.run_generation(&image, task).await;
        Ok(())
    }

    /// 1スロット分の生成（失敗はスロットに記録するだけ）
    async fn run_generation(&self, image: &str, task: GenerationTask) {
        let outcome = self
            .backend
            .generate(image, &task.style)
            .await
            .map_err(|e| e.to_string());

        match &outcome {
            Ok(_) => tracing::info!(slot = %task.slot_id, style = %task.style.name, "generation succeeded"),
            Err(reason) => tracing::warn!(slot = %task.slot_id, style = %task.style.name, reason = %reason, "generation failed"),
        }

        if !self.update(|s| s.apply_generation(&task, outcome)) {
            tracing::debug!(slot = %task.slot_id, run_id = task.run_id, "stale generation discarded");
        }
    }

    /// リセット: Results → Idle
    pub fn reset(&self) -> Result<()> {
        self.update(|s| s.reset())?;
        tracing::info!("session reset");
        Ok(())
    }

    pub fn dismiss_error(&self) {
        self.update(|s| s.dismiss_error());
    }
}
