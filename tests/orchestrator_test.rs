//! 解析パイプラインのテスト
//!
//! 外部サービスをモックに差し替え、状態遷移・生成順序・間隔・リセットを検証

use async_trait::async_trait;
use hairstyle_ai::backend::StyleBackend;
use hairstyle_ai::error::{HairstyleAiError, Result};
use hairstyle_ai::media::camera::NoCamera;
use hairstyle_ai::media::{encode_jpeg, load_upload, CameraSession, CameraSource, ImagePayload};
use hairstyle_ai::orchestrator::Orchestrator;
use hairstyle_ai_common::session::{ANALYSIS_FAILED_MESSAGE, PERMISSION_DENIED_MESSAGE};
use hairstyle_ai_common::{
    AnalysisReport, AppState, FaceMetrics, GenerationStatus, HairstyleSuggestion, StyleRequest,
};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;

const DELAY: Duration = Duration::from_millis(500);

/// generate呼び出しの記録
#[derive(Debug, Clone)]
struct Call {
    image: String,
    style: StyleRequest,
    at: Instant,
}

#[derive(Default)]
struct Recorder {
    analyzed: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

struct MockBackend {
    analysis: std::result::Result<AnalysisReport, String>,
    failing: Vec<String>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl StyleBackend for MockBackend {
    async fn analyze(&self, image: &str) -> Result<AnalysisReport> {
        self.recorder.analyzed.lock().unwrap().push(image.to_string());
        self.analysis.clone().map_err(HairstyleAiError::Analysis)
    }

    async fn generate(&self, image: &str, style: &StyleRequest) -> Result<String> {
        self.recorder.calls.lock().unwrap().push(Call {
            image: image.to_string(),
            style: style.clone(),
            at: Instant::now(),
        });
        // スタイル名または説明文で失敗させる
        if self.failing.contains(&style.name) || self.failing.contains(&style.description) {
            return Err(HairstyleAiError::Generation("No image generated".into()));
        }
        Ok(format!("IMG-{}", style.name))
    }
}

fn report(names: &[&str]) -> AnalysisReport {
    AnalysisReport {
        metrics: FaceMetrics {
            face_shape: "Oval".into(),
            skin_tone: "Neutral".into(),
            jawline: 70.0,
            cheekbones: 65.0,
            forehead: 50.0,
            symmetry: 92.0,
            description: "Balanced proportions".into(),
        },
        suggestions: names
            .iter()
            .map(|n| HairstyleSuggestion {
                name: n.to_string(),
                description: format!("{} style", n),
                reason: format!("{} suits oval faces", n),
                color_hex: None,
            })
            .collect(),
    }
}

fn orchestrator(
    analysis: std::result::Result<AnalysisReport, String>,
    failing: &[&str],
) -> (Orchestrator<MockBackend>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let backend = MockBackend {
        analysis,
        failing: failing.iter().map(|s| s.to_string()).collect(),
        recorder: recorder.clone(),
    };
    (Orchestrator::new(backend, DELAY), recorder)
}

fn payload(tag: &str) -> ImagePayload {
    ImagePayload::from_jpeg_bytes(tag.as_bytes())
}

/// 4件中Bだけ失敗: A,C,Dは画像あり、Bは読込終了・画像なし
#[tokio::test(start_paused = true)]
async fn test_pipeline_partial_failure() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B", "C", "D"])), &["B"]);

    orch.run_analysis_pipeline(payload("face")).await.unwrap();

    let session = orch.snapshot();
    assert_eq!(session.state(), AppState::Results);
    assert!(session.error().is_none());

    let g = session.generated();
    assert_eq!(g.len(), 4);
    let names: Vec<_> = g.iter().map(|x| x.style_name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C", "D"]);
    assert_eq!(g[0].image_url(), "data:image/jpeg;base64,IMG-A");
    assert!(!g[1].loading());
    assert_eq!(g[1].image_url(), "");
    assert!(matches!(g[1].status, GenerationStatus::Failed { .. }));
    assert_eq!(g[2].image_url(), "data:image/jpeg;base64,IMG-C");
    assert_eq!(g[3].image_url(), "data:image/jpeg;base64,IMG-D");

    // 提案順に1回ずつ、元画像で呼ばれている
    let calls = recorder.calls();
    let order: Vec<_> = calls.iter().map(|c| c.style.name.as_str()).collect();
    assert_eq!(order, ["A", "B", "C", "D"]);
    assert!(calls.iter().all(|c| c.image == payload("face").as_str()));
}

/// 生成開始前にプレースホルダが表示される
#[tokio::test(start_paused = true)]
async fn test_placeholders_published_before_generation() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B", "C"])), &[]);
    let mut rx = orch.subscribe();

    let (result, all_pending) = tokio::join!(orch.run_analysis_pipeline(payload("face")), async {
        let session = rx
            .wait_for(|s| s.state() == AppState::Results)
            .await
            .unwrap()
            .clone();
        let pending = session.generated().len() == 3 && session.generated().iter().all(|g| g.loading());
        (pending, recorder.calls().len())
    });

    result.unwrap();
    assert_eq!(all_pending, (true, 0));
}

/// 生成リクエストの開始間隔は指定の遅延以上
#[tokio::test(start_paused = true)]
async fn test_generation_requests_are_spaced() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B", "C", "D"])), &["C"]);
    let started = Instant::now();

    orch.run_analysis_pipeline(payload("face")).await.unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].at.duration_since(started) >= DELAY);
    for pair in calls.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= DELAY);
    }
}

/// 解析失敗: Idleへ戻りバナー表示、生成は行わない
#[tokio::test(start_paused = true)]
async fn test_analysis_failure_returns_to_idle() {
    let (orch, recorder) = orchestrator(Err("No response from AI".into()), &[]);

    let err = orch.run_analysis_pipeline(payload("face")).await.unwrap_err();
    assert!(matches!(err, HairstyleAiError::Analysis(_)));

    let session = orch.snapshot();
    assert_eq!(session.state(), AppState::Idle);
    assert_eq!(session.error(), Some(ANALYSIS_FAILED_MESSAGE));
    assert!(session.original_image().is_none());
    assert!(session.generated().is_empty());
    assert!(recorder.calls().is_empty());
}

/// 再生成は指定スロットのみ変更
#[tokio::test(start_paused = true)]
async fn test_regenerate_only_mutates_index() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B", "C"])), &[]);
    orch.run_analysis_pipeline(payload("face")).await.unwrap();
    let before = orch.snapshot().generated().to_vec();

    orch.regenerate(2).await.unwrap();

    let after = orch.snapshot().generated().to_vec();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
    assert_eq!(after[2].id, "style-2");
    assert!(!after[2].loading());

    let last = recorder.calls().pop().unwrap();
    assert_eq!(last.style.name, "C");
    assert_eq!(last.style.description, "C style (alternative variation)");
    assert_eq!(last.image, payload("face").as_str());
}

/// 再生成が失敗しても直前の画像は残る
#[tokio::test(start_paused = true)]
async fn test_failed_regenerate_keeps_image() {
    let (orch, recorder) =
        orchestrator(Ok(report(&["A", "B"])), &["A style (alternative variation)"]);
    orch.run_analysis_pipeline(payload("face")).await.unwrap();
    assert_eq!(orch.snapshot().generated()[0].image_url(), "data:image/jpeg;base64,IMG-A");

    orch.regenerate(0).await.unwrap();

    let session = orch.snapshot();
    let slot = &session.generated()[0];
    assert!(!slot.loading());
    assert!(slot.is_failed());
    assert_eq!(slot.image_url(), "data:image/jpeg;base64,IMG-A");
    assert_eq!(session.generated()[1].image_url(), "data:image/jpeg;base64,IMG-B");
    assert!(session.error().is_none());

    let last = recorder.calls().pop().unwrap();
    assert_eq!(last.style.description, "A style (alternative variation)");
}

/// 解析前の再生成は拒否
#[tokio::test]
async fn test_regenerate_rejected_without_results() {
    let (orch, recorder) = orchestrator(Ok(report(&["A"])), &[]);
    let err = orch.regenerate(0).await.unwrap_err();
    assert!(matches!(err, HairstyleAiError::Session(_)));
    assert!(recorder.calls().is_empty());
}

/// 範囲外のインデックスは拒否
#[tokio::test(start_paused = true)]
async fn test_regenerate_out_of_range() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    orch.run_analysis_pipeline(payload("face")).await.unwrap();
    let err = orch.regenerate(5).await.unwrap_err();
    assert!(matches!(
        err,
        HairstyleAiError::Session(hairstyle_ai_common::Error::IndexOutOfRange { index: 5, len: 1 })
    ));
}

/// リセット後の次セッションは前回の状態を引き継がない
#[tokio::test(start_paused = true)]
async fn test_reset_then_independent_session() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B"])), &[]);
    orch.run_analysis_pipeline(payload("first")).await.unwrap();

    orch.reset().unwrap();
    let session = orch.snapshot();
    assert_eq!(session.state(), AppState::Idle);
    assert!(session.original_image().is_none());
    assert!(session.report().is_none());
    assert!(session.generated().is_empty());

    orch.run_analysis_pipeline(payload("second")).await.unwrap();
    let session = orch.snapshot();
    assert_eq!(session.original_image(), Some(payload("second").as_str()));
    assert_eq!(session.generated().len(), 2);

    let analyzed = recorder.analyzed.lock().unwrap().clone();
    assert_eq!(analyzed, [payload("first").into_string(), payload("second").into_string()]);
    let second_calls: Vec<_> = recorder.calls().into_iter().skip(2).collect();
    assert!(second_calls.iter().all(|c| c.image == payload("second").as_str()));
}

/// 生成途中のリセット: 残りの生成は行わず、結果も反映しない
#[tokio::test(start_paused = true)]
async fn test_reset_during_pipeline_discards_rest() {
    let (orch, recorder) = orchestrator(Ok(report(&["A", "B", "C", "D"])), &[]);
    let mut rx = orch.subscribe();

    let (result, _) = tokio::join!(orch.run_analysis_pipeline(payload("face")), async {
        rx.wait_for(|s| s.generated().first().is_some_and(|g| !g.loading()))
            .await
            .unwrap();
        orch.reset().unwrap();
    });

    result.unwrap();
    let session = orch.snapshot();
    assert_eq!(session.state(), AppState::Idle);
    assert!(session.generated().is_empty());
    assert_eq!(recorder.calls().len(), 1);
}

/// 同名の提案もスロットIDで個別に更新
#[tokio::test(start_paused = true)]
async fn test_duplicate_style_names() {
    let (orch, _) = orchestrator(Ok(report(&["Bob", "Bob"])), &[]);
    orch.run_analysis_pipeline(payload("face")).await.unwrap();

    let session = orch.snapshot();
    let ids: Vec<_> = session.generated().iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, ["style-0", "style-1"]);
    assert!(session.generated().iter().all(|g| !g.image_url().is_empty()));
}

// =============================================
// カメラ経路
// =============================================

struct FakeCamera {
    frame: RgbImage,
    stops: Arc<AtomicUsize>,
}

impl CameraSource for FakeCamera {
    fn grab_frame(&mut self) -> Result<RgbImage> {
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn frame() -> RgbImage {
    RgbImage::from_fn(16, 12, |x, y| Rgb([(x * 15) as u8, (y * 20) as u8, 90]))
}

/// フレームが取れないカメラ
struct BrokenCamera {
    stops: Arc<AtomicUsize>,
}

impl CameraSource for BrokenCamera {
    fn grab_frame(&mut self) -> Result<RgbImage> {
        Err(HairstyleAiError::ImageLoad("no frame".into()))
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// 撮影失敗: Idleに戻り、取得エラーを返す
#[test]
fn test_failed_capture_returns_to_idle() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    let stops = Arc::new(AtomicUsize::new(0));

    let camera = orch
        .start_camera(|| Ok(BrokenCamera { stops: stops.clone() }))
        .unwrap();
    let err = orch.capture(camera).unwrap_err();

    assert!(matches!(err, HairstyleAiError::ImageLoad(_)));
    assert_eq!(orch.snapshot().state(), AppState::Idle);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

/// 撮影失敗時に状態を戻せなくても、返すのは取得エラー
#[test]
fn test_failed_capture_outside_scanning_keeps_capture_error() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    let stops = Arc::new(AtomicUsize::new(0));

    // start_cameraを経由しないのでセッションはIdleのまま
    let camera = CameraSession::new(BrokenCamera { stops: stops.clone() }, 80);
    let err = orch.capture(camera).unwrap_err();

    assert!(matches!(err, HairstyleAiError::ImageLoad(_)));
    assert_eq!(orch.snapshot().state(), AppState::Idle);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

/// カメラ拒否: Idleのまま固定文言のバナー
#[test]
fn test_camera_permission_denied() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);

    let result = orch.start_camera(|| {
        Err::<NoCamera, _>(HairstyleAiError::PermissionDenied("NotAllowedError".into()))
    });

    assert!(matches!(result, Err(HairstyleAiError::PermissionDenied(_))));
    let session = orch.snapshot();
    assert_eq!(session.state(), AppState::Idle);
    assert_eq!(session.error(), Some(PERMISSION_DENIED_MESSAGE));
    assert!(session.original_image().is_none());
}

/// 撮影 → 解析: カメラは1回だけ停止される
#[tokio::test(start_paused = true)]
async fn test_capture_then_pipeline() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    let stops = Arc::new(AtomicUsize::new(0));

    let camera = orch
        .start_camera(|| Ok(FakeCamera { frame: frame(), stops: stops.clone() }))
        .unwrap();
    assert_eq!(orch.snapshot().state(), AppState::Scanning);

    let image = orch.capture(camera).unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    orch.run_analysis_pipeline(image).await.unwrap();
    assert_eq!(orch.snapshot().state(), AppState::Results);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

/// 撮影キャンセルでIdleに戻りカメラ停止
#[test]
fn test_cancel_scan_releases_camera() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    let stops = Arc::new(AtomicUsize::new(0));

    let camera = orch
        .start_camera(|| Ok(FakeCamera { frame: frame(), stops: stops.clone() }))
        .unwrap();
    orch.cancel_scan(camera).unwrap();

    assert_eq!(orch.snapshot().state(), AppState::Idle);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

/// 同じJPEGならカメラ経路とアップロード経路で同一のペイロード
#[test]
fn test_camera_and_upload_payloads_match() {
    let (orch, _) = orchestrator(Ok(report(&["A"])), &[]);
    let stops = Arc::new(AtomicUsize::new(0));

    let camera = orch
        .start_camera(|| Ok(FakeCamera { frame: frame(), stops }))
        .unwrap();
    let from_camera = orch.capture(camera).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.jpg");
    std::fs::write(&path, encode_jpeg(&frame(), 80).unwrap()).unwrap();
    let from_upload = load_upload(&path, 80).unwrap();

    assert_eq!(from_camera, from_upload);
}

/// バナーを閉じた後は再度アップロードして解析できる
#[tokio::test(start_paused = true)]
async fn test_dismiss_error_then_retry() {
    let (orch, _) = orchestrator(Err("No response from AI".into()), &[]);
    assert!(orch.run_analysis_pipeline(payload("blurry")).await.is_err());

    orch.dismiss_error();
    assert!(orch.snapshot().error().is_none());

    // Idleからの再解析は受け付ける（結果は同じく失敗）
    assert!(orch.run_analysis_pipeline(payload("retry")).await.is_err());
    assert_eq!(orch.snapshot().error(), Some(ANALYSIS_FAILED_MESSAGE));
}
