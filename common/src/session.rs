//! セッション状態機械
//!
//! 画面状態（Idle / Scanning / Analyzing / Results）と、元画像・解析レポート・
//! 生成スロットを1つの構造体で保持する。IOは行わない。
//!
//! 生成結果はスロットIDと実行ID（run_id）で照合する。リセットで run_id が進むため、
//! リセット前に発行されたリクエストの結果は破棄される。

use crate::error::{Error, Result};
use crate::parser::to_image_data_url;
use crate::prompts::StyleRequest;
use crate::types::{AnalysisReport, GeneratedImage, GenerationStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// カメラ取得失敗時のバナー文言
pub const PERMISSION_DENIED_MESSAGE: &str = "Camera access denied. Please upload an image.";

/// 解析失敗時のバナー文言
pub const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed. Please try a clearer photo.";

/// パイプライン実行ID
pub type RunId = u64;

/// 画面状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppState {
    #[default]
    Idle,
    Scanning,
    Analyzing,
    Results,
}

impl AppState {
    /// 遷移可否
    pub fn can_transition(self, to: AppState) -> bool {
        use AppState::*;
        matches!(
            (self, to),
            (Idle, Scanning)
                | (Idle, Analyzing)
                | (Scanning, Analyzing)
                | (Scanning, Idle)
                | (Analyzing, Results)
                | (Analyzing, Idle)
                | (Results, Idle)
        )
    }
}

/// 1スロット分の生成リクエスト
///
/// 発行時点の run_id とスロットIDを保持し、結果はこの2つで反映先を決める。
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub run_id: RunId,
    pub index: usize,
    pub slot_id: String,
    pub style: StyleRequest,
}

/// セッション状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    state: AppState,
    original_image: Option<String>,
    report: Option<AnalysisReport>,
    generated: Vec<GeneratedImage>,
    error: Option<String>,
    run_id: RunId,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// 元画像（Base64 JPEG）
    pub fn original_image(&self) -> Option<&str> {
        self.original_image.as_deref()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    pub fn generated(&self) -> &[GeneratedImage] {
        &self.generated
    }

    /// エラーバナー
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// 生成中のスロット数
    pub fn pending_count(&self) -> usize {
        self.generated.iter().filter(|g| g.loading()).count()
    }

    /// 全スロットの生成が終わっているか
    pub fn is_settled(&self) -> bool {
        self.state == AppState::Results && self.pending_count() == 0
    }

    /// 元画像のSHA-256先頭9桁（結果画面のID表示用）
    pub fn fingerprint(&self) -> Option<String> {
        self.original_image.as_ref().map(|image| {
            let digest = Sha256::digest(image.as_bytes());
            hex::encode_upper(&digest[..5])[..9].to_string()
        })
    }

    fn transition(&mut self, to: AppState) -> Result<()> {
        if !self.state.can_transition(to) {
            return Err(Error::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }

    /// カメラ起動成功: Idle → Scanning
    pub fn begin_scan(&mut self) -> Result<()> {
        self.transition(AppState::Scanning)?;
        self.error = None;
        Ok(())
    }

    /// カメラ起動失敗: Idleのままバナーを表示
    pub fn camera_denied(&mut self) {
        self.error = Some(PERMISSION_DENIED_MESSAGE.to_string());
    }

    /// 撮影せずにカメラを閉じた: Scanning → Idle
    pub fn cancel_scan(&mut self) -> Result<()> {
        if self.state != AppState::Scanning {
            return Err(Error::InvalidTransition { from: self.state, to: AppState::Idle });
        }
        self.transition(AppState::Idle)
    }

    /// 解析開始: Idle/Scanning → Analyzing
    ///
    /// 新しい run_id を払い出して返す。
    pub fn begin_analysis(&mut self, image: String) -> Result<RunId> {
        if self.state != AppState::Idle && self.state != AppState::Scanning {
            return Err(Error::InvalidTransition { from: self.state, to: AppState::Analyzing });
        }
        self.transition(AppState::Analyzing)?;
        self.run_id += 1;
        self.original_image = Some(image);
        self.report = None;
        self.generated.clear();
        self.error = None;
        Ok(self.run_id)
    }

    /// 解析失敗: Analyzing → Idle
    ///
    /// 古い run_id からの通知なら何もしない（false）。
    pub fn analysis_failed(&mut self, run_id: RunId) -> bool {
        if run_id != self.run_id || self.state != AppState::Analyzing {
            return false;
        }
        self.state = AppState::Idle;
        self.original_image = None;
        self.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
        true
    }

    /// 解析成功: Analyzing → Results
    ///
    /// 提案ごとに生成待ちスロットを作り、順番通りの生成リクエストを返す。
    /// 古い run_id からの通知ならNone。
    pub fn analysis_succeeded(
        &mut self,
        run_id: RunId,
        report: AnalysisReport,
    ) -> Option<Vec<GenerationTask>> {
        if run_id != self.run_id || self.state != AppState::Analyzing {
            return None;
        }

        self.generated = report
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| GeneratedImage::placeholder(i, &s.name))
            .collect();

        let tasks = report
            .suggestions
            .iter()
            .zip(&self.generated)
            .enumerate()
            .map(|(index, (s, slot))| GenerationTask {
                run_id,
                index,
                slot_id: slot.id.clone(),
                style: StyleRequest {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    color_hex: s.color_hex.clone(),
                },
            })
            .collect();

        self.report = Some(report);
        self.state = AppState::Results;
        Some(tasks)
    }

    /// 再生成開始
    ///
    /// 指定スロットだけを生成待ちに戻し、別バリエーション指定のリクエストを返す。
    pub fn begin_regenerate(&mut self, index: usize) -> Result<GenerationTask> {
        if self.state != AppState::Results || self.original_image.is_none() {
            return Err(Error::InvalidTransition { from: self.state, to: AppState::Results });
        }
        let report = self
            .report
            .as_ref()
            .ok_or(Error::InvalidTransition { from: self.state, to: AppState::Results })?;
        let len = self.generated.len();
        let (suggestion, slot) = report
            .suggestions
            .get(index)
            .zip(self.generated.get_mut(index))
            .ok_or(Error::IndexOutOfRange { index, len })?;

        let previous = slot.status.visible_image().map(String::from);
        slot.status = GenerationStatus::Pending { previous };

        let style = StyleRequest {
            name: suggestion.name.clone(),
            description: suggestion.description.clone(),
            color_hex: suggestion.color_hex.clone(),
        };
        Ok(GenerationTask {
            run_id: self.run_id,
            index,
            slot_id: slot.id.clone(),
            style: style.alternative(),
        })
    }

    /// 生成結果を反映
    ///
    /// `outcome` は成功なら画像（Data URL、またはJPEGのBase64）、失敗なら理由。
    /// 失敗時は直前に表示していた画像を残す。
    /// 実行IDが古い・スロットが無い場合は破棄して false を返す。
    pub fn apply_generation(
        &mut self,
        task: &GenerationTask,
        outcome: std::result::Result<String, String>,
    ) -> bool {
        if task.run_id != self.run_id || self.state != AppState::Results {
            return false;
        }
        let Some(slot) = self.generated.iter_mut().find(|g| g.id == task.slot_id) else {
            return false;
        };
        slot.status = match outcome {
            Ok(image) => GenerationStatus::Succeeded { image_url: to_image_data_url(&image) },
            Err(reason) => GenerationStatus::Failed {
                reason,
                previous: slot.status.visible_image().map(String::from),
            },
        };
        true
    }

    /// リセット: Results → Idle
    ///
    /// 元画像・レポート・スロットを破棄し、run_id を進める。
    pub fn reset(&mut self) -> Result<()> {
        if self.state != AppState::Results {
            return Err(Error::InvalidTransition { from: self.state, to: AppState::Idle });
        }
        self.transition(AppState::Idle)?;
        self.run_id += 1;
        self.original_image = None;
        self.report = None;
        self.generated.clear();
        self.error = None;
        Ok(())
    }

    /// バナーを閉じる
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}
