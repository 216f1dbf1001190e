use crate::error::Result;
use async_trait::async_trait;
use hairstyle_ai_common::{AnalysisReport, StyleRequest};

/// 顔型解析・ヘアスタイル生成を行う外部サービス
#[async_trait]
pub trait StyleBackend: Send + Sync {
    /// 顔型解析（画像はBase64 JPEG）
    async fn analyze(&self, image: &str) -> Result<AnalysisReport>;

    /// ヘアスタイル編集画像を生成し、Data URLで返す
    ///
    /// プレフィックスなしのBase64を返した場合はJPEGとして扱われる。
    async fn generate(&self, image: &str, style: &StyleRequest) -> Result<String>;
}
