use thiserror::Error;

#[derive(Error, Debug)]
pub enum HairstyleAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`hairstyle-ai config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("カメラを利用できません: {0}")]
    PermissionDenied(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("顔型解析に失敗: {0}")]
    Analysis(String),

    #[error("ヘアスタイル生成に失敗: {0}")]
    Generation(String),

    #[error("書き出しエラー: {0}")]
    Export(String),

    #[error("セッションエラー: {0}")]
    Session(#[from] hairstyle_ai_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HairstyleAiError>;
