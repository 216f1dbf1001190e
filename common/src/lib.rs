//! Hairstyle AI Common Library
//!
//! CLIとクライアントで共有される型・プロンプト・セッション状態機械

pub mod types;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod session;
pub mod render;

pub use types::{AnalysisReport, FaceMetrics, GeneratedImage, GenerationStatus, HairstyleSuggestion};
pub use error::{Error, Result};
pub use parser::{
    extract_json, extract_mime_type_from_data_url, parse_analysis_response, strip_data_url_prefix,
    to_data_url, to_image_data_url, to_jpeg_data_url,
};
pub use prompts::{build_generation_prompt, StyleRequest};
pub use session::{AppState, GenerationTask, RunId, Session};
pub use render::render;
