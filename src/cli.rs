use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hairstyle-ai")]
#[command(about = "顔型AI解析・ヘアスタイル生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像ファイルを解析してヘアスタイルを生成
    Analyze {
        /// 顔写真のパス（JPEG/PNG など、Data URL テキスト可）
        #[arg(required = true)]
        image: PathBuf,

        /// 結果の保存先ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 生成後に再生成・リセットを対話的に行う
        #[arg(short, long)]
        interactive: bool,
    },

    /// カメラで撮影して解析
    Scan {
        /// カメラデバイス
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,

        /// 結果の保存先ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 生成後に再生成・リセットを対話的に行う
        #[arg(short, long)]
        interactive: bool,
    },

    /// 設定管理
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 現在の設定を表示
        #[arg(long)]
        show: bool,
    },
}
