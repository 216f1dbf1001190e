use anyhow::Context;
use clap::Parser;
use hairstyle_ai::backend::StyleBackend;
use hairstyle_ai::{cli, config, gemini, logging, media, orchestrator, output, ui};
use cli::{Cli, Commands};
use config::Config;
use hairstyle_ai_common::render;
use media::ImagePayload;
use orchestrator::Orchestrator;
use std::path::Path;
use std::time::Duration;
use ui::{MenuChoice, TerminalView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { image, output, interactive } => {
            println!("💇 hairstyle-ai - 顔型解析\n");

            let orchestrator = build_orchestrator(&config)?;
            let payload = media::load_upload(&image, config.jpeg_quality)
                .with_context(|| format!("画像を読み込めません: {}", image.display()))?;

            run_session(&orchestrator, payload, output.as_deref(), interactive, &config).await?;
        }

        Commands::Scan { device, output, interactive } => {
            println!("📷 hairstyle-ai - カメラ撮影\n");

            let orchestrator = build_orchestrator(&config)?;
            let camera = match orchestrator.start_camera(|| media::open_camera(&device)) {
                Ok(camera) => camera,
                Err(e) => {
                    println!("{}", render(&orchestrator.snapshot()));
                    return Err(e.into());
                }
            };

            println!("{}", render(&orchestrator.snapshot()));
            if let Err(e) = ui::wait_for_shutter() {
                orchestrator.cancel_scan(camera)?;
                return Err(e.into());
            }
            let payload = orchestrator.capture(camera)?;
            println!("✔ 撮影完了\n");

            run_session(&orchestrator, payload, output.as_deref(), interactive, &config).await?;
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  解析モデル: {}", config.analysis_model);
                println!("  生成モデル: {}", config.generation_model);
                println!("  思考トークン上限: {}", config.thinking_budget);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  生成間隔: {}ms", config.generation_delay_ms);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}

fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator<gemini::GeminiClient>> {
    let client = gemini::GeminiClient::new(config)?;
    Ok(Orchestrator::new(client, Duration::from_millis(config.generation_delay_ms))
        .with_jpeg_quality(config.jpeg_quality))
}

/// 解析 → 生成 → （対話モードなら）再生成・リセットを繰り返す
async fn run_session<B: StyleBackend>(
    orchestrator: &Orchestrator<B>,
    mut payload: ImagePayload,
    output: Option<&Path>,
    interactive: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut rx = orchestrator.subscribe();
    let mut view = TerminalView::new();

    loop {
        let result = view
            .drive(&mut rx, orchestrator.run_analysis_pipeline(payload))
            .await;

        if let Err(e) = result {
            if !interactive {
                return Err(e.into());
            }
            tracing::debug!(error = %e, "analysis failed, asking for another image");
            orchestrator.dismiss_error();
            payload = next_image(config)?;
            continue;
        }
        if orchestrator.snapshot().is_settled() {
            println!("\n✅ 生成完了");
        }

        if !interactive {
            export_results(orchestrator, output)?;
            return Ok(());
        }

        loop {
            match ui::prompt_menu(&orchestrator.snapshot())? {
                MenuChoice::Regenerate(index) => {
                    view.drive(&mut rx, orchestrator.regenerate(index)).await?;
                }
                MenuChoice::Reset => {
                    export_results(orchestrator, output)?;
                    orchestrator.reset()?;
                    break;
                }
                MenuChoice::Quit => {
                    export_results(orchestrator, output)?;
                    return Ok(());
                }
            }
        }

        payload = next_image(config)?;
    }
}

fn export_results<B: StyleBackend>(
    orchestrator: &Orchestrator<B>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(dir) = output {
        let saved = output::export_session(&orchestrator.snapshot(), dir)?;
        println!("✔ 結果を保存: {}", saved.display());
    }
    Ok(())
}

/// 次の画像を読み込めるまで入力を求める
fn next_image(config: &Config) -> anyhow::Result<ImagePayload> {
    loop {
        let path = ui::prompt_image_path()?;
        match media::load_upload(&path, config.jpeg_quality) {
            Ok(payload) => return Ok(payload),
            Err(e) => println!("✖ {}", e),
        }
    }
}
