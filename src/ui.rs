//! ターミナル表示と対話メニュー
//!
//! セッションのスナップショットを受け取り、前回との差分だけを出力する。

use crate::error::{HairstyleAiError, Result};
use dialoguer::{Input, Select};
use hairstyle_ai_common::render::render_style_line;
use hairstyle_ai_common::{render, AppState, GeneratedImage, Session};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// 差分表示ビュー
#[derive(Default)]
pub struct TerminalView {
    last_state: Option<AppState>,
    last_slots: Vec<GeneratedImage>,
    last_error: Option<String>,
    spinner: Option<ProgressBar>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// スナップショットを反映
    pub fn observe(&mut self, session: &Session) {
        let state = session.state();

        if self.last_state != Some(state) {
            if let Some(spinner) = self.spinner.take() {
                spinner.finish_and_clear();
            }
            if state == AppState::Analyzing {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("{spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message(render(session).trim().to_string());
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.spinner = Some(spinner);
            } else {
                println!("{}", render(session));
            }
            self.last_state = Some(state);
            self.last_slots = session.generated().to_vec();
            self.last_error = session.error().map(String::from);
            return;
        }

        if state == AppState::Results {
            for (i, item) in session.generated().iter().enumerate() {
                if self.last_slots.get(i) != Some(item) {
                    print!("{}", render_style_line(i, item));
                }
            }
            self.last_slots = session.generated().to_vec();
        }

        let error = session.error().map(String::from);
        if error != self.last_error {
            if let Some(message) = &error {
                println!("✖ {}", message);
            }
            self.last_error = error;
        }
    }

    /// 非同期処理を実行しながら状態変化を表示する
    pub async fn drive<F: Future>(&mut self, rx: &mut watch::Receiver<Session>, task: F) -> F::Output {
        tokio::pin!(task);
        loop {
            tokio::select! {
                output = &mut task => {
                    let session = rx.borrow_and_update().clone();
                    self.observe(&session);
                    return output;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return (&mut task).await;
                    }
                    let session = rx.borrow_and_update().clone();
                    self.observe(&session);
                }
            }
        }
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// 結果画面のメニュー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Regenerate(usize),
    Reset,
    Quit,
}

/// メニュー項目から選択肢へ変換
pub fn menu_choice(style_count: usize, selected: usize) -> MenuChoice {
    if selected < style_count {
        MenuChoice::Regenerate(selected)
    } else if selected == style_count {
        MenuChoice::Reset
    } else {
        MenuChoice::Quit
    }
}

fn prompt_error(e: dialoguer::Error) -> HairstyleAiError {
    HairstyleAiError::Io(std::io::Error::other(e.to_string()))
}

/// 結果画面のメニューを表示
pub fn prompt_menu(session: &Session) -> Result<MenuChoice> {
    let mut items: Vec<String> = session
        .generated()
        .iter()
        .map(|g| format!("再生成: {}", g.style_name))
        .collect();
    items.push("新しい写真で解析".to_string());
    items.push("終了".to_string());

    let selected = Select::new()
        .with_prompt("操作を選択")
        .items(&items)
        .default(items.len() - 1)
        .interact()
        .map_err(prompt_error)?;
    Ok(menu_choice(session.generated().len(), selected))
}

/// 次に解析する画像のパスを入力
pub fn prompt_image_path() -> Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("画像ファイルのパス")
        .interact_text()
        .map_err(prompt_error)?;
    Ok(PathBuf::from(path.trim()))
}

/// 撮影待ち（Enterで撮影）
pub fn wait_for_shutter() -> Result<()> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}
