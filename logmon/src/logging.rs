use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// デバッグログの出力先。画面は TUI が占有するためファイルへ逃がす
const DEBUG_LOG_PATH: &str = "/tmp/logmon.log";

/// LOG_LEVEL=debug のときだけ診断ログをファイルへ書き出す。
/// それ以外はサブスクライバを設定せず、診断はすべて破棄される
pub fn init() -> Result<()> {
    match std::env::var("LOG_LEVEL") {
        Ok(level) if level == "debug" => {}
        _ => return Ok(()),
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(DEBUG_LOG_PATH)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
