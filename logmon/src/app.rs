use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::state::AppState;
use crate::tui::{self, Tui, UiOpts};
use crate::types::{ThresholdAlert, TrafficStats};

/// 描画の更新間隔（ミリ秒）。時計表示を進めるための再描画にも使う
const TICK_RATE: u64 = 100;

/// プレゼンタのイベントループ。
/// キャンセル・どちらかの入力のクローズ・qキー・Ctrl-C のいずれかで終了する
pub async fn run(
    terminal: &mut Tui,
    token: CancellationToken,
    mut stats: mpsc::Receiver<TrafficStats>,
    mut alerts: mpsc::Receiver<ThresholdAlert>,
    opts: UiOpts,
) -> Result<()> {
    let mut state = AppState::new();

    let mut tick_rate = time::interval(std::time::Duration::from_millis(TICK_RATE));

    // キー入力イベント監視用のストリーム
    let mut event_stream = event::EventStream::new();

    loop {
        terminal.draw(|f| tui::ui(f, &opts, &state))?;

        tokio::select! {
            _ = token.cancelled() => break,

            // 定期的な再描画タイミング
            _ = tick_rate.tick() => {}

            // キー入力イベントの処理
            Some(Ok(event)) = event_stream.next() => {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press && is_quit_key(&key.code, &key.modifiers) {
                        debug!("quit requested from keyboard");
                        break;
                    }
                }
            }

            // 集計スナップショットの受信
            maybe = stats.recv() => match maybe {
                Some(s) => state.update_stats(s),
                None => break,
            },

            // アラート遷移の受信
            maybe = alerts.recv() => match maybe {
                Some(a) => state.push_alert(a),
                None => break,
            },
        }
    }

    Ok(())
}

fn is_quit_key(code: &KeyCode, modifiers: &KeyModifiers) -> bool {
    matches!(code, KeyCode::Char('q'))
        || (matches!(code, KeyCode::Char('c')) && modifiers.contains(KeyModifiers::CONTROL))
}
