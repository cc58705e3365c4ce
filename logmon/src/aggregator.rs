use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{LogEntry, TrafficStats};

/// アグリゲータの設定
#[derive(Debug, Clone)]
pub struct AggregatorOpts {
    pub refresh_interval: Duration,
}

/// 不定期な LogEntry の流れを、tick 刻みの TrafficStats の流れへ変換する。
/// エントリはない間隔でも空のスナップショットを送る（無音も情報）
pub struct TrafficAggregator {
    refresh_interval: Duration,
}

impl TrafficAggregator {
    pub fn new(opts: AggregatorOpts) -> Self {
        Self {
            refresh_interval: opts.refresh_interval,
        }
    }

    /// キャンセルか上流クローズまで集計を続ける。
    /// 終了時は送信中のスナップショットを待ってから出力を閉じる
    pub async fn run(
        self,
        token: CancellationToken,
        mut entries: mpsc::Receiver<LogEntry>,
        stats: mpsc::Sender<TrafficStats>,
    ) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval の初回 tick は即時発火するため読み捨てる
        ticker.tick().await;

        let mut buffer: Vec<LogEntry> = Vec::new();
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                maybe = entries.recv() => match maybe {
                    Some(entry) => buffer.push(entry),
                    // 上流が閉じた
                    None => break,
                },

                _ = ticker.tick() => {
                    // バッファを丸ごと差し替え、集計と送信は別タスクで行う。
                    // 下流が遅くても取り込みは止まらない
                    let batch = std::mem::take(&mut buffer);
                    in_flight = Some(spawn_summarize(batch, stats.clone(), in_flight.take()));
                }
            }
        }

        drop(stats);
        if let Some(handle) = in_flight {
            let _ = handle.await;
        }
        debug!("aggregator stopped");
    }
}

/// 1インターバル分のバッチを集計して送信するタスクを起動する。
/// 前の tick のタスク完了を待ってから送ることで、スナップショットは
/// 常に tick 順で下流へ届く
fn spawn_summarize(
    batch: Vec<LogEntry>,
    stats: mpsc::Sender<TrafficStats>,
    prev: Option<JoinHandle<()>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(prev) = prev {
            let _ = prev.await;
        }

        let mut snapshot = TrafficStats::new();
        for entry in &batch {
            snapshot.update(entry);
        }
        // 下流が閉じていたら捨てるだけでよい
        let _ = stats.send(snapshot).await;
    })
}
