use std::collections::VecDeque;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{ThresholdAlert, TrafficStats};

/// アラート検出の設定。いずれも秒単位。
/// 前提: window は refresh_interval の整数倍（CLI 側で検証済み）
#[derive(Debug, Clone)]
pub struct AlertOpts {
    pub threshold: u64,
    pub refresh_interval: u64,
    pub window: u64,
}

/// 直近の監視ウィンドウ分のスナップショットを保持し、
/// リクエストレートがしきい値をまたいだ時だけアラートを発行する
pub struct AlertDetector {
    /// ウィンドウ内のスナップショット（先頭が最新）
    buffer: VecDeque<TrafficStats>,
    /// ウィンドウに収まるスナップショット数
    capacity: usize,
    /// ウィンドウ内の総リクエスト数（差分更新）
    reqs_in_window: u64,
    /// アラート発生中か
    ongoing: bool,
    threshold: u64,
    window_secs: u64,
}

impl AlertDetector {
    pub fn new(opts: AlertOpts) -> Self {
        let capacity = (opts.window / opts.refresh_interval) as usize;
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
            reqs_in_window: 0,
            ongoing: false,
            threshold: opts.threshold,
            window_secs: opts.window,
        }
    }

    /// キャンセルか上流クローズまでスナップショットを消費する。
    /// 終了時に出力チャネルを閉じる
    pub async fn run(
        mut self,
        token: CancellationToken,
        mut stats: mpsc::Receiver<TrafficStats>,
        alerts: mpsc::Sender<ThresholdAlert>,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                maybe = stats.recv() => match maybe {
                    Some(snapshot) => {
                        if let Some(alert) = self.observe(snapshot) {
                            debug!(is_open = alert.is_open, rate = alert.rate, "alert transition");
                            if alerts.send(alert).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                },
            }
        }

        debug!("alert detector stopped");
    }

    /// スナップショット1件をウィンドウへ取り込み、状態遷移があれば
    /// アラートを返す。しきい値ちょうどではどちらの方向にも遷移しない
    fn observe(&mut self, snapshot: TrafficStats) -> Option<ThresholdAlert> {
        self.reqs_in_window += snapshot.total_requests;
        self.buffer.push_front(snapshot);

        // ウィンドウから外れた古いスナップショットを落とす
        if self.buffer.len() > self.capacity {
            if let Some(old) = self.buffer.pop_back() {
                self.reqs_in_window -= old.total_requests;
            }
        }

        let rate = self.reqs_in_window as f64 / self.window_secs as f64;
        let threshold = self.threshold as f64;

        if self.ongoing {
            if rate < threshold {
                self.ongoing = false;
                return Some(ThresholdAlert {
                    is_open: false,
                    rate,
                    at: Utc::now(),
                });
            }
        } else if rate > threshold {
            self.ongoing = true;
            return Some(ThresholdAlert {
                is_open: true,
                rate,
                at: Utc::now(),
            });
        }

        None
    }
}
