use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregator::{AggregatorOpts, TrafficAggregator};
use crate::alert::{AlertDetector, AlertOpts};
use crate::app;
use crate::error::SetupError;
use crate::fanout;
use crate::producer::{LogEntryProducer, ProducerOpts};
use crate::tail::StartOffset;
use crate::tui::{self, UiOpts};

/// モニタ全体の設定。秒単位の値は CLI 側で検証済み
#[derive(Debug, Clone)]
pub struct MonitorOpts {
    pub source: PathBuf,
    pub refresh: u64,
    pub threshold: u64,
    pub window: u64,
}

/// ログモニタ本体。パイプラインの各ステージを束ねる:
/// - プロデューサ: ログファイルのテイルから LogEntry のストリームを作る
/// - アグリゲータ: LogEntry を消費して TrafficStats のストリームを作る
/// - ファンアウト: TrafficStats をアラート検出と画面表示の2系統へ複製する
/// - アラート検出: TrafficStats を消費して ThresholdAlert のストリームを作る
/// - プレゼンタ: TrafficStats と ThresholdAlert を端末に描画する
pub struct Monitor {
    opts: MonitorOpts,
}

impl Monitor {
    pub fn new(opts: MonitorOpts) -> Self {
        Self { opts }
    }

    /// 各ステージを起動して終了まで面倒を見る。
    /// プレゼンタはメインタスクで動き、その終了が全体の終了となる。
    /// 終了時は全ステージの停止を待ってから端末とテイルを解放する
    pub async fn run(self) -> Result<()> {
        // 起動時にしか失敗しないリソースを先に確保する
        let producer = LogEntryProducer::setup(ProducerOpts {
            path: self.opts.source.clone(),
            start: StartOffset::FileEnd,
        })
        .await
        .context("setup producer")?;

        let mut terminal = tui::init()
            .map_err(|source| SetupError::Terminal { source })
            .context("setup terminal")?;

        info!(source = %self.opts.source.display(), "monitor starting");

        let token = CancellationToken::new();
        let (entries_tx, entries_rx) = mpsc::channel(1);
        let (stats_tx, stats_rx) = mpsc::channel(1);
        let (alerts_tx, alerts_rx) = mpsc::channel(1);

        // 各ステージを個別のタスクで起動する
        let producer_task = tokio::spawn(producer.run(token.clone(), entries_tx));

        let aggregator = TrafficAggregator::new(AggregatorOpts {
            refresh_interval: Duration::from_secs(self.opts.refresh),
        });
        let aggregator_task = tokio::spawn(aggregator.run(token.clone(), entries_rx, stats_tx));

        let (stats_for_alerts, stats_for_ui, fanout_task) = fanout::split(token.clone(), stats_rx);

        let detector = AlertDetector::new(AlertOpts {
            threshold: self.opts.threshold,
            refresh_interval: self.opts.refresh,
            window: self.opts.window,
        });
        let alert_task = tokio::spawn(detector.run(token.clone(), stats_for_alerts, alerts_tx));

        // プレゼンタはメインタスクで実行。ループを抜けたら全体を止める
        let ui_result = app::run(
            &mut terminal,
            token.clone(),
            stats_for_ui,
            alerts_rx,
            UiOpts {
                refresh: self.opts.refresh,
                threshold: self.opts.threshold,
                window: self.opts.window,
            },
        )
        .await;

        token.cancel();
        let _ = tokio::join!(producer_task, aggregator_task, fanout_task, alert_task);

        // 端末はどの経路で終了しても必ず復元する
        tui::restore().context("restore terminal")?;
        info!("monitor stopped");

        ui_result
    }
}
