use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::TrafficStats;

/// 1本の TrafficStats ストリームを、同一内容・同一順序の2本へ複製する。
///
/// 1件を両方の出力へ届け終えるまで次の入力を受け取らないため、
/// 遅い方の消費者がペースを決める。キャンセル時は配送途中でも打ち切る
pub fn split(
    token: CancellationToken,
    mut input: mpsc::Receiver<TrafficStats>,
) -> (
    mpsc::Receiver<TrafficStats>,
    mpsc::Receiver<TrafficStats>,
    JoinHandle<()>,
) {
    let (tx_a, rx_a) = mpsc::channel(1);
    let (tx_b, rx_b) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        loop {
            let stats = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                maybe = input.recv() => match maybe {
                    Some(stats) => stats,
                    None => break,
                },
            };

            let delivered = tokio::select! {
                biased;
                _ = token.cancelled() => false,
                ok = async {
                    tx_a.send(stats.clone()).await.is_ok() && tx_b.send(stats).await.is_ok()
                } => ok,
            };
            if !delivered {
                break;
            }
        }
    });

    (rx_a, rx_b, handle)
}
