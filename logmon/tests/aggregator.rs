mod common;

use std::time::Duration;

use logmon::aggregator::{AggregatorOpts, TrafficAggregator};
use logmon::types::{LogEntry, TrafficStats};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn aggregator(interval: Duration) -> TrafficAggregator {
    TrafficAggregator::new(AggregatorOpts {
        refresh_interval: interval,
    })
}

#[tokio::test]
async fn summarizes_received_entries() {
    let (entries_tx, entries_rx) = mpsc::channel::<LogEntry>(16);
    let (stats_tx, mut stats_rx) = mpsc::channel::<TrafficStats>(1);
    let token = CancellationToken::new();

    let task = tokio::spawn(aggregator(Duration::from_millis(50)).run(
        token.clone(),
        entries_rx,
        stats_tx,
    ));

    let entries: Vec<LogEntry> = common::fixture_entries().into_iter().take(3).collect();
    let expected_bytes: u64 = entries.iter().map(|e| e.bytes).sum();
    for entry in entries {
        entries_tx.send(entry).await.unwrap();
    }

    // tick 境界をまたいでも全リクエストが1度ずつ集計される
    let mut total_requests = 0;
    let mut total_bytes = 0;
    while total_requests < 3 {
        let snapshot = timeout(WAIT, stats_rx.recv()).await.unwrap().unwrap();
        total_requests += snapshot.total_requests;
        total_bytes += snapshot.total_bytes;
    }
    assert_eq!(total_requests, 3);
    assert_eq!(total_bytes, expected_bytes);

    token.cancel();

    // キャンセル後は出力チャネルが閉じる
    while timeout(WAIT, stats_rx.recv()).await.unwrap().is_some() {}
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn emits_empty_snapshots_without_traffic() {
    // 入力は繋いだまま何も送らない
    let (_entries_tx, entries_rx) = mpsc::channel::<LogEntry>(1);
    let (stats_tx, mut stats_rx) = mpsc::channel::<TrafficStats>(1);
    let token = CancellationToken::new();

    let task = tokio::spawn(aggregator(Duration::from_secs(1)).run(
        token.clone(),
        entries_rx,
        stats_tx,
    ));

    // 3回の tick それぞれで空のスナップショットが届く
    for _ in 0..3 {
        let snapshot = timeout(WAIT, stats_rx.recv()).await.unwrap().unwrap();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.total_bytes, 0);
        assert!(snapshot.section_hits.is_empty());
        assert!(snapshot.method_hits.is_empty());
        assert!(snapshot.status_class_hits.is_empty());
    }

    token.cancel();
    // 受信側を手放して送信中のスナップショットを解放する
    drop(stats_rx);
    task.await.unwrap();
}

#[tokio::test]
async fn closes_output_when_input_closes() {
    let (entries_tx, entries_rx) = mpsc::channel::<LogEntry>(1);
    let (stats_tx, mut stats_rx) = mpsc::channel::<TrafficStats>(1);

    let task = tokio::spawn(aggregator(Duration::from_millis(50)).run(
        CancellationToken::new(),
        entries_rx,
        stats_tx,
    ));

    drop(entries_tx);

    while timeout(WAIT, stats_rx.recv()).await.unwrap().is_some() {}
    task.await.unwrap();
}

#[tokio::test]
async fn keeps_intervals_apart() {
    let (entries_tx, entries_rx) = mpsc::channel::<LogEntry>(16);
    let (stats_tx, mut stats_rx) = mpsc::channel::<TrafficStats>(1);
    let token = CancellationToken::new();

    let task = tokio::spawn(aggregator(Duration::from_millis(100)).run(
        token.clone(),
        entries_rx,
        stats_tx,
    ));

    let entries = common::fixture_entries();

    // 1件目を送って最初の非空スナップショットを待つ
    entries_tx.send(entries[0].clone()).await.unwrap();
    let first = loop {
        let s = timeout(WAIT, stats_rx.recv()).await.unwrap().unwrap();
        if s.total_requests > 0 {
            break s;
        }
    };
    assert_eq!(first.total_requests, 1);

    // 2件目は次の間隔に入り、前のスナップショットへ漏れない
    entries_tx.send(entries[1].clone()).await.unwrap();
    let second = loop {
        let s = timeout(WAIT, stats_rx.recv()).await.unwrap().unwrap();
        if s.total_requests > 0 {
            break s;
        }
    };
    assert_eq!(second.total_requests, 1);

    token.cancel();
    drop(stats_rx);
    task.await.unwrap();
}
