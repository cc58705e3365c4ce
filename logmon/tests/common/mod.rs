// 各テストバイナリで共有するフィクスチャとヘルパ
#![allow(dead_code)]

use logmon::parser::W3CommonLogParser;
use logmon::types::{LogEntry, TrafficStats};

const FIXTURE_LOG: &str = include_str!("../testdata/entries.log");

/// フィクスチャの生ログ行
pub fn fixture_lines() -> Vec<String> {
    FIXTURE_LOG
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// フィクスチャを解析済みエントリとして返す
pub fn fixture_entries() -> Vec<LogEntry> {
    let parser = W3CommonLogParser::new();
    fixture_lines()
        .iter()
        .map(|line| parser.parse(line).expect("fixture line parses"))
        .collect()
}

/// リクエスト数だけを持つスナップショット
pub fn snapshot(total_requests: u64) -> TrafficStats {
    TrafficStats {
        total_requests,
        ..TrafficStats::new()
    }
}
