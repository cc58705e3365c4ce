use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// 解析済みのアクセスログ1行分
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub remote_host: String,
    pub user_id: String,
    pub auth_user: String,
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub status: u16,
    pub bytes: u64,
    /// パイプラインに入った時刻（壁時計）
    pub received_at: DateTime<Utc>,
}

// 1リフレッシュ間隔分の集計結果
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TrafficStats {
    pub section_hits: HashMap<String, u64>,
    pub method_hits: HashMap<String, u64>,
    pub status_class_hits: HashMap<String, u64>,
    pub total_bytes: u64,
    pub total_requests: u64,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリ1件を集計へ反映する
    pub fn update(&mut self, entry: &LogEntry) {
        *self
            .section_hits
            .entry(section(&entry.path))
            .or_insert(0) += 1;
        *self.method_hits.entry(entry.method.clone()).or_insert(0) += 1;
        *self
            .status_class_hits
            .entry(status_class(entry.status).to_string())
            .or_insert(0) += 1;
        self.total_bytes += entry.bytes;
        self.total_requests += 1;
    }
}

// しきい値アラート
// is_open: true = 発生中 / false = 回復済み
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThresholdAlert {
    pub is_open: bool,
    pub rate: f64,
    pub at: DateTime<Utc>,
}

/// パスの先頭セクションを返す
/// 先頭の `/` が無ければ補う。`/foo/bar` -> `/foo`、`` -> `/`
pub fn section(path: &str) -> String {
    let normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    match normalized[1..].find('/') {
        Some(i) => normalized[..i + 1].to_string(),
        None => normalized,
    }
}

/// HTTPステータスコードをクラス（1xx〜5xx）へ丸める
pub fn status_class(status: u16) -> &'static str {
    match status {
        0..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, path: &str, status: u16, bytes: u64) -> LogEntry {
        LogEntry {
            remote_host: "192.168.0.10".into(),
            user_id: "-".into(),
            auth_user: "-".into(),
            timestamp: DateTime::parse_from_str(
                "24/Apr/2020:18:10:14 +0000",
                "%d/%b/%Y:%H:%M:%S %z",
            )
            .unwrap(),
            method: method.into(),
            path: path.into(),
            protocol: "HTTP/1.1".into(),
            status,
            bytes,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn section_keeps_leading_component() {
        assert_eq!(section("/"), "/");
        assert_eq!(section("/foo/bar"), "/foo");
        assert_eq!(section("/foo"), "/foo");
        assert_eq!(section("abc"), "/abc");
        assert_eq!(section("a/bb/ccc"), "/a");
        assert_eq!(section(""), "/");
    }

    #[test]
    fn status_class_boundaries() {
        assert_eq!(status_class(100), "1xx");
        assert_eq!(status_class(199), "1xx");
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(299), "2xx");
        assert_eq!(status_class(301), "3xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(500), "5xx");
        assert_eq!(status_class(599), "5xx");
        // 600以上も5xx扱い
        assert_eq!(status_class(650), "5xx");
    }

    #[test]
    fn update_counts_every_dimension_once() {
        let mut stats = TrafficStats::new();
        stats.update(&entry("GET", "/api/users", 200, 512));
        stats.update(&entry("GET", "/api/posts", 404, 128));
        stats.update(&entry("POST", "/login", 500, 0));

        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.total_bytes, 640);
        assert_eq!(stats.section_hits["/api"], 2);
        assert_eq!(stats.section_hits["/login"], 1);
        assert_eq!(stats.method_hits["GET"], 2);
        assert_eq!(stats.method_hits["POST"], 1);
        assert_eq!(stats.status_class_hits["2xx"], 1);
        assert_eq!(stats.status_class_hits["4xx"], 1);
        assert_eq!(stats.status_class_hits["5xx"], 1);

        // 各内訳の合計は総リクエスト数と一致する
        assert_eq!(stats.section_hits.values().sum::<u64>(), stats.total_requests);
        assert_eq!(stats.method_hits.values().sum::<u64>(), stats.total_requests);
        assert_eq!(
            stats.status_class_hits.values().sum::<u64>(),
            stats.total_requests
        );
    }

    #[test]
    fn maps_never_hold_zero_valued_entries() {
        let mut stats = TrafficStats::new();
        stats.update(&entry("GET", "/", 200, 10));
        assert!(stats.section_hits.values().all(|v| *v > 0));
        assert!(stats.method_hits.values().all(|v| *v > 0));
        assert!(stats.status_class_hits.values().all(|v| *v > 0));
    }
}
