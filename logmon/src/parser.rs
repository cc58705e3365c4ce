use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::LogEntry;

/// ログ行のタイムスタンプ書式（例: `24/Apr/2020:18:10:14 +0000`）
pub const TIMESTAMP_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

// W3C Common Log Format のキャプチャグループ:
// remotehost rfc931 authuser [date] "method path protocol" status bytes
const LINE_PATTERN: &str =
    r#"^(\S+) (\S+) (\S+) \[([^]]+)] "(\S+) ([^"]+) (\S+)" ([0-9]{3}) ([0-9]+|-)$"#;

/// W3C Common Log Format のパーサ
/// https://www.w3.org/Daemon/User/Config/Logging.html#common-logfile-format
#[derive(Debug, Clone)]
pub struct W3CommonLogParser {
    pattern: Regex,
}

impl W3CommonLogParser {
    pub fn new() -> Self {
        // パターンは固定文字列なのでコンパイルは失敗しない
        Self {
            pattern: Regex::new(LINE_PATTERN).expect("static log line pattern"),
        }
    }

    /// 1行を LogEntry へ変換する。書式不一致・日付不正はエラー
    pub fn parse(&self, line: &str) -> Result<LogEntry> {
        let caps = self
            .pattern
            .captures(line)
            .ok_or_else(|| anyhow!("line does not match common log format"))?;

        let timestamp = DateTime::parse_from_str(&caps[4], TIMESTAMP_LAYOUT)
            .context("parse date from log line")?;

        let status: u16 = caps[8].parse().context("parse status from log line")?;

        // バイト数の `-` は 0 とみなす
        let bytes: u64 = match &caps[9] {
            "-" => 0,
            raw => raw.parse().context("parse bytes from log line")?,
        };

        Ok(LogEntry {
            remote_host: caps[1].to_string(),
            user_id: caps[2].to_string(),
            auth_user: caps[3].to_string(),
            timestamp,
            method: caps[5].to_string(),
            path: caps[6].to_string(),
            protocol: caps[7].to_string(),
            status,
            bytes,
            received_at: Utc::now(),
        })
    }
}

impl Default for W3CommonLogParser {
    fn default() -> Self {
        Self::new()
    }
}
