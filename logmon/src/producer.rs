use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SetupError;
use crate::parser::W3CommonLogParser;
use crate::tail::{LogTail, StartOffset};
use crate::types::LogEntry;

/// プロデューサの設定
#[derive(Debug, Clone)]
pub struct ProducerOpts {
    pub path: PathBuf,
    pub start: StartOffset,
}

/// ログファイルのテイルを LogEntry のストリームへ変換する。
/// 不正な行は捨てて数えるだけで、ストリームは止めない
pub struct LogEntryProducer {
    tail: LogTail,
    parser: W3CommonLogParser,
}

impl LogEntryProducer {
    /// テイルを開く。パスが開けなければ SetupError
    pub async fn setup(opts: ProducerOpts) -> Result<Self, SetupError> {
        let tail = LogTail::open(&opts.path, opts.start)
            .await
            .map_err(|source| SetupError::OpenLog {
                path: opts.path.clone(),
                source,
            })?;

        Ok(Self {
            tail,
            parser: W3CommonLogParser::new(),
        })
    }

    /// キャンセルか読み取りエラーまで行を流し続ける。
    /// 終了時に出力チャネルを閉じる（Sender の drop）
    pub async fn run(mut self, token: CancellationToken, entries: mpsc::Sender<LogEntry>) {
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                line = self.tail.next_line() => {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            // テイルの読み取りエラーはストリームの終端
                            warn!(error = %e, "tail read failed, closing entry stream");
                            break;
                        }
                    };

                    match self.parser.parse(&line) {
                        Ok(entry) => {
                            // 下流が閉じていたら終了
                            if entries.send(entry).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            // 行単位の解析失敗は数えて読み飛ばす
                            dropped += 1;
                            debug!(error = %e, line = %line, dropped, "dropped malformed line");
                        }
                    }
                }
            }
        }

        debug!(dropped, "producer stopped");
    }
}
