use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::debug;

/// EOF到達後に追記を確認するポーリング間隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// テイルの開始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    FileStart,
    FileEnd,
}

/// ローテーションに追随するログファイルのテイル
///
/// 追記された完全な行だけを返す。改行で終わらない断片は
/// 改行が書き込まれるまで内部に保持する。
pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    file_id: Option<u64>,
    pending: String,
}

impl LogTail {
    /// ファイルを開いてテイルを準備する。ファイルが開けなければエラー
    pub async fn open(path: impl AsRef<Path>, start: StartOffset) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).await?;
        let offset = match start {
            StartOffset::FileStart => 0,
            StartOffset::FileEnd => file.seek(SeekFrom::End(0)).await?,
        };
        let file_id = metadata_id(&file.metadata().await?);

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            file_id,
            pending: String::new(),
        })
    }

    /// 次の完全な1行を返す。追記が来るまで待ち続ける。
    /// 読み取りエラーはそのまま返し、ストリームの終端となる
    pub async fn next_line(&mut self) -> io::Result<String> {
        loop {
            let mut chunk = String::new();
            let n = self.reader.read_line(&mut chunk).await?;
            if n > 0 {
                self.offset += n as u64;
                if chunk.ends_with('\n') {
                    let mut line = std::mem::take(&mut self.pending);
                    line.push_str(chunk.trim_end_matches(['\n', '\r']));
                    return Ok(line);
                }

                // 改行待ちの断片として保持する
                self.pending.push_str(&chunk);
                continue;
            }

            // EOF: ローテーション・切り詰めを確認してから追記を待つ
            if self.reopen_if_rotated().await? {
                continue;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// パスの指す実体が変わっていたら先頭から読み直す。
    /// ローテーション中でパスが一時的に存在しない間は何もしない
    async fn reopen_if_rotated(&mut self) -> io::Result<bool> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let truncated = meta.len() < self.offset;
        let replaced = match (self.file_id, metadata_id(&meta)) {
            (Some(current), Some(on_disk)) => current != on_disk,
            _ => false,
        };
        if !truncated && !replaced {
            return Ok(false);
        }

        debug!(path = %self.path.display(), "log file rotated or truncated, reopening");
        let file = File::open(&self.path).await?;
        self.file_id = metadata_id(&file.metadata().await?);
        self.reader = BufReader::new(file);
        self.offset = 0;
        self.pending.clear();
        Ok(true)
    }
}

#[cfg(unix)]
fn metadata_id(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn metadata_id(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}
