use std::path::PathBuf;

use clap::Parser;

use crate::error::SetupError;
use crate::monitor::MonitorOpts;

/// Console monitor for HTTP access logs in W3C Common Log Format.
#[derive(Parser, Debug)]
#[command(name = "logmon", version, about)]
pub struct Args {
    /// Log file path to monitor
    #[arg(long, default_value = "/tmp/access.log")]
    pub source: PathBuf,

    /// Refresh interval at which traffic stats are computed, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh: u64,

    /// Alert condition, in requests per second
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub threshold: u64,

    /// Time period to check the alert condition, in seconds
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    pub window: u64,
}

impl Args {
    /// フラグ間の制約を検証して MonitorOpts へ変換する
    pub fn into_opts(self) -> Result<MonitorOpts, SetupError> {
        // ウィンドウが間隔で割り切れないと黙って丸めることになるため拒否する
        if self.window % self.refresh != 0 {
            return Err(SetupError::InvalidConfig {
                reason: format!(
                    "window ({}s) must be a multiple of refresh ({}s)",
                    self.window, self.refresh
                ),
            });
        }

        Ok(MonitorOpts {
            source: self.source,
            refresh: self.refresh,
            threshold: self.threshold,
            window: self.window,
        })
    }
}
