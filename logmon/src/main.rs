use anyhow::Result;
use clap::Parser;

use logmon::cli::Args;
use logmon::monitor::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    logmon::logging::init()?;

    let opts = Args::parse().into_opts()?;

    // UIが終了するまでループし、起動失敗のみ非ゼロ終了となる
    Monitor::new(opts).run().await
}
