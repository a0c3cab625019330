use anyhow::Result;
use clap::Parser;

use webfont_bucket::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    run(cli).await
}
