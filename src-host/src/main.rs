//! Webshell host
//!
//! Headless driver for the shell: replays a JSON-lines script of surface
//! and OS events and logs what a native host would do in response.

mod headless;
mod script;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use headless::{HeadlessPush, LoggingHost};
use webshell_core::{Config, Database, PushPlatform, Shell};

#[derive(Parser)]
#[command(name = "webshell")]
#[command(about = "Webshell - replay embedded-surface events against the shell", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the store in memory
    #[arg(long)]
    ephemeral: bool,

    /// Event script; stdin when omitted
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webshell_core::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env(),
    };

    let host = LoggingHost::from_env();
    let push: Arc<dyn PushPlatform> = HeadlessPush::from_env();
    let shell = if cli.ephemeral {
        Shell::with_database(config, Database::open_in_memory()?, host.shell_host(), Some(push))
    } else {
        Shell::new(config, host.shell_host(), Some(push))?
    };

    let loaded = shell.start().await?;
    tracing::info!(url = %loaded, "Shell started");

    match &cli.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            replay(&shell, BufReader::new(file)).await?;
        }
        None => replay(&shell, BufReader::new(tokio::io::stdin())).await?,
    }

    println!("{}", serde_json::to_string_pretty(&shell.snapshot())?);
    Ok(())
}

async fn replay<R>(shell: &Shell, reader: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match script::parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed event");
                continue;
            }
        };

        if let Err(e) = script::apply(shell, event).await {
            tracing::warn!(line = line_no, error = %e, "Event failed");
        }
    }

    tracing::info!(events = line_no, "Script finished");
    Ok(())
}
