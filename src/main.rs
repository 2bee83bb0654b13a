//! Kabu Desk terminal front-end
//!
//! Reads one command per line from stdin and prints the rendered result.

use anyhow::Context;
use kabu_desk_lib::commands::{self, view, Command};
use kabu_desk_lib::config::AppConfig;
use kabu_desk_lib::notify::NotificationCenter;
use kabu_desk_lib::services::CompanyService;
use kabu_desk_lib::state::AppState;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const SWEEP_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_dir = std::env::var_os("KABU_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = AppConfig::load(&config_dir).context("Failed to load configuration")?;

    kabu_desk_lib::init_tracing(&config.log_filter);
    tracing::info!("Starting Kabu Desk against {}", config.api_base_url);

    let state = AppState::new(config).context("Failed to initialize application state")?;
    let _sweeper = NotificationCenter::spawn_sweeper(&state.notifications, SWEEP_INTERVAL);

    // A failed initial load is already reported; the operator can retry with `load`
    match CompanyService::load(&state).await {
        Ok(count) => println!("{} 社を読み込みました", count),
        Err(e) => println!("企業一覧を読み込めませんでした: {}", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"kabu> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", view::error_line(&e));
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }

        match commands::dispatch(&state, command).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(e) if e.is_client_side() => println!("{}", view::error_line(&e)),
            Err(e) => {
                tracing::error!("Command failed: {}", e);
                println!("操作に失敗しました。詳細はログを確認してください");
            }
        }
    }

    tracing::info!("Kabu Desk stopped");
    Ok(())
}
