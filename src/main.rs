//! DICEBOT: multi-strategy dice betting client
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the bet executor and presenter, and runs betting sessions until
//! a session ends without auto-start or the operator presses Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use dicebot::config::{AppConfig, DisplayMode};
use dicebot::dashboard::terminal::TerminalPresenter;
use dicebot::dashboard::{LogPresenter, Presenter};
use dicebot::engine::clock::SystemClock;
use dicebot::engine::runner::SessionRunner;
use dicebot::platforms::simulated::SimulatedDice;
use dicebot::platforms::wolfbet::WolfBetClient;
use dicebot::platforms::BetExecutor;
use dicebot::types::{from_units, SessionEnd};

const BANNER: &str = r#"
 ____ ___ ____ _____ ____   ___ _____
|  _ \_ _/ ___| ____| __ ) / _ \_   _|
| | | | | |   |  _| |  _ \| | | || |
| |_| | | |___| |___| |_) | |_| || |
|____/___\____|_____|____/ \___/ |_|

  Multi-strategy dice betting client
  v0.1.0
"#;

/// Multi-strategy dice betting client.
#[derive(Parser, Debug)]
#[command(name = "dicebot", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (`.toml` for TOML, JSON otherwise)
    #[arg(default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.display().to_string();
    let cfg = AppConfig::load(&cli.config)
        .with_context(|| format!("Cannot start without a valid config ({config_path})"))?;
    let settings = cfg.settings().context("Invalid configuration")?;

    println!("{BANNER}");
    info!(
        config = %config_path,
        currency = %settings.runner.bet.currency,
        strategy = %settings.runner.strategy,
        auto_switch = settings.runner.switch.enabled,
        switch_mode = %settings.runner.switch.mode,
        take_profit = %from_units(settings.runner.limits.take_profit),
        stop_loss = %from_units(settings.runner.limits.stop_loss),
        dry_run = settings.dry_run,
        "DICEBOT starting up"
    );

    // -- Initialise components -------------------------------------------

    let executor: Box<dyn BetExecutor> = if settings.dry_run {
        info!(
            balance = %from_units(settings.simulated_balance),
            seed = ?settings.runner.seed,
            "Dry run: bets are simulated locally"
        );
        Box::new(SimulatedDice::new(
            &settings.runner.bet.currency,
            settings.simulated_balance,
            settings.runner.seed,
        ))
    } else {
        let token = cfg.access_token().context("No WolfBet access token")?;
        Box::new(WolfBetClient::new(&settings.api_base, token)?)
    };

    let presenter: Box<dyn Presenter> = match settings.display {
        DisplayMode::Terminal => Box::new(TerminalPresenter::new()),
        DisplayMode::Log => Box::new(LogPresenter),
    };

    let mut runner = SessionRunner::new(
        settings.runner.clone(),
        executor,
        Arc::new(SystemClock),
        presenter,
    );

    // -- Stop signal ------------------------------------------------------

    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, finishing current bet.");
            let _ = stop_tx.send(true);
        }
    });

    // -- Main loop -------------------------------------------------------

    info!("Entering betting loop. Press Ctrl+C to stop.");
    let end = runner.run(settings.restart, &mut stop_rx).await;

    match end {
        SessionEnd::Unauthorized => {
            warn!("Access token rejected, check WOLFBET_ACCESS_TOKEN");
            anyhow::bail!("WolfBet rejected the access token");
        }
        SessionEnd::PlacementFailed => {
            anyhow::bail!("Bets could not be placed, see the log for the API response");
        }
        other => info!(reason = %other, "DICEBOT shut down cleanly."),
    }

    Ok(())
}

/// Initialise the `tracing` subscriber on stderr so stdout stays free for
/// the terminal panel.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dicebot=info"));

    let json_logging = std::env::var("DICEBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["dicebot"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.json"));

        let cli = Cli::try_parse_from(["dicebot", "bot.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("bot.toml"));

        assert!(Cli::try_parse_from(["dicebot", "a.json", "b.json"]).is_err());
    }
}
