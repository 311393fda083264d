//! GPIO simulator client entry point.
//!
//! A terminal front end for the pin panel.  It connects to the simulator,
//! syncs the panel once, and then either prints the result, sends a single
//! pin change, or runs an interactive command loop.
//!
//! # Usage
//!
//! ```text
//! gpio-client [OPTIONS] <COMMAND>
//!
//! Commands:
//!   sync         Sync once and print the panel (or the raw snapshot with --json)
//!   set          Set one pin: `gpio-client set 3 on`
//!   panel        Interactive panel reading commands from stdin
//!   init-config  Write a default config file
//!
//! Options:
//!   --config <PATH>            Config file [default: platform config dir]
//!   --host <HOST>              Simulator host        [env: GPIO_SIM_HOST]
//!   --port <PORT>              Simulator port        [env: GPIO_SIM_PORT]
//!   --sync-timeout-ms <MS>     Bound on waiting for a sync reply
//! ```
//!
//! Logs go to stderr.  `RUST_LOG` overrides the level from the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gpio_client::application::{
    panel_command::{parse_pin_number, PanelCommand, HELP},
    pin_panel::PinPanel,
};
use gpio_client::infrastructure::{
    network::PinConnector,
    storage::config::{config_file_path, load_config_from, save_config_to, AppConfig},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mirror and drive the pins of a GPIO simulator.
#[derive(Debug, Parser)]
#[command(name = "gpio-client", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Simulator hostname or IP address (overrides the config file).
    #[arg(long, global = true, env = "GPIO_SIM_HOST")]
    host: Option<String>,

    /// Simulator TCP port (overrides the config file).
    #[arg(long, global = true, env = "GPIO_SIM_PORT")]
    port: Option<u16>,

    /// Upper bound on waiting for a sync reply, in milliseconds.
    #[arg(long, global = true)]
    sync_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Write the default configuration to the config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Simulator(SimulatorCommand),
}

/// Commands that talk to the simulator.
#[derive(Debug, Subcommand)]
enum SimulatorCommand {
    /// Sync once and print the pins the simulator reported.
    Sync {
        /// Print the raw snapshot as JSON instead of the panel.
        #[arg(long)]
        json: bool,
    },
    /// Sync, then set a single pin.
    Set {
        /// Pin number as labelled on the panel (1-26).
        pin: String,
        /// New state.
        state: PinStateArg,
    },
    /// Interactive panel; type `help` for commands.
    Panel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PinStateArg {
    On,
    Off,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("locating config file"),
        }
    }

    /// Loads the config file at `path` and applies command-line overrides.
    fn load_config(&self, path: &Path) -> anyhow::Result<AppConfig> {
        let mut config = load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?;

        if let Some(host) = &self.host {
            config.simulator.host = host.clone();
        }
        if let Some(port) = self.port {
            config.simulator.port = port;
        }
        if let Some(ms) = self.sync_timeout_ms {
            config.simulator.sync_timeout_ms = ms;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;

    let command = match cli.command {
        CliCommand::InitConfig { force } => return init_config(&config_path, force),
        CliCommand::Simulator(ref command) => command,
    };

    let config = cli.load_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let connector = Arc::new(
        PinConnector::connect(config.simulator.connector_config()?)
            .await
            .context("failed to connect to simulator")?,
    );

    let result = match command {
        SimulatorCommand::Sync { json: true } => print_snapshot_json(&connector).await,
        command => run_with_panel(command, connector.clone()).await,
    };

    connector.close().await;
    result
}

/// Syncs a fresh panel against the simulator, then runs `command` on it.
async fn run_with_panel(
    command: &SimulatorCommand,
    connector: Arc<PinConnector>,
) -> anyhow::Result<()> {
    let mut panel = PinPanel::new();
    panel.attach(connector);
    panel.sync().await.context("failed to request pin sync")?;

    match command {
        SimulatorCommand::Sync { .. } => {
            print!("{}", panel.render());
            Ok(())
        }
        SimulatorCommand::Set { pin, state } => {
            let pin = parse_pin_number(pin)?;
            panel
                .set(pin, matches!(state, PinStateArg::On))
                .await
                .with_context(|| format!("failed to set {pin}"))
        }
        SimulatorCommand::Panel => run_panel(&mut panel).await,
    }
}

/// Syncs once and prints the raw snapshot as JSON.
async fn print_snapshot_json(connector: &PinConnector) -> anyhow::Result<()> {
    let snapshot = connector.request_pin_sync().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Reads panel commands from stdin until `quit` or end of input.
///
/// Errors are printed and the loop continues.
async fn run_panel(panel: &mut PinPanel) -> anyhow::Result<()> {
    print!("{}", panel.render());
    info!("panel ready; type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<PanelCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let outcome = match command {
            PanelCommand::Toggle(pin) => panel.toggle(pin).await.map(|_| ()),
            PanelCommand::Set(pin, asserted) => panel.set(pin, asserted).await,
            PanelCommand::Sync => panel.sync().await.map(|n| println!("{n} pins reported")),
            PanelCommand::Show => Ok(()),
            PanelCommand::Help => {
                println!("{HELP}");
                continue;
            }
            PanelCommand::Quit => break,
        };

        match outcome {
            Ok(()) => print!("{}", panel.render()),
            Err(e) => {
                error!("{e}");
                eprintln!("error: {e}");
            }
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config_to(&AppConfig::default(), path)
        .with_context(|| format!("writing config to {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
