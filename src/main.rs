//! CLI Entry Point for fscc-settings
//!
//! Inspects and configures simulated FSCC ports through the same binding
//! engine a graphical front end would drive.
//!
//! # Usage
//!
//! ```bash
//! fscc-settings ports
//! fscc-settings show
//! fscc-settings --port FSCC0 export board
//! fscc-settings --port FSCC0 apply board.fscc
//! fscc-settings --port FSCC1 defaults
//! ```
//!
//! Without `--port` the configured preferred port is opened, or the first
//! listed port when it is absent.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fscc_settings::config::{default_config_path, AppConfig};
use fscc_settings::hardware::mock::MockPortDriver;
use fscc_settings::hardware::PortDriver;
use fscc_settings::logging;
use fscc_settings::panel::{ControlPanel, SessionReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fscc-settings")]
#[command(about = "Inspect and configure FSCC port settings", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/fscc.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Port name, e.g. FSCC0
    #[arg(long, short, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available ports
    Ports,

    /// Show every setting of a port
    Show,

    /// Import a settings file and apply it to a port
    Apply {
        /// Settings file to import
        file: PathBuf,
    },

    /// Export a port's settings to a file
    Export {
        /// Destination; the settings extension is added when missing
        file: PathBuf,
    },

    /// Load the defaults file and apply it to a port
    Defaults {
        /// Defaults file (defaults to the configured path)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_from_config(&config)?;

    let driver = MockPortDriver::demo();
    let port = cli.port.as_deref();
    let preferred = config.ports.preferred.as_deref();

    match cli.command {
        Commands::Ports => {
            for port in driver.available_ports() {
                println!("{port}");
            }
            Ok(())
        }
        Commands::Show => {
            let panel = open(driver, port, preferred)?;
            print_panel(&panel);
            Ok(())
        }
        Commands::Apply { file } => {
            let mut panel = open(driver, port, preferred)?;
            let report = panel
                .import_file(&file)
                .with_context(|| format!("importing {}", file.display()))?;
            println!("Imported {} setting(s)", report.imported.len());
            let applied = panel.apply()?;
            println!(
                "Applied {} setting(s) to {}",
                applied.applied.len(),
                port_name(&panel)
            );
            Ok(())
        }
        Commands::Export { file } => {
            let panel = open(driver, port, preferred)?;
            let written = panel.export_file_with_extension(&file, &config.settings.extension)?;
            println!("Wrote {}", written.display());
            Ok(())
        }
        Commands::Defaults { file } => {
            let mut panel = open(driver, port, preferred)?;
            let path = file.unwrap_or_else(|| config.settings.defaults_path.clone());
            panel.load_defaults(&path)?;
            let applied = panel.apply()?;
            println!(
                "Applied defaults from {} ({} setting(s))",
                path.display(),
                applied.applied.len()
            );
            Ok(())
        }
    }
}

/// Select `port`, or start from `preferred` when no port was given, and fail
/// with operator guidance when it cannot be opened.
fn open(
    driver: MockPortDriver,
    port: Option<&str>,
    preferred: Option<&str>,
) -> Result<ControlPanel<MockPortDriver>> {
    let mut panel = ControlPanel::standard(driver);
    let reports = match port {
        Some(port) => panel.select(port),
        None => panel.start(preferred)?,
    };
    for report in &reports {
        check(report)?;
    }
    Ok(panel)
}

fn port_name(panel: &ControlPanel<MockPortDriver>) -> String {
    panel
        .session()
        .current_port()
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn check(report: &SessionReport) -> Result<()> {
    if let Some(failure) = report.open_failure() {
        anyhow::bail!("{}: {}\n{}", failure.title(), failure, failure.guidance());
    }
    if let Err(err) = &report.dispatch {
        anyhow::bail!("{err}");
    }
    Ok(())
}

fn print_panel(panel: &ControlPanel<MockPortDriver>) {
    println!("{:<22} {}", "Port", port_name(panel));
    for binding in panel.registry().iter() {
        let state = binding.state();
        let value = binding.display_value();
        match state.reason() {
            Some(reason) if !state.is_enabled() => {
                println!("{:<22} (disabled: {reason})", binding.label());
            }
            _ if value.is_empty() => println!("{:<22} -", binding.label()),
            _ => println!("{:<22} {value}", binding.label()),
        }
    }
}
