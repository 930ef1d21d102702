mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
#[cfg(feature = "server")]
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};
use homewatch::core::ServiceHealth;
use homewatch::utils::{format_response_time, sparkline_glyphs, truncate_string};
use homewatch::{App, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        #[cfg(feature = "server")]
        None => handle_serve(&config, None, None, false).await?,
        #[cfg(not(feature = "server"))]
        None => bail!("built without the server feature; use a subcommand"),
        #[cfg(feature = "server")]
        Some(Commands::Serve { port, host, cors }) => {
            handle_serve(&config, host, port, cors).await?;
        }
        Some(Commands::Check { json }) => {
            handle_check(&config, json).await?;
        }
        Some(Commands::Stats) => {
            let app = App::from_config(&config)?;
            let snapshot = app.stats.collect().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Some(Commands::Services) => {
            handle_services(&config)?;
        }
        Some(Commands::Config { command }) => {
            handle_config(cli.config.as_deref(), &config, command)?;
        }
    }

    Ok(())
}

/// Log filter comes from RUST_LOG, defaulting to info for this crate
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("homewatch=info,tower_http=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "server")]
async fn handle_serve(config: &AppConfig, host: Option<String>, port: Option<u16>, cors: bool) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        bail!("invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let app = Arc::new(App::from_config(config)?);
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    homewatch::server::run(app, &host, port, cors || config.server.cors).await
}

async fn handle_check(config: &AppConfig, json: bool) -> Result<()> {
    let app = App::from_config(config)?;
    let health = app.monitor.poll().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    println!("{}\n", "Service Health".bold());
    println!(
        "{:<24} {:<10} {:>8}  {:<24} {}",
        "SERVICE", "STATUS", "TIME", "HISTORY", "DETAIL"
    );
    for entry in &health {
        print_health_row(entry);
    }

    let up = health.iter().filter(|h| h.status.is_up()).count();
    println!("\n{}/{} services up", up, health.len());
    Ok(())
}

fn print_health_row(entry: &ServiceHealth) {
    let status = format!("{:<10}", entry.status.as_str()).color(entry.status.color());

    let history = sparkline_glyphs(&entry.sparkline);
    let history: String = history.chars().rev().take(24).collect::<Vec<_>>().into_iter().rev().collect();

    println!(
        "{:<24} {} {:>8}  {:<24} {}",
        truncate_string(&format!("{} {}", entry.icon_emoji, entry.display_name), 24),
        status,
        format_response_time(entry.response_time_ms),
        history,
        entry.error_message.as_deref().unwrap_or("")
    );
}

fn handle_services(config: &AppConfig) -> Result<()> {
    let db = homewatch::core::Database::open(&config.database_path())?;
    db.ensure_defaults(&config.services)?;

    println!("{:<4} {:<18} {:<8} {:<8} {}", "PRI", "NAME", "TYPE", "ENABLED", "TARGET");
    for service in db.list_services()? {
        let target = match (&service.url, &service.docker_container) {
            (Some(url), Some(container)) => format!("{} / {}", url, container),
            (Some(url), None) => url.clone(),
            (None, Some(container)) => format!("container {}", container),
            (None, None) => "-".to_string(),
        };
        let enabled = if service.enabled { "yes".green() } else { "no".red() };
        println!(
            "{:<4} {:<18} {:<8} {:<8} {}",
            service.priority, service.name, service.check_type.as_str(), enabled, target
        );
    }
    Ok(())
}

fn handle_config(explicit: Option<&std::path::Path>, config: &AppConfig, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("# {}", AppConfig::config_path(explicit)?.display());
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            let path = AppConfig::config_path(explicit)?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config.save(&path)?;
            println!("✓ Wrote configuration to {}", path.display());
        }
        ConfigCommands::Validate => {
            let errors = config.validate();

            if errors.is_empty() {
                println!("✓ Configuration is valid");
            } else {
                println!("✗ Configuration errors:");
                for error in &errors {
                    println!("  - {}", error);
                }
                bail!("{} configuration error(s)", errors.len());
            }
        }
    }
    Ok(())
}
