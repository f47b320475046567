//! jira-mcp CLI - MCP server for Jira plus configuration commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jira_mcp_core::config::{ENV_API_TOKEN, ENV_EMAIL, ENV_FLAVOR, ENV_HOST};
use jira_mcp_core::{Config, JiraSettings};
use jira_mcp_jira::JiraClient;
use jira_mcp_server::McpServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jira-mcp")]
#[command(author, version, about = "MCP server exposing Jira projects and issues", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout (default)
    Serve,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Print a single value (e.g., jira.url)
    Get {
        key: String,
    },

    /// Store a value (e.g., jira.url https://example.atlassian.net)
    Set {
        key: String,
        value: String,
    },

    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(&config_path).await?;
            // A pending stdin read would otherwise keep the runtime alive
            std::process::exit(0);
        }
        Commands::Config { command } => run_config_command(command, &config_path)?,
    }

    Ok(())
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?;
    let settings = JiraSettings::from_env(&config)?;

    tracing::info!(
        host = %settings.host,
        flavor = %settings.flavor,
        "Connecting to Jira"
    );

    let client = JiraClient::new(&settings).context("Failed to create Jira client")?;
    let mut server = McpServer::new(Arc::new(client));

    server.run().await.context("MCP server failed")?;
    Ok(())
}

fn run_config_command(command: ConfigCommands, config_path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            print!(
                "{}",
                render_config(&config, config_path, |name| std::env::var(name).ok())
            );
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            println!("Set {} in {}", key, config_path.display());
        }
        ConfigCommands::Path => println!("{}", config_path.display()),
    }

    Ok(())
}

/// Human-readable view of the file settings and the Jira environment.
fn render_config<F>(config: &Config, path: &Path, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let jira = config.jira.clone().unwrap_or_default();
    let show = |value: Option<String>| value.unwrap_or_else(|| "(not set)".to_string());

    let mut out = format!("Config file: {}\n\n[jira]\n", path.display());
    out.push_str(&format!("  url    = {}\n", show(jira.url)));
    out.push_str(&format!("  email  = {}\n", show(jira.email)));
    out.push_str(&format!(
        "  flavor = {}\n",
        show(jira.flavor.map(|f| f.to_string()))
    ));

    out.push_str("\nEnvironment:\n");
    for name in [ENV_HOST, ENV_EMAIL, ENV_FLAVOR] {
        out.push_str(&format!("  {:<14} = {}\n", name, show(env(name))));
    }
    out.push_str(&format!(
        "  {:<14} = {}\n",
        ENV_API_TOKEN,
        show(env(ENV_API_TOKEN).map(|t| mask_token(&t)))
    ));

    out
}

/// Keep only the last four characters of long tokens.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
