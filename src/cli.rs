//! CLI parsing and command execution
//!
//! This module handles command-line argument parsing and routes commands to the appropriate handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::display;
use crate::github::{CredentialKind, Credentials, GitHubSession};
use crate::shell;
use crate::webdriver::{ChromeDriver, DownloadDir};

#[derive(Parser)]
#[command(name = "gar")]
#[command(about = "Rotate GitHub App client secrets and private keys through the GitHub settings UI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROTATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub App slug (overrides config file)
    #[arg(long, env = "GITHUB_APP")]
    pub app: Option<String>,

    /// Organization owning the app (overrides config file)
    #[arg(long, env = "GITHUB_ORG")]
    pub org: Option<String>,

    /// chromedriver endpoint (overrides config file)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Run Chrome without a window
    #[arg(long, env = "BROWSER_HEADLESS")]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize a sample configuration file
    Init {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "rotator-config.toml")]
        output: PathBuf,
    },

    /// Sign in, dump the app's credentials, then open an interactive shell (default)
    Shell,

    /// Sign in and dump the app's credentials
    Show,

    /// Generate a new client secret
    CreateSecret,

    /// Generate and download a new private key
    CreateKey,

    /// Delete a client secret
    DeleteSecret {
        /// Numeric id of the client secret
        id: u64,
    },

    /// Delete a private key
    DeleteKey {
        /// Numeric id of the private key
        id: u64,
    },
}

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Shell);

    // Handle init command separately as it doesn't need a browser
    if let Commands::Init { output } = command {
        Config::create_sample(&output)
            .with_context(|| format!("Failed to create sample config at {:?}", output))?;
        info!("Sample configuration created at {:?}", output);
        return Ok(());
    }

    // Load configuration
    let mut config = if let Some(config_path) = cli.config {
        Config::from_file(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        Config::from_env().context("Failed to load config from environment")?
    };

    // Override with CLI arguments if provided
    if let Some(app) = cli.app {
        config.github.app = app;
    }
    if let Some(org) = cli.org {
        config.github.organization = Some(org);
    }
    if let Some(url) = cli.webdriver_url {
        config.browser.webdriver_url = url;
    }
    if cli.headless {
        config.browser.headless = true;
    }

    let session = create_session(&config).await?;

    // The browser is closed on every path out of here, Ctrl-C included
    let result = until_interrupted(run(&session, &command), tokio::signal::ctrl_c()).await;
    if let Err(e) = session.quit().await {
        error!("Failed to close browser: {:#}", e);
    }
    result
}

/// Drive `work` to completion unless `interrupt` resolves first
async fn until_interrupted<W, I>(work: W, interrupt: I) -> Result<()>
where
    W: Future<Output = Result<()>>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = work => result,
        signal = interrupt => {
            signal.context("Failed to listen for Ctrl-C")?;
            warn!("Interrupted, closing the browser");
            anyhow::bail!("Interrupted")
        }
    }
}

async fn run(session: &GitHubSession, command: &Commands) -> Result<()> {
    session.sign_in().await.context("Failed to sign in to GitHub")?;

    match command {
        Commands::Init { .. } => unreachable!(), // Handled above

        Commands::Shell => {
            dump(session).await?;
            shell::run_shell(session).await?;
        }

        Commands::Show => dump(session).await?,

        Commands::CreateSecret => {
            let secret = session
                .create_client_secret()
                .await
                .context("Failed to create client secret")?;
            display::print_created(&secret)?;
        }

        Commands::CreateKey => {
            let key = session
                .create_private_key()
                .await
                .context("Failed to create private key")?;
            display::print_created(&key)?;
        }

        Commands::DeleteSecret { id } => {
            session
                .delete(CredentialKind::ClientSecret, *id)
                .await
                .context("Failed to delete client secret")?;
            println!("Deleted client secret {}", id);
        }

        Commands::DeleteKey { id } => {
            session
                .delete(CredentialKind::PrivateKey, *id)
                .await
                .context("Failed to delete private key")?;
            println!("Deleted private key {}", id);
        }
    }

    Ok(())
}

/// Print the app info, client secrets and private keys of the current page
async fn dump(session: &GitHubSession) -> Result<()> {
    display::print_info(&session.info().await.context("Failed to read app info")?)?;
    println!();
    display::print_credentials(
        "Client secrets",
        &session
            .client_secrets()
            .await
            .context("Failed to read client secrets")?,
    )?;
    println!();
    display::print_credentials(
        "Private keys",
        &session
            .private_keys()
            .await
            .context("Failed to read private keys")?,
    )?;
    println!();
    Ok(())
}

/// Start the browser and wrap it in a session for the configured app
async fn create_session(config: &Config) -> Result<GitHubSession> {
    let credentials = Credentials::from_config(config)?;
    let downloads = DownloadDir::new()?;

    let driver = ChromeDriver::connect(&config.browser, downloads.path())
        .await
        .with_context(|| {
            format!(
                "Failed to start Chrome via {}. Is chromedriver running?",
                config.browser.webdriver_url
            )
        })?;

    Ok(GitHubSession::new(
        Box::new(driver),
        downloads,
        credentials,
        config,
    ))
}
