use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_APP: &str = "auto-rotate-gcp-service-keys";
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub github: GitHubConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub username: String,
    pub password: String,
    pub totp_secret: String,
    #[serde(default = "default_app")]
    pub app: String,
    /// Owning organization, for apps that are not registered on the user account
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_github_url")]
    pub url: String,
}

// Keeps the password and TOTP seed out of debug output.
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .field("app", &self.app)
            .field("organization", &self.organization)
            .field("url", &self.url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_poll_seconds")]
    pub download_poll_seconds: u64,
}

fn default_app() -> String {
    DEFAULT_APP.to_string()
}

fn default_github_url() -> String {
    DEFAULT_GITHUB_URL.to_string()
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_poll_seconds() -> u64 {
    1
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
            download_poll_seconds: default_poll_seconds(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let github = GitHubConfig {
            username: std::env::var("USER_NAME")
                .context("USER_NAME environment variable not set")?,
            password: std::env::var("USER_PASSWORD")
                .context("USER_PASSWORD environment variable not set")?,
            totp_secret: std::env::var("USER_TOTP_SECRET")
                .or_else(|_| std::env::var("USER_TOP_SECRET"))
                .context("USER_TOTP_SECRET environment variable not set")?,
            app: std::env::var("GITHUB_APP").unwrap_or_else(|_| default_app()),
            organization: std::env::var("GITHUB_ORG").ok().filter(|s| !s.is_empty()),
            url: std::env::var("GITHUB_URL").unwrap_or_else(|_| default_github_url()),
        };

        let browser = BrowserConfig {
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| default_webdriver_url()),
            headless: std::env::var("BROWSER_HEADLESS")
                .ok()
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            download_poll_seconds: std::env::var("DOWNLOAD_POLL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        };

        Ok(Self { github, browser })
    }

    /// Create a sample configuration file
    pub fn create_sample<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample = Self {
            github: GitHubConfig {
                username: "your-github-username".to_string(),
                password: "your-github-password".to_string(),
                totp_secret: "BASE32TOTPSEED".to_string(),
                app: default_app(),
                organization: None,
                url: default_github_url(),
            },
            browser: BrowserConfig::default(),
        };

        let toml_string =
            toml::to_string_pretty(&sample).context("Failed to serialize sample config")?;
        fs::write(path.as_ref(), toml_string)
            .with_context(|| format!("Failed to write sample config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// URL of the app's settings page
    pub fn settings_url(&self) -> String {
        let base = self.github.url.trim_end_matches('/');
        match self.github.organization {
            Some(ref org) => format!("{}/organizations/{}/settings/apps/{}", base, org, self.github.app),
            None => format!("{}/settings/apps/{}", base, self.github.app),
        }
    }
}

/// Serializes tests that set process environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
