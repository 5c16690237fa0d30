use clap::Parser;
use figment::{
    providers::{Data, Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "./inbx.toml";

/// Command-line flags. Only flags that were actually given (or set through
/// their env var) are serialized, so unset flags never mask the TOML file.
#[derive(Parser, Serialize, Clone, Debug)]
#[command(name = "inbx-server", version, about = "Minimal HTTP inbox server")]
pub struct CliArgs {
    /// Port to listen on [default: 8080]
    #[arg(long, env = "INBX_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address; the reverse proxy usually sits on the same host [default: 127.0.0.1]
    #[arg(long, env = "INBX_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file [default: ./inbx.toml]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,

    /// Storage root for entries and credential files [default: ./data]
    #[arg(long, env = "INBX_DATA_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Maximum number of entries kept; older entries are removed first [default: 100]
    #[arg(long, env = "INBX_MAX_ENTRIES")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    /// Username for the viewer [default: admin]
    #[arg(long, env = "INBX_VIEWER_USER")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_user: Option<String>,

    /// Viewer password (hashed at startup, never written to disk).
    /// When unset, a stored credential is reused or a new password is generated.
    #[arg(long, env = "INBX_VIEWER_PASSWORD")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_password: Option<String>,

    /// Post token override; an empty value disables token auth for ingestion
    #[arg(long, env = "INBX_POST_TOKEN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_token: Option<String>,

    /// Externally visible base URL used in the example commands
    #[arg(long, env = "INBX_PUBLIC_URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub config: String,
    pub json_logs: bool,
    pub generate_config: bool,
    pub data_dir: String,
    /// Retention window
    pub max_entries: usize,
    pub viewer_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
            config: DEFAULT_CONFIG_PATH.to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            max_entries: 100,
            viewer_user: "admin".to_string(),
            viewer_password: None,
            post_token: None,
            public_url: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (INBX_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = CliArgs::parse();
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::from_layers(Toml::file(config_path), cli)
    }

    /// Merge the layers above the built-in defaults and validate the result.
    pub fn from_layers(file: Data<Toml>, cli: CliArgs) -> Result<Self, figment::Error> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed("INBX_"))
            .merge(Serialized::defaults(cli))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), figment::Error> {
        if self.max_entries == 0 {
            return Err(figment::Error::from(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if self.viewer_user.is_empty() || self.viewer_user.contains(':') {
            return Err(figment::Error::from(
                "viewer_user must be non-empty and must not contain ':'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# inbx Server Configuration
# Place this file at ./inbx.toml or specify with --config <path>
# All settings can be overridden via environment variables (INBX_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 127.0.0.1; run behind a TLS-terminating reverse proxy)
# bind_address = "127.0.0.1"

# Enable structured JSON logging
# json_logs = false

# Storage root for entries (<id>.txt + <id>.meta.json) and credential files
# data_dir = "./data"

# Retention window: maximum number of entries kept, oldest removed first
# max_entries = 100

# ---- Viewer ----

# Viewer username (default: admin)
# viewer_user = "admin"

# Viewer password. Prefer INBX_VIEWER_PASSWORD over putting it in this file.
# When unset, the stored hash is reused; on first boot a random password is
# generated and printed to the log once.
# viewer_password = ""

# ---- Ingestion ----

# Post token override. When unset, the token stored in data_dir is reused or a
# random one is generated on first boot. An empty string disables token auth.
# post_token = ""

# Base URL shown in the viewer's example commands (default: derived from Host)
# public_url = "https://example.org"
"#
    .to_string()
}
