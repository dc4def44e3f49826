mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SECRETPROOF_";

/// Top-level secretproof configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub secret: SecretConfig,
    #[serde(default, skip_serializing)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    /// State directory for the fingerprint record.
    #[serde(skip)]
    pub state_dir: PathBuf,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading overrides through `lookup`.
    pub fn load_with<F>(path: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.map(PathBuf::from).or_else(find_config_file);

        let mut config = match config_path {
            Some(ref p) if p.exists() => {
                info!("Loading config from {}", p.display());
                load_config_file(p)?
            }
            Some(ref p) if path.is_some() => {
                return Err(Error::Configuration(format!(
                    "config file {} does not exist",
                    p.display()
                )));
            }
            _ => {
                info!("No config file found, using defaults");
                Config::default()
            }
        };

        config.apply_overrides_from(&lookup);
        config.state_dir = resolve_state_dir(&lookup);

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Configuration(format!("cannot write {path}: {e}")))?;
        Ok(())
    }

    /// Apply `SECRETPROOF_*` overrides. Unparseable numbers are ignored with
    /// a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        fn parsed<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring {}{}: cannot parse '{}'", ENV_PREFIX, name, raw);
                    None
                }
            }
        }

        if let Some(url) = get("RPC_URL") {
            self.network.rpc_url = Some(url);
        }
        if let Some(url) = get("SMS_URL") {
            self.network.sms_url = Some(url);
        }
        if let Some(url) = get("DISCOVERY_URL") {
            self.network.discovery_url = Some(url);
        }
        if let Some(url) = get("RESULT_GATEWAY_URL") {
            self.network.result_gateway_url = Some(url);
        }
        if let Some(id) = parsed("CHAIN_ID", get("CHAIN_ID")) {
            self.network.chain_id = id;
        }

        if let Some(category) = parsed("CATEGORY", get("CATEGORY")) {
            self.execution.category = category;
        }
        if let Some(price) = parsed("PRICE_CEILING", get("PRICE_CEILING")) {
            self.execution.price_ceiling = price;
        }
        if let Some(tags) = get("TAGS") {
            self.execution.tags = tags.split(',').map(|t| t.trim().to_string()).collect();
        }
        if let Some(app) = get("PRODUCER_APP") {
            self.execution.producer_app = Some(app);
        }
        if let Some(app) = get("CONSUMER_APP") {
            self.execution.consumer_app = Some(app);
        }
        if let Some(args) = get("CONSUMER_ARGS") {
            self.execution.consumer_args = args;
        }
        if let Some(ms) = parsed("SETTLE_DELAY_MS", get("SETTLE_DELAY_MS")) {
            self.execution.settle_delay_ms = ms;
        }
        if let Some(ms) = parsed("POLL_INTERVAL_MS", get("POLL_INTERVAL_MS")) {
            self.execution.poll_interval_ms = ms;
        }
        if let Some(ms) = parsed("MAX_WAIT_MS", get("MAX_WAIT_MS")) {
            self.execution.max_wait_ms = ms;
        }

        if let Some(kind) = get("SECRET_TYPE") {
            // Infallible; unknown names fall back to `random`.
            self.secret.secret_type = kind.parse().unwrap_or_default();
        }
        if let Some(label) = get("SECRET_LABEL") {
            self.secret.label = label;
        }
        if let Some(flag) = parsed("ALLOW_OVERWRITE", get("ALLOW_OVERWRITE")) {
            self.secret.allow_overwrite = flag;
        }

        if let Some(key) = get("OPERATOR_KEY") {
            self.credentials.operator_key = Some(key);
        }
        if let Some(key) = get("STORE_KEY") {
            self.credentials.store_key = Some(key);
        }

        if let Some(json) = parsed("LOG_JSON", get("LOG_JSON")) {
            self.logging.json = json;
        }
    }

    pub fn require_credentials(&self) -> Result<Credentials> {
        self.credentials.resolve()
    }

    pub fn require_endpoints(&self) -> Result<Endpoints> {
        self.network.endpoints()
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.state_dir.join(FINGERPRINT_FILE)
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("secretproof.json"),
        PathBuf::from("secretproof.yaml"),
        PathBuf::from("secretproof.yml"),
        PathBuf::from("secretproof.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(STATE_DIR_NAME).join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Resolve the state directory for persistent data.
fn resolve_state_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(&format!("{ENV_PREFIX}STATE_DIR")).filter(|d| !d.trim().is_empty())
    {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|h| h.join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(STATE_DIR_NAME))
}

/// Load configuration from a file path.
fn load_config_file(path: &Path) -> Result<Config> {
    let bad = |e: &dyn std::fmt::Display| {
        Error::Configuration(format!("cannot read {}: {e}", path.display()))
    };

    let size = std::fs::metadata(path).map_err(|e| bad(&e))?.len();
    if size > MAX_CONFIG_FILE_BYTES {
        return Err(Error::Configuration(format!(
            "config file {} is {} bytes, exceeds limit of {} bytes",
            path.display(),
            size,
            MAX_CONFIG_FILE_BYTES
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| bad(&e))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| bad(&e))?,
        Some("toml") => toml::from_str(&content).map_err(|e| bad(&e))?,
        _ => {
            // JSON5 first, then strict JSON for a clearer message.
            match json5::from_str(&content) {
                Ok(config) => config,
                Err(_) => serde_json::from_str(&content).map_err(|e| bad(&e))?,
            }
        }
    };

    Ok(config)
}
