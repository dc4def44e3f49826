use super::{Config, POLL_BACKOFF_FACTOR_RANGE, TRUSTED_EXECUTION_TAG};
use crate::error::{Error, Result};

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn push(errors: &mut Vec<ConfigValidationError>, path: &str, message: impl Into<String>) {
    errors.push(ConfigValidationError {
        path: path.to_string(),
        message: message.into(),
    });
}

/// Validate a configuration object. Credentials are checked separately by
/// [`Config::require_credentials`].
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    let endpoints = [
        ("network.rpcUrl", &config.network.rpc_url),
        ("network.smsUrl", &config.network.sms_url),
        ("network.discoveryUrl", &config.network.discovery_url),
        ("network.resultGatewayUrl", &config.network.result_gateway_url),
    ];
    for (path, value) in endpoints {
        match value.as_deref().map(str::trim) {
            None | Some("") => push(&mut errors, path, "Endpoint URL is required"),
            Some(raw) => match url::Url::parse(raw) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                Ok(u) => push(
                    &mut errors,
                    path,
                    format!("Unsupported URL scheme '{}'", u.scheme()),
                ),
                Err(e) => push(&mut errors, path, format!("Invalid URL: {e}")),
            },
        }
    }

    let programs = [
        ("execution.producerApp", &config.execution.producer_app),
        ("execution.consumerApp", &config.execution.consumer_app),
    ];
    for (path, value) in programs {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            push(&mut errors, path, "Program identity is required");
        }
    }

    if !config.execution.tag_set().contains(TRUSTED_EXECUTION_TAG) {
        push(
            &mut errors,
            "execution.tags",
            format!("Tags must include '{TRUSTED_EXECUTION_TAG}'"),
        );
    }

    if config.execution.max_wait_ms == 0 {
        push(&mut errors, "execution.maxWaitMs", "Must be greater than 0");
    }
    if config.execution.poll_interval_ms == 0 {
        push(&mut errors, "execution.pollIntervalMs", "Must be greater than 0");
    }
    if config.execution.poll_max_interval_ms == 0 {
        push(&mut errors, "execution.pollMaxIntervalMs", "Must be greater than 0");
    } else if config.execution.poll_max_interval_ms < config.execution.poll_interval_ms {
        push(
            &mut errors,
            "execution.pollMaxIntervalMs",
            "Must not be smaller than pollIntervalMs",
        );
    }
    if !POLL_BACKOFF_FACTOR_RANGE.contains(&config.execution.backoff_factor) {
        push(
            &mut errors,
            "execution.backoffFactor",
            format!(
                "Must be between {} and {}",
                POLL_BACKOFF_FACTOR_RANGE.start(),
                POLL_BACKOFF_FACTOR_RANGE.end()
            ),
        );
    }

    if config.secret.label.trim().is_empty() {
        push(&mut errors, "secret.label", "Label is required");
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Err(Error::Configuration(format!(
            "Configuration validation failed:\n{}",
            messages.join("\n")
        )))
    }
}
