//! Settings loading: JSON file, then environment, then command line

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::HookError;
use crate::logs::LogLevel;
use crate::webhooks::signature::PLACEHOLDER_SECRET;

/// Hook settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Interface to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for `X-Hub-Signature-256` verification
    #[serde(default = "default_secret")]
    pub webhook_secret: SecretString,

    /// Deploy script passed to the shell
    #[serde(default = "default_deploy_script")]
    pub deploy_script: PathBuf,

    /// Interpreter used to run the deploy script
    #[serde(default = "default_deploy_shell")]
    pub deploy_shell: String,

    /// Working directory of the deploy script, defaults to the script's directory
    #[serde(default)]
    pub deploy_workdir: Option<PathBuf>,

    /// Deadline for one deployment in seconds, 0 disables it
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_secs: u64,

    /// Branch reference whose pushes trigger a deployment
    #[serde(default = "default_deploy_ref")]
    pub deploy_ref: String,

    /// Maximum captured bytes per output stream
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Hold the webhook response until the deployment finishes
    #[serde(default = "default_true")]
    pub wait_for_deployment: bool,

    /// Append-only log file
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// JSON formatted stdout logs
    #[serde(default)]
    pub log_json: bool,

    /// Maximum webhook body size in bytes
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_secret() -> SecretString {
    SecretString::from(PLACEHOLDER_SECRET)
}

fn default_deploy_script() -> PathBuf {
    PathBuf::from("./deploy.sh")
}

fn default_deploy_shell() -> String {
    "bash".to_string()
}

fn default_deploy_timeout() -> u64 {
    900
}

fn default_deploy_ref() -> String {
    "refs/heads/master".to_string()
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/moonbot-webhook.log"))
}

fn default_max_payload_size() -> usize {
    1024 * 1024 // 1MB
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_secret: default_secret(),
            deploy_script: default_deploy_script(),
            deploy_shell: default_deploy_shell(),
            deploy_workdir: None,
            deploy_timeout_secs: default_deploy_timeout(),
            deploy_ref: default_deploy_ref(),
            max_output_bytes: default_max_output_bytes(),
            wait_for_deployment: true,
            log_file: default_log_file(),
            log_level: LogLevel::Info,
            log_json: false,
            max_payload_size: default_max_payload_size(),
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file and the process environment.
    pub async fn load(config_file: Option<&Path>) -> Result<Self, HookError> {
        let mut settings = match config_file {
            Some(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    HookError::ConfigError(format!("Unable to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&contents)?
            }
            None => Settings::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Overlay values from environment-style variables.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), HookError> {
        if let Some(v) = lookup("WEBHOOK_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("WEBHOOK_PORT") {
            self.port = parse_value("WEBHOOK_PORT", &v)?;
        }
        if let Some(v) = lookup("GITHUB_WEBHOOK_SECRET") {
            // An empty variable keeps development mode, like an unset one.
            if !v.is_empty() {
                self.webhook_secret = SecretString::from(v);
            }
        }
        if let Some(v) = lookup("DEPLOY_SCRIPT") {
            self.deploy_script = PathBuf::from(v);
        }
        if let Some(v) = lookup("DEPLOY_SHELL") {
            self.deploy_shell = v;
        }
        if let Some(v) = lookup("DEPLOY_WORKDIR") {
            self.deploy_workdir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DEPLOY_TIMEOUT_SECS") {
            self.deploy_timeout_secs = parse_value("DEPLOY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_REF") {
            self.deploy_ref = v;
        }
        if let Some(v) = lookup("DEPLOY_MAX_OUTPUT_BYTES") {
            self.max_output_bytes = parse_value("DEPLOY_MAX_OUTPUT_BYTES", &v)?;
        }
        if let Some(v) = lookup("WEBHOOK_WAIT_FOR_DEPLOYMENT") {
            self.wait_for_deployment = parse_bool("WEBHOOK_WAIT_FOR_DEPLOYMENT", &v)?;
        }
        if let Some(v) = lookup("WEBHOOK_LOG_FILE") {
            self.log_file = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("WEBHOOK_LOG_LEVEL") {
            self.log_level = v.parse().map_err(HookError::ConfigError)?;
        }
        if let Some(v) = lookup("WEBHOOK_LOG_JSON") {
            self.log_json = parse_bool("WEBHOOK_LOG_JSON", &v)?;
        }
        if let Some(v) = lookup("WEBHOOK_MAX_PAYLOAD_SIZE") {
            self.max_payload_size = parse_value("WEBHOOK_MAX_PAYLOAD_SIZE", &v)?;
        }
        Ok(())
    }

    /// Overlay `--key=value` command line flags.
    pub fn apply_cli(&mut self, args: &HashMap<String, String>) -> Result<(), HookError> {
        if let Some(v) = args.get("host") {
            self.host = v.clone();
        }
        if let Some(v) = args.get("port") {
            self.port = parse_value("--port", v)?;
        }
        if let Some(v) = args.get("deploy-script") {
            self.deploy_script = PathBuf::from(v);
        }
        if let Some(v) = args.get("log-level") {
            self.log_level = v.parse().map_err(HookError::ConfigError)?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HookError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| HookError::ConfigError(format!("Invalid value for {}: {:?} ({})", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HookError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HookError::ConfigError(format!(
            "Invalid value for {}: {:?}",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.port, 3001);
        assert_eq!(settings.max_payload_size, 1024 * 1024);
        assert_eq!(settings.deploy_ref, "refs/heads/master");
        assert_eq!(settings.webhook_secret.expose_secret(), PLACEHOLDER_SECRET);
        assert!(settings.wait_for_deployment);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("WEBHOOK_PORT", "4000"),
                ("GITHUB_WEBHOOK_SECRET", "s3cr3t"),
                ("DEPLOY_TIMEOUT_SECS", "30"),
                ("WEBHOOK_WAIT_FOR_DEPLOYMENT", "no"),
                ("WEBHOOK_LOG_FILE", ""),
            ]))
            .unwrap();

        assert_eq!(settings.port, 4000);
        assert_eq!(settings.webhook_secret.expose_secret(), "s3cr3t");
        assert_eq!(settings.deploy_timeout_secs, 30);
        assert!(!settings.wait_for_deployment);
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_empty_secret_keeps_placeholder() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("GITHUB_WEBHOOK_SECRET", "")])).unwrap();
        assert_eq!(settings.webhook_secret.expose_secret(), PLACEHOLDER_SECRET);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut settings = Settings::default();
        let result = settings.apply_env(env(&[("WEBHOOK_PORT", "eighty")]));
        assert!(matches!(result, Err(HookError::ConfigError(_))));

        let result = settings.apply_env(env(&[("WEBHOOK_LOG_JSON", "maybe")]));
        assert!(matches!(result, Err(HookError::ConfigError(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut settings = Settings::default();
        let mut args = HashMap::new();
        args.insert("port".to_string(), "8081".to_string());
        args.insert("log-level".to_string(), "debug".to_string());
        settings.apply_cli(&args).unwrap();

        assert_eq!(settings.port, 8081);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_json_file_with_partial_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{"port": 9000, "deploy_ref": "refs/heads/main"}"#).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.deploy_ref, "refs/heads/main");
        assert_eq!(settings.deploy_shell, "bash");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/deployhook.json"))).await;
        assert!(matches!(result, Err(HookError::ConfigError(_))));
    }
}
