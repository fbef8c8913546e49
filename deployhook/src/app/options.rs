//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::app::settings::Settings;
use crate::deploy::ScriptOptions;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Webhook handling
    pub webhook: WebhookOptions,

    /// Deploy script
    pub deploy: ScriptOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = match settings.deploy_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.host.clone(),
                port: settings.port,
            },
            webhook: WebhookOptions {
                secret: settings.webhook_secret.clone(),
                deploy_ref: settings.deploy_ref.clone(),
                wait_for_deployment: settings.wait_for_deployment,
                max_payload_size: settings.max_payload_size,
            },
            deploy: ScriptOptions {
                shell: settings.deploy_shell.clone(),
                script: settings.deploy_script.clone(),
                working_dir: settings.deploy_workdir.clone(),
                timeout,
                max_output_bytes: settings.max_output_bytes,
                ..Default::default()
            },
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// Webhook handling options
#[derive(Debug, Clone)]
pub struct WebhookOptions {
    /// HMAC shared secret
    pub secret: SecretString,

    /// Ref whose pushes deploy
    pub deploy_ref: String,

    /// Respond only after the deployment finished
    pub wait_for_deployment: bool,

    /// Body size ceiling in bytes
    pub max_payload_size: usize,
}
