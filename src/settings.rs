use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use url::Url;

use crate::controller::Policy;
use crate::domain::EmailAddress;

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub routes: RouteSettings,
    pub pages: PageSettings,
    pub store: StoreSettings,
    pub email: EmailSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        // Get the path to the settings directory
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }

    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        defaults()?
            // Include the base settings
            .add_source(File::from(base_path.join("base")).required(true))
            // Include the runtime settings
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // Override/include any settings from environment variables
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(environment())
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }

    /// Load application settings from defaults and environment variables only.
    /// Serverless deployments ship no settings directory.
    pub fn load_from_env() -> anyhow::Result<Self> {
        defaults()?
            .add_source(environment())
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings from the environment")
    }
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("app.host", "127.0.0.1")?
        .set_default("app.port", 8000)?
        .set_default("routes.policy", "double_opt_in")?
        .set_default("routes.subscribe_path", "subscribe")?
        .set_default("routes.verify_path", "verify")?
        .set_default("routes.unsubscribe_path", "unsubscribe")?
        .set_default("store.backend", "dynamodb")?
        .set_default("email.api_timeout_milliseconds", 10_000)?)
}

fn environment() -> Environment {
    Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

/// Request paths and the workflow policy they are served with
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSettings {
    pub policy: Policy,
    /// Public base URL of the handlers, used to build verification links
    api_url: String,
    pub subscribe_path: String,
    pub verify_path: String,
    pub unsubscribe_path: String,
}

impl RouteSettings {
    pub fn api_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.api_url).context("Failed to parse API URL")?;
        // Joining onto a base without a trailing slash would replace its last segment
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Redirect targets, each built as `base_url` followed by a page path
#[derive(Debug, Clone, Deserialize)]
pub struct PageSettings {
    pub base_url: String,
    pub error_page: String,
    pub success_page: String,
    pub confirm_subscribe_page: String,
    pub confirm_unsubscribe_page: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Dynamodb,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    backend: StoreBackend,
    table_name: String,
    endpoint_url: Option<String>,
}

impl StoreSettings {
    pub fn backend(&self) -> StoreBackend {
        self.backend
    }
    /// The contact table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
    /// Endpoint override, e.g. for a local DynamoDB
    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref().filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    sender_name: String,
    sender: String,
    api_base_url: String,
    api_auth_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl EmailSettings {
    /// Display name shown alongside the sender address
    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }
    /// The email address to send application emails from
    pub fn sender(&self) -> anyhow::Result<EmailAddress> {
        self.sender
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse email sender address: {}", e))
    }
    /// The email REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
    /// The base URL for the email REST service
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse email base URL")
    }
    /// The authentication token to include when making email requests
    pub fn api_auth_token(&self) -> Secret<String> {
        self.api_auth_token.clone()
    }
}
