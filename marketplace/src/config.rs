//! Configuration: built-in defaults, then an optional YAML file, then
//! `MARKETPLACE_` environment variables (`__` separates nested keys), then
//! `DATABASE_URL`.

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Parser, Debug)]
#[command(author, version, about = "Lead marketplace API server")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short = 'f', long = "config", env = "MARKETPLACE_CONFIG", default_value = "config.yaml")]
    pub config: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Admin account ensured at startup
    pub admin_email: String,
    pub admin_password: Option<String>,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub payments: PaymentsConfig,
    pub chat: ChatConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    pub max_age: Option<u64>,
}

/// An allowed origin: `*` or a full URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CorsOrigin {
    Wildcard,
    Url(Url),
}

impl TryFrom<String> for CorsOrigin {
    type Error = url::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "*" {
            Ok(CorsOrigin::Wildcard)
        } else {
            Url::parse(&value).map(CorsOrigin::Url)
        }
    }
}

impl From<CorsOrigin> for String {
    fn from(origin: CorsOrigin) -> Self {
        match origin {
            CorsOrigin::Wildcard => "*".to_string(),
            // Origins never carry the trailing slash Url adds
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProviderKind {
    Stripe,
    /// In-process checkout for local development and tests
    Dummy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub provider: PaymentProviderKind,
    pub api_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// When false, notifications are only logged
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Recipient of operator notifications
    pub admin_email: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: "postgres://postgres@localhost/marketplace".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: None,
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            payments: PaymentsConfig::default(),
            chat: ChatConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProviderKind::Dummy,
            api_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            api_base: None,
            model: "gpt-4o".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            from: "noreply@localhost".to_string(),
            admin_email: "admin@localhost".to_string(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Config = Self::figment(args).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("MARKETPLACE_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let secret = self.auth.jwt_secret.trim();
        if secret.is_empty() || secret == DEFAULT_JWT_SECRET {
            anyhow::bail!("auth.jwt_secret must be set to a non-default value");
        }

        if self.payments.provider == PaymentProviderKind::Stripe && self.payments.api_key.is_none() {
            anyhow::bail!("payments.api_key is required when payments.provider is stripe");
        }

        if self.chat.enabled && self.chat.api_key.is_none() {
            anyhow::bail!("chat.api_key is required when chat is enabled");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
