//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml, or
//!    a file passed with `--config`)
//! 3. Environment variables (override)

use std::path::Path;

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub signing: SigningConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Overall per-request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum redirect hops followed by the object fetcher (default: 10)
    pub max_redirects: usize,
}

/// HTTP Signature configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    /// Size of the ephemeral RSA key (default: 2048)
    pub key_bits: usize,
    /// Signature validity window in seconds (default: 300)
    pub validity_seconds: u64,
}

/// Resolution behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Maximum canonical-id / Announce hops (default: 3)
    pub max_canonical_depth: usize,
    /// Pause between consecutive guessing attempts in milliseconds (default: 2000)
    pub attempt_delay_ms: u64,
    /// Object URL templates tried against the origin host of a
    /// cross-instance URL. Placeholders: `{host}`, `{user}`, `{id}`.
    #[serde(default = "default_cross_instance_templates")]
    pub cross_instance_templates: Vec<String>,
    /// Actor URL templates tried before WebFinger when guessing an actor.
    /// Placeholders: `{host}`, `{user}`.
    #[serde(default = "default_actor_path_templates")]
    pub actor_path_templates: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

pub fn default_cross_instance_templates() -> Vec<String> {
    [
        // Mastodon
        "https://{host}/@{user}/{id}",
        "https://{host}/users/{user}/statuses/{id}",
        // Pleroma
        "https://{host}/notice/{id}",
        // Misskey
        "https://{host}/notes/{id}",
        // Friendica
        "https://{host}/display/{id}",
        // Hubzilla
        "https://{host}/item/{id}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_actor_path_templates() -> Vec<String> {
    [
        "https://{host}/users/{user}",
        "https://{host}/user/{user}",
        "https://{host}/accounts/{user}",
        "https://{host}/profile/{user}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_user_agent() -> String {
    format!("fedi-lookup/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                user_agent: default_user_agent(),
                timeout_seconds: 30,
                max_redirects: 10,
            },
            signing: SigningConfig {
                key_bits: 2048,
                validity_seconds: 300,
            },
            resolver: ResolverConfig {
                max_canonical_depth: 3,
                attempt_delay_ms: 2000,
                cross_instance_templates: default_cross_instance_templates(),
                actor_path_templates: default_actor_path_templates(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

/// Template lists accept comma-separated values from the environment
const LIST_KEYS: [&str; 2] = [
    "resolver.cross_instance_templates",
    "resolver.actor_path_templates",
];

/// `FEDILOOKUP__SECTION__KEY` variables, read from the process
/// environment unless `vars` is given
fn environment(vars: Option<config::Map<String, String>>) -> config::Environment {
    LIST_KEYS
        .iter()
        .fold(
            config::Environment::with_prefix("FEDILOOKUP")
                .separator("__")
                .list_separator(","),
            |env, key| env.with_list_parse_key(key),
        )
        .try_parsing(true)
        .source(vars)
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FEDILOOKUP__SECTION__KEY)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::ResolveError> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], with an explicit file layered over the
    /// `config/` files; the explicit file must exist
    pub fn load_from(path: Option<&Path>) -> Result<Self, crate::error::ResolveError> {
        use config::{Config, File};

        let mut builder = Config::builder()
            .set_default("http.user_agent", default_user_agent())?
            .set_default("http.timeout_seconds", 30)?
            .set_default("http.max_redirects", 10)?
            .set_default("signing.key_bits", 2048)?
            .set_default("signing.validity_seconds", 300)?
            .set_default("resolver.max_canonical_depth", 3)?
            .set_default("resolver.attempt_delay_ms", 2000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder.add_source(environment(None)).build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn attempt_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.resolver.attempt_delay_ms)
    }

    pub fn validate(&self) -> Result<(), crate::error::ResolveError> {
        use crate::error::ResolveError;

        const MIN_KEY_BITS: usize = 1024;

        if self.http.user_agent.trim().is_empty() {
            return Err(ResolveError::Config(
                "http.user_agent must not be empty".to_string(),
            ));
        }

        if self.http.timeout_seconds == 0 {
            return Err(ResolveError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.signing.key_bits < MIN_KEY_BITS {
            return Err(ResolveError::Config(format!(
                "signing.key_bits must be at least {}",
                MIN_KEY_BITS
            )));
        }

        if self.signing.validity_seconds == 0 {
            return Err(ResolveError::Config(
                "signing.validity_seconds must be greater than 0".to_string(),
            ));
        }

        if self.resolver.cross_instance_templates.is_empty() {
            return Err(ResolveError::Config(
                "resolver.cross_instance_templates must list at least one template".to_string(),
            ));
        }

        for template in &self.resolver.cross_instance_templates {
            if !template.contains("{host}") || !template.contains("{id}") {
                return Err(ResolveError::Config(format!(
                    "cross-instance template {} must contain {{host}} and {{id}}",
                    template
                )));
            }
        }

        for template in &self.resolver.actor_path_templates {
            if !template.contains("{host}") || !template.contains("{user}") {
                return Err(ResolveError::Config(format!(
                    "actor template {} must contain {{host}} and {{user}}",
                    template
                )));
            }
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            tracing::warn!(
                format = %self.logging.format,
                "Unknown logging.format, falling back to pretty"
            );
        }

        Ok(())
    }
}
