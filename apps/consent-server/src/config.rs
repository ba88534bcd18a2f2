use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cookie_preferences::CookiePreferencesConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `APP__SERVER__BIND_ADDR`.
pub const ENV_PREFIX: &str = "APP__";

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub cookie_preferences: CookiePreferencesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub body_limit_bytes: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            body_limit_bytes: 64 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence unless `-v` was given.
    pub level: String,
    pub format: LogFormat,
    /// Set by `-v`; never read from or written to YAML.
    #[serde(skip)]
    pub from_cli: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
            from_cli: false,
        }
    }
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Raise a plain level by `steps`, saturating at `trace`. A composite
/// directive such as `info,hyper=warn` is raised from `info`.
fn raise_level(level: &str, steps: u8) -> String {
    let base = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(level.trim()))
        .unwrap_or(2);
    let raised = (base + usize::from(steps)).min(LEVELS.len() - 1);
    LEVELS[raised].to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_owned()],
            allowed_methods: ["GET", "POST", "DELETE", "OPTIONS"]
                .map(str::to_owned)
                .to_vec(),
            allowed_headers: vec!["*".to_owned()],
            allow_credentials: false,
            max_age_seconds: 600,
        }
    }
}

/// Overrides that come from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub verbose: u8,
}

impl AppConfig {
    /// Layered load: defaults, then the YAML file if given, then `APP__*` env.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(&figment)
    }

    fn extract(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns an error for values that parse but cannot work together.
    pub fn validate(&self) -> Result<()> {
        if self.server.body_limit_bytes == 0 {
            bail!("server.body_limit_bytes must be greater than zero");
        }
        if self.server.request_timeout.is_zero() {
            bail!("server.request_timeout must be greater than zero");
        }
        if self.cookie_preferences.max_user_id_length == 0 {
            bail!("cookie_preferences.max_user_id_length must be greater than zero");
        }
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            bail!("cors.allowed_origins ['*'] cannot be combined with cors.allow_credentials");
        }
        Ok(())
    }

    /// `--port` replaces the bind port; each `-v` raises `logging.level` one
    /// step (error, warn, info, debug, trace) and marks it as overriding
    /// `RUST_LOG`.
    pub fn apply_cli_overrides(&mut self, cli: CliOverrides) {
        if let Some(port) = cli.port {
            self.server.bind_addr.set_port(port);
        }
        if cli.verbose > 0 {
            self.logging.level = raise_level(&self.logging.level, cli.verbose);
            self.logging.from_cli = true;
        }
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration as YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> Result<AppConfig> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::string(yaml));
        AppConfig::extract(&figment)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.server.body_limit_bytes, 65536);
        assert_eq!(config.server.request_timeout, Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.cors.enabled);
        assert_eq!(config.cors.allowed_origins, vec!["*".to_owned()]);
        assert_eq!(config.cookie_preferences.max_user_id_length, 256);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = from_yaml(
            r"
server:
  bind_addr: 0.0.0.0:8080
  request_timeout: 5s
logging:
  format: json
cookie_preferences:
  max_user_id_length: 64
",
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.server.request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.body_limit_bytes, 65536);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.cookie_preferences.max_user_id_length, 64);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(from_yaml("server:\n  bind_adr: 0.0.0.0:1\n").is_err());
    }

    #[test]
    fn test_wildcard_origin_with_credentials_is_rejected() {
        let err = from_yaml("cors:\n  allow_credentials: true\n").unwrap_err();
        assert!(err.to_string().contains("allow_credentials"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/consent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(CliOverrides {
            port: Some(4000),
            verbose: 1,
        });
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:4000");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.from_cli);
    }

    #[test]
    fn test_verbose_raises_from_configured_level() {
        let mut config = from_yaml("logging:\n  level: warn\n").unwrap();
        config.apply_cli_overrides(CliOverrides {
            port: None,
            verbose: 1,
        });
        assert_eq!(config.logging.level, "info");

        config.apply_cli_overrides(CliOverrides {
            port: None,
            verbose: 9,
        });
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_no_verbose_keeps_level_and_env_precedence() {
        let mut config = from_yaml("logging:\n  level: warn\n").unwrap();
        config.apply_cli_overrides(CliOverrides::default());
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.from_cli);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("bind_addr"));
        assert_eq!(from_yaml(&yaml).unwrap(), config);
    }
}
