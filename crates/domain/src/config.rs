mod server;

pub use server::{CorsConfig, LoggingConfig, RegistryConfig, ServerConfig};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Warning => "WARN",
            ConfigSeverity::Error => "ERROR",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Checks the configuration for problems without failing load. Callers
    /// decide whether `Error`-severity entries should abort startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be nonzero".into(),
            });
        }

        if self.server.host.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.server.cors.allowed_origins.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "no origins allowed, browser clients will be rejected".into(),
            });
        }

        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "\"*\" allows any origin, not recommended outside local development"
                    .into(),
            });
        }

        if self.registry.ttl_hours == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "registry.ttl_hours".into(),
                message: "ttl_hours must be nonzero".into(),
            });
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "logging.level".into(),
                message: format!(
                    "unrecognized log level \"{}\", falling back to \"info\"",
                    self.logging.level
                ),
            });
        }

        errors
    }

    pub fn has_errors(errors: &[ConfigError]) -> bool {
        errors
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        let errors = cfg.validate();
        assert!(!Config::has_errors(&errors));
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let errors = cfg.validate();
        assert!(Config::has_errors(&errors));
        assert!(errors.iter().any(|e| e.field == "server.port"));
    }

    #[test]
    fn empty_host_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.host = "".into();
        let errors = cfg.validate();
        assert!(Config::has_errors(&errors));
    }

    #[test]
    fn wildcard_cors_is_a_warning_not_an_error() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let errors = cfg.validate();
        assert!(!Config::has_errors(&errors));
        assert!(errors
            .iter()
            .any(|e| e.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn zero_ttl_is_an_error() {
        let mut cfg = Config::default();
        cfg.registry.ttl_hours = 0;
        let errors = cfg.validate();
        assert!(Config::has_errors(&errors));
    }

    #[test]
    fn unknown_log_level_is_a_warning() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(!Config::has_errors(&errors));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn display_format_matches_tagged_style() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be nonzero".into(),
        };
        assert_eq!(
            err.to_string(),
            "[ERROR] server.port: port must be nonzero"
        );
    }

    #[test]
    fn load_parses_toml() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sa-domain-test-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 9000\nhost = \"0.0.0.0\"\n",
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        std::fs::remove_file(&path).ok();
    }
}
