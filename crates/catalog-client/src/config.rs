//! Connection settings for the catalog service.

use catalogx_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_port() -> u16 {
    9443
}

/// Catalog connection settings, read from a YAML file.
///
/// ```yaml
/// host: catalog.example.com
/// port: 9443
/// username: isadmin
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Skip TLS certificate verification (self-signed service certificates).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ConnectionConfig {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if config.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if config.username.trim().is_empty() {
            return Err(Error::Config("username must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// The password to use: an explicit value wins over the file's.
    pub fn resolve_password(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.password.clone())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no password for user '{}'; pass --password or set CATALOG_PASSWORD",
                    self.username
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::from_yaml("host: igc.local\nusername: isadmin\n").unwrap();
        assert_eq!(config.port, 9443);
        assert_eq!(config.password, None);
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.base_url(), "https://igc.local:9443");
    }

    #[test]
    fn test_password_resolution() {
        let config = ConnectionConfig::from_yaml(
            "host: igc.local\nport: 443\nusername: isadmin\npassword: fromfile\n",
        )
        .unwrap();
        assert_eq!(config.resolve_password(None).unwrap(), "fromfile");
        assert_eq!(
            config.resolve_password(Some("explicit".to_string())).unwrap(),
            "explicit"
        );

        let no_password = ConnectionConfig::from_yaml("host: h\nusername: u\n").unwrap();
        assert!(matches!(
            no_password.resolve_password(None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_files() {
        assert!(matches!(
            ConnectionConfig::from_yaml("host: ''\nusername: u\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ConnectionConfig::from_yaml("port: 1\n"),
            Err(Error::Yaml(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ConnectionConfig::load(&dir.path().join("missing.yaml")),
            Err(Error::Config(_))
        ));
    }
}
