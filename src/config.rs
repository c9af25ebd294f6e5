//! Configuration types for a WS-Management client session.

use crate::error::{Result, WsmanError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// WS-Addressing anonymous reply-to role.
pub const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Config version
    pub version: String,

    /// Header values shared by every message of a session
    pub session: SessionConfig,

    /// Enumerate/Pull paging limits
    pub enumeration: EnumerationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            session: SessionConfig::default(),
            enumeration: EnumerationConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| WsmanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject values the protocol cannot carry.
    pub fn validate(&self) -> Result<()> {
        if self.session.destination.is_empty() {
            return Err(WsmanError::Config("session.destination must not be empty".into()));
        }
        if self.session.reply_to.is_empty() {
            return Err(WsmanError::Config("session.reply_to must not be empty".into()));
        }
        if self.session.operation_timeout.is_zero() {
            return Err(WsmanError::Config("session.operation_timeout must be positive".into()));
        }
        if self.enumeration.max_elements == 0 || self.enumeration.max_characters == 0 {
            return Err(WsmanError::Config(
                "enumeration.max_elements and enumeration.max_characters must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Header values stamped into every envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WS-Addressing To
    pub destination: String,

    /// WS-Addressing ReplyTo/Address
    pub reply_to: String,

    /// Advisory OperationTimeout sent to the device
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            destination: "/wsman".to_string(),
            reply_to: ANONYMOUS_ADDRESS.to_string(),
            operation_timeout: Duration::from_secs(60),
        }
    }
}

/// Fixed page limits for Pull requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationConfig {
    /// MaxElements per Pull
    pub max_elements: u32,

    /// MaxCharacters per Pull
    pub max_characters: u32,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_elements: 999,
            max_characters: 99999,
        }
    }
}

/// Render a duration as an `xs:duration` in seconds, e.g. `PT60S`.
pub fn xs_duration(duration: Duration) -> String {
    let millis = duration.subsec_millis();
    if millis == 0 {
        format!("PT{}S", duration.as_secs())
    } else {
        format!("PT{}.{:03}S", duration.as_secs(), millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.session.destination, "/wsman");
        assert_eq!(config.session.reply_to, ANONYMOUS_ADDRESS);
        assert_eq!(config.session.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.enumeration.max_elements, 999);
        assert_eq!(config.enumeration.max_characters, 99999);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ClientConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.session.operation_timeout, config.session.operation_timeout);
        assert_eq!(parsed.enumeration.max_elements, config.enumeration.max_elements);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
version: "1"
session:
  destination: "http://192.168.1.20:16992/wsman"
  operation_timeout: 30s
enumeration:
  max_elements: 25
"#;
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.session.destination, "http://192.168.1.20:16992/wsman");
        assert_eq!(config.session.operation_timeout, Duration::from_secs(30));
        assert_eq!(config.session.reply_to, ANONYMOUS_ADDRESS);
        assert_eq!(config.enumeration.max_elements, 25);
        assert_eq!(config.enumeration.max_characters, 99999);
    }

    #[test]
    fn test_config_rejects_zero_page_size() {
        let yaml = "enumeration:\n  max_elements: 0\n";
        let err = ClientConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, WsmanError::Config(_)));
    }

    #[test]
    fn test_config_rejects_bad_yaml() {
        let err = ClientConfig::from_yaml("session: [not, a, map]").unwrap_err();
        assert!(matches!(err, WsmanError::Config(_)));
    }

    #[test]
    fn test_xs_duration() {
        assert_eq!(xs_duration(Duration::from_secs(60)), "PT60S");
        assert_eq!(xs_duration(Duration::from_millis(1500)), "PT1.500S");
    }
}
