//! Startup configuration for the bridge binary.
//!
//! The only runtime option is where the controller lives. It is taken from
//! the first command line argument, or from the `HCI_BRIDGE_CONTROLLER`
//! environment variable when no argument is given. The host link is always
//! the process's stdin/stdout.

use crate::error::{BridgeError, Result};
use crate::transport::ControllerEndpoint;

/// Environment variable naming the controller endpoint.
pub const CONTROLLER_ENV: &str = "HCI_BRIDGE_CONTROLLER";

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Controller connection.
    pub controller: ControllerEndpoint,
}

impl BridgeConfig {
    pub fn new(controller: ControllerEndpoint) -> Self {
        Self { controller }
    }

    /// Build the configuration from process arguments and environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            std::env::args().nth(1),
            std::env::var(CONTROLLER_ENV).ok(),
        )
    }

    /// Pick the controller endpoint, the argument taking precedence.
    pub fn resolve(arg: Option<String>, env: Option<String>) -> Result<Self> {
        let raw = arg.or(env).ok_or_else(|| {
            BridgeError::Config(format!(
                "no controller endpoint: pass one as argument or set {}",
                CONTROLLER_ENV
            ))
        })?;

        Ok(Self::new(raw.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_argument_wins_over_env() {
        let config = BridgeConfig::resolve(
            Some("127.0.0.1:4000".to_string()),
            Some("/tmp/ignored.sock".to_string()),
        )
        .unwrap();
        assert_eq!(
            config.controller,
            ControllerEndpoint::Tcp("127.0.0.1:4000".parse().unwrap())
        );
    }

    #[test]
    fn test_env_fallback() {
        let config = BridgeConfig::resolve(None, Some("/run/hci0.sock".to_string())).unwrap();
        assert_eq!(
            config.controller,
            ControllerEndpoint::Unix(PathBuf::from("/run/hci0.sock"))
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let err = BridgeConfig::resolve(None, None).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains(CONTROLLER_ENV));
    }
}
