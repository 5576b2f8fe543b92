//! Runtime configuration read from `CSE_*` environment variables.

use crate::error::{CseError, Result};
use crate::infrastructure::aead::AeadEncryptionService;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "CSE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracing filter directive (e.g. `"warn"`, `"card_cse=debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    /// Base64-encoded 32-byte key for the local AEAD encryption service.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            encryption_key: None,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?;

        let c: Config = cfg.try_deserialize()?;
        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(CseError::InvalidConfig(
                "CSE_LOG_LEVEL must not be empty".to_string(),
            ));
        }
        if self.encryption_key.is_some() {
            self.encryption_service()?;
        }
        Ok(())
    }

    /// Builds the AEAD service from the configured key.
    ///
    /// # Errors
    ///
    /// Returns [`CseError::InvalidConfig`] when no key is configured and
    /// [`CseError::InvalidKey`] when the key does not decode to 32 bytes.
    pub fn encryption_service(&self) -> Result<AeadEncryptionService> {
        let key = self.encryption_key.as_deref().ok_or_else(|| {
            CseError::InvalidConfig("CSE_ENCRYPTION_KEY is not set".to_string())
        })?;
        AeadEncryptionService::from_base64(key)
    }
}
