//! Configuration management infrastructure.
//!
//! A configuration document carries one `sign` definition, in the same
//! camelCase shape resource-definition files use, plus network settings for
//! the timestamp request. Documents are read from and written to TOML or JSON
//! depending on the file extension.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::transport::TransportKind;
use crate::domain::constants::DEFAULT_TIMESTAMP_TIMEOUT_SECS;
use crate::domain::crypto::DigestAlgorithm;
use crate::domain::types::{CertSelectMode, KeySource, Password, SignDefinition, TimestampUrl};
use crate::infra::error::{SigningError, SigningResult};

/// Serialized form of a signing definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignDefinitionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p12_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_select: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_server: Option<String>,
}

fn invalid(message: impl Into<String>) -> SigningError {
    SigningError::InvalidDefinition(message.into())
}

impl TryFrom<SignDefinitionData> for SignDefinition {
    type Error = SigningError;

    fn try_from(data: SignDefinitionData) -> Result<Self, Self::Error> {
        let source = match (data.p12_file, data.private_key_file, data.certificate_file) {
            (Some(p12_file), None, None) => KeySource::P12 {
                p12_file: p12_file.into(),
            },
            (Some(_), _, _) => {
                return Err(invalid(
                    "Only 'p12File' or ('privateKeyFile' and 'certificateFile') can be specified",
                ))
            }
            (None, Some(private_key_file), Some(certificate_file)) => KeySource::Pem {
                private_key_file: private_key_file.into(),
                certificate_file: certificate_file.into(),
            },
            (None, _, _) => {
                return Err(invalid(
                    "Both 'privateKeyFile' and 'certificateFile' are required if 'p12File' is not specified",
                ))
            }
        };

        let cert_select = match data.cert_select.as_deref() {
            Some(value) => value.parse::<CertSelectMode>()?,
            None => CertSelectMode::default(),
        };

        let digest_algorithm = match data.digest_algorithm.as_deref() {
            Some(value) => value.parse::<DigestAlgorithm>().map_err(|_| {
                invalid(format!(
                    "'sign.digestAlgorithm' is not a valid value: '{value}' (choices: {})",
                    DigestAlgorithm::available()
                        .iter()
                        .map(DigestAlgorithm::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?,
            None => DigestAlgorithm::default(),
        };

        let timestamp_server = data
            .timestamp_server
            .as_deref()
            .map(TimestampUrl::new)
            .transpose()
            .map_err(|e| invalid(format!("'sign.timestampServer': {e}")))?;

        Ok(SignDefinition {
            source,
            cert_select,
            password: data.password.map(Password::new),
            digest_algorithm,
            timestamp_server,
        })
    }
}

impl From<&SignDefinition> for SignDefinitionData {
    fn from(definition: &SignDefinition) -> Self {
        let path = |p: &Path| p.to_string_lossy().into_owned();
        let (p12_file, private_key_file, certificate_file) = match &definition.source {
            KeySource::P12 { p12_file } => (Some(path(p12_file)), None, None),
            KeySource::Pem {
                private_key_file,
                certificate_file,
            } => (None, Some(path(private_key_file)), Some(path(certificate_file))),
        };
        Self {
            p12_file,
            private_key_file,
            certificate_file,
            cert_select: Some(definition.cert_select.to_string()),
            password: definition.password.as_ref().map(|p| p.as_str().to_string()),
            digest_algorithm: Some(definition.digest_algorithm.to_string()),
            timestamp_server: definition
                .timestamp_server
                .as_ref()
                .map(|url| url.as_str().to_string()),
        }
    }
}

/// Network settings for timestamp requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkConfig {
    /// Request timeout applied by every transport
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Transport to use instead of the probed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMESTAMP_TIMEOUT_SECS
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMESTAMP_TIMEOUT_SECS,
            transport: None,
        }
    }
}

/// A complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SigningConfiguration {
    pub sign: SignDefinitionData,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl SigningConfiguration {
    #[must_use]
    pub fn new(definition: &SignDefinition) -> Self {
        Self {
            sign: definition.into(),
            network: NetworkConfig::default(),
        }
    }

    /// Validate and convert the `sign` section.
    pub fn sign_definition(&self) -> SigningResult<SignDefinition> {
        SignDefinition::try_from(self.sign.clone())
    }

    fn validate(&self) -> SigningResult<()> {
        self.sign_definition()?;
        if self.network.timeout_seconds == 0 {
            return Err(SigningError::ConfigurationError(
                "Network timeout must be greater than 0".to_string(),
            ));
        }
        if let Some(kind) = self.network.transport {
            if !kind.is_available() {
                return Err(SigningError::ConfigurationError(format!(
                    "The {kind} transport is not available in this build"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
        })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        match dirs::config_dir() {
            Some(config_dir) => Ok(config_dir.join("resedit-signing").join("config.toml")),
            None => Ok(PathBuf::from("resedit-signing-config.toml")),
        }
    }

    /// Load and validate the configuration file
    pub fn load(&self) -> SigningResult<SigningConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: SigningConfiguration = match Format::of(&self.config_path) {
            Format::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        }
        .map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SigningConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());
        config.validate()?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = match Format::of(&self.config_path) {
            Format::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        }
        .map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }
}
