//! Repository configuration
//!
//! Either connection parameters (URI, database name, optional CA bundle) or an
//! already-built driver handle, plus the behavior switches every repository
//! operation consults.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, Environment, File};
use docgraph_core::errors::{DocGraphError, Result};
use docgraph_core_types::Sensitive;
use mongodb::sync::{Client, Database};
use serde::Deserialize;

use crate::errors::config_error;
use crate::id::IdType;

/// Environment variable prefix, e.g. `DOCGRAPH_DB_NAME`
pub const ENV_PREFIX: &str = "DOCGRAPH";

/// Behavior switches fixed for a repository's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoOptions {
    pub id_type: IdType,
    pub auto_preload: bool,
    pub clear_embedded_fields: bool,
}

impl Default for RepoOptions {
    fn default() -> Self {
        Self {
            id_type: IdType::ObjectId,
            auto_preload: true,
            clear_embedded_fields: true,
        }
    }
}

/// Pre-built driver handle
#[derive(Clone)]
pub struct Driver {
    pub client: Client,
    pub database: Database,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub uri: Sensitive<String>,
    pub db_name: String,
    pub certificate_path: Option<PathBuf>,
    pub allow_invalid_certificates: bool,
    pub driver: Option<Driver>,
    pub options: RepoOptions,
}

/// File/environment shape of [`Config`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub uri: Sensitive<String>,
    pub db_name: String,
    pub certificate_path: Option<PathBuf>,
    pub allow_invalid_certificates: bool,
    pub id_type: IdType,
    pub auto_preload: bool,
    pub clear_embedded_fields: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let options = RepoOptions::default();
        Self {
            uri: Sensitive::default(),
            db_name: String::new(),
            certificate_path: None,
            allow_invalid_certificates: false,
            id_type: options.id_type,
            auto_preload: options.auto_preload,
            clear_embedded_fields: options.clear_embedded_fields,
        }
    }
}

impl From<Settings> for Config {
    fn from(settings: Settings) -> Self {
        Self {
            uri: settings.uri,
            db_name: settings.db_name,
            certificate_path: settings.certificate_path,
            allow_invalid_certificates: settings.allow_invalid_certificates,
            driver: None,
            options: RepoOptions {
                id_type: settings.id_type,
                auto_preload: settings.auto_preload,
                clear_embedded_fields: settings.clear_embedded_fields,
            },
        }
    }
}

fn certificate(path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

impl Config {
    /// Connection parameters with driver-generated ObjectId identities
    ///
    /// An empty `certificate_path` means no custom CA bundle.
    pub fn new(uri: impl Into<String>, db_name: impl Into<String>, certificate_path: &str) -> Self {
        Self {
            uri: Sensitive::new(uri.into()),
            db_name: db_name.into(),
            certificate_path: certificate(certificate_path),
            ..Self::default()
        }
    }

    /// Connection parameters with caller-owned string identities
    pub fn new_string_ids(
        uri: impl Into<String>,
        db_name: impl Into<String>,
        certificate_path: &str,
    ) -> Self {
        let mut config = Self::new(uri, db_name, certificate_path);
        config.options.id_type = IdType::String;
        config
    }

    /// Use an existing driver handle; no connection is made
    pub fn with_driver(client: Client, database: Database) -> Self {
        Self {
            driver: Some(Driver { client, database }),
            ..Self::default()
        }
    }

    /// Load from a configuration file (format picked from the extension)
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the file is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = ConfigBuilder::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .and_then(ConfigBuilder::try_deserialize)
            .map_err(|e| config_error("load_config", e))?;
        Ok(settings.into())
    }

    /// Load from `DOCGRAPH_*` environment variables
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a variable has the wrong shape.
    pub fn from_env() -> Result<Self> {
        let settings: Settings = ConfigBuilder::builder()
            .add_source(environment())
            .build()
            .and_then(ConfigBuilder::try_deserialize)
            .map_err(|e| config_error("load_config", e))?;
        Ok(settings.into())
    }

    /// Defaults, then the file if present, then environment variables
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a source is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = ConfigBuilder::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(environment())
            .build()
            .and_then(ConfigBuilder::try_deserialize)
            .map_err(|e| config_error("load_config", e))?;
        Ok(settings.into())
    }

    pub fn set_auto_preload(&mut self, value: bool) {
        self.options.auto_preload = value;
    }

    pub fn set_id_type(&mut self, id_type: IdType) {
        self.options.id_type = id_type;
    }

    pub fn set_clear_embedded_fields(&mut self, value: bool) {
        self.options.clear_embedded_fields = value;
    }

    pub fn set_driver(&mut self, client: Client, database: Database) {
        self.driver = Some(Driver { client, database });
    }

    /// Skip server certificate verification (only meaningful with a CA bundle)
    pub fn set_allow_invalid_certificates(&mut self, value: bool) {
        self.allow_invalid_certificates = value;
    }

    /// Check that the configuration can produce a usable driver
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when neither a complete URI/database pair nor a complete
    /// driver handle is present, or the CA bundle does not exist.
    pub fn validate(&self) -> Result<()> {
        match &self.driver {
            Some(driver) => {
                if driver.database.name().is_empty() {
                    return Err(DocGraphError::InvalidDriver.into());
                }
            }
            None => {
                if self.uri.is_empty() || self.db_name.is_empty() {
                    return Err(DocGraphError::MissingConnectionParams.into());
                }
                if let Some(path) = &self.certificate_path {
                    if !path.is_file() {
                        return Err(DocGraphError::CertificateNotFound {
                            path: path.display().to_string(),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
