use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

/// Configuration for publishing a Doorstop requirements tree.
///
/// Immutable once constructed; a single value is shared by every build target
/// of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Project name used in navbar and heading branding.
    ///
    /// When empty, the generic "Requirements" strings are used.
    project_name: String,

    /// Directory holding the Doorstop documents, relative to the project
    /// root.
    reqs_dir: String,

    /// Explicit mapping of document directory to Doorstop prefix.
    ///
    /// For example, `req = "REQ"`. When absent, documents are discovered
    /// from `.doorstop.yml` files each time they are needed.
    documents: Option<BTreeMap<String, String>>,

    /// Python interpreter used to install dependencies.
    python: String,

    /// Doorstop executable.
    doorstop: String,

    /// Python packages installed by the `reqs-deps` target.
    deps: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            reqs_dir: default_reqs_dir(),
            documents: None,
            python: default_python(),
            doorstop: default_doorstop(),
            deps: default_deps(),
        }
    }
}

/// Failure to load a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// The file is not valid configuration TOML.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Creates the default configuration branded with `project_name`.
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration at `path`, falling back to defaults when the
    /// file is missing or invalid.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config from {}: {e}", path.display());
            Self::default()
        })
    }

    /// Replaces the requirements directory.
    #[must_use]
    pub fn with_reqs_dir(mut self, reqs_dir: impl Into<String>) -> Self {
        self.reqs_dir = reqs_dir.into();
        self
    }

    /// Replaces the document mapping, disabling discovery.
    #[must_use]
    pub fn with_documents(mut self, documents: BTreeMap<String, String>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Replaces the project name.
    #[must_use]
    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    /// Replaces the Doorstop executable.
    #[must_use]
    pub fn with_doorstop(mut self, doorstop: impl Into<String>) -> Self {
        self.doorstop = doorstop.into();
        self
    }

    /// Returns the project name (may be empty).
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Returns the requirements directory, relative to the project root.
    #[must_use]
    pub fn reqs_dir(&self) -> &str {
        &self.reqs_dir
    }

    /// Returns the explicit document mapping, if configured.
    #[must_use]
    pub const fn documents(&self) -> Option<&BTreeMap<String, String>> {
        self.documents.as_ref()
    }

    /// Returns the Python interpreter.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Returns the Doorstop executable.
    #[must_use]
    pub fn doorstop(&self) -> &str {
        &self.doorstop
    }

    /// Returns the packages installed by `reqs-deps`.
    #[must_use]
    pub fn deps(&self) -> &[String] {
        &self.deps
    }
}

fn default_reqs_dir() -> String {
    "reqs".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_doorstop() -> String {
    "doorstop".to_string()
}

fn default_deps() -> Vec<String> {
    vec!["doorstop".to_string()]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        project_name: String,

        #[serde(default = "default_reqs_dir")]
        reqs_dir: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        documents: Option<BTreeMap<String, String>>,

        #[serde(default = "default_python")]
        python: String,

        #[serde(default = "default_doorstop")]
        doorstop: String,

        #[serde(default = "default_deps")]
        deps: Vec<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                project_name,
                reqs_dir,
                documents,
                python,
                doorstop,
                deps,
            } => Self {
                project_name,
                reqs_dir,
                documents,
                python,
                doorstop,
                deps,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            project_name: config.project_name,
            reqs_dir: config.reqs_dir,
            documents: config.documents,
            python: config.python,
            doorstop: config.doorstop,
            deps: config.deps,
        }
    }
}
