//! Layered configuration for iconvault.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform config
//!    directory (`$XDG_CONFIG_HOME/iconvault` on Linux),
//! 3. an explicitly supplied file,
//! 4. `ICONVAULT_` environment variables, nested with `__`
//!    (`ICONVAULT_STORAGE__ROOT=/srv/icons`).
//!
//! # Example
//!
//! ```toml
//! [storage]
//! name = "local"                          # Backend name, also the URL container
//! root = "/var/lib/icons"                 # Absolute storage root
//! public_url = "https://cdn.example.org"  # Base URL stored files are served from
//! svg_only = true                         # Refuse anything but .svg keys
//!
//! [fetch]
//! timeout_secs = 30
//! user_agent = "iconvault/0.1.0"
//!
//! [geometry]
//! dimensions = "literal"                  # literal | numeric
//!
//! [listing]
//! page_size = 10
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "ICONVAULT_";
const CONFIG_FILE_STEM: &str = "config";
const CONFIG_EXTENSIONS: [&str; 3] = ["toml", "yaml", "json"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "iconvault", "iconvault")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub geometry: GeometryConfig,
    pub listing: ListingConfig,
}
impl Config {
    /// Load configuration from every layer, then validate it.
    ///
    /// `explicit` must exist when given; the platform config file is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = project_dirs() {
            for extension in CONFIG_EXTENSIONS {
                let candidate = dir.config_dir().join(CONFIG_FILE_STEM).with_extension(extension);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "Merging platform configuration file");
                    figment = merge_file(figment, &candidate)?;
                }
            }
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.display().to_string()));
            }
            tracing::debug!(path = %path.display(), "Merging configuration file");
            figment = merge_file(figment, path)?;
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration from an already-layered figment.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listing.page_size == 0 {
            exn::bail!(ErrorKind::Invalid("listing.page_size must be at least 1".to_string()));
        }
        if self.fetch.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.timeout_secs must be at least 1".to_string()));
        }
        if let Some(root) = &self.storage.root
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("storage.root must be absolute: {}", root.display())));
        }
        if self.storage.name.is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.name must not be empty".to_string()));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend name, used for logging and as the container in file URLs.
    pub name: String,
    /// Storage root. Defaults to `assets` inside the platform data directory.
    pub root: Option<PathBuf>,
    /// Base URL stored files are publicly served from.
    pub public_url: Option<String>,
    /// Restrict every storage operation to `.svg` keys.
    pub svg_only: bool,
}
impl StorageConfig {
    /// The configured root, or the platform default.
    pub fn root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        match project_dirs() {
            Some(dirs) => Ok(dirs.data_dir().join("assets")),
            None => exn::bail!(ErrorKind::NoDataDir),
        }
    }
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            root: None,
            public_url: None,
            svg_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Transport timeout for outbound fetches, in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}
impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("iconvault/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub dimensions: DimensionMode,
}

/// How a width, height or viewBox token is turned into a pixel count.
///
/// - `Literal` (default): the number of characters in the literal token, so
///   `"32px"` measures 4. Matches what existing clients have stored.
/// - `Numeric`: the leading decimal number, rounded up, so `"32px"` measures
///   32 and `"12.5"` measures 13. Zero or non-numeric tokens do not measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionMode {
    #[default]
    Literal,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Entries per listing page when the caller does not ask for a size.
    pub page_size: usize,
}
impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}
