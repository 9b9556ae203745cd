/// Configuration loader - parses lapis.toml and location files.
///
/// Separates service endpoints, HTTP settings and search defaults from code,
/// so a moved endpoint or a different default buffer doesn't need a rebuild.
/// Every section has defaults; a missing lapis.toml means "use the defaults".

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LapisError, Result};
use crate::model::{LocationSpec, DEFAULT_BUFFER_M};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "lapis.toml";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "LAPIS_CONFIG";

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LapisConfig {
    pub services: ServicesConfig,
    pub http: HttpConfig,
    pub search: SearchConfig,
    pub ratings: RatingsConfig,
    pub digital_coast: DigitalCoastConfig,
}

/// External service endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// USIEI MapServer layer query URLs, queried in order.
    pub inventory_layers: Vec<String>,
    pub ratings_url: String,
    pub gagestats_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            inventory_layers: vec![
                "https://coast.noaa.gov/arcgis/rest/services/USInteragencyElevationInventory/USIEIv2/MapServer/2/query".to_string(),
                "https://coast.noaa.gov/arcgis/rest/services/USInteragencyElevationInventory/USIEIv2/MapServer/0/query".to_string(),
            ],
            ratings_url: "https://waterdata.usgs.gov/nwisweb/get_ratings".to_string(),
            gagestats_url: "https://streamstats.usgs.gov/gagestatsservices/statistics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: format!("lapis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Buffer radius (metres) for point locations without their own.
    pub default_buffer_m: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_buffer_m: DEFAULT_BUFFER_M }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingsConfig {
    /// NWIS rating depot file type: "exsa", "base" or "corr".
    pub file_type: String,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self { file_type: "exsa".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigitalCoastConfig {
    /// Exported Digital Coast table (JSON records); optional.
    pub catalog_path: Option<PathBuf>,
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<LapisConfig> {
    let config: LapisConfig = toml::from_str(contents)
        .map_err(|e| LapisError::Config(format!("failed to parse config: {}", e)))?;

    if !(config.search.default_buffer_m > 0.0) {
        return Err(LapisError::Config(format!(
            "search.default_buffer_m must be positive, got {}",
            config.search.default_buffer_m
        )));
    }
    if !matches!(config.ratings.file_type.as_str(), "exsa" | "base" | "corr") {
        return Err(LapisError::Config(format!(
            "ratings.file_type must be one of exsa, base, corr; got '{}'",
            config.ratings.file_type
        )));
    }
    Ok(config)
}

/// Loads configuration from a TOML file.
pub fn load_config_from(path: &Path) -> Result<LapisConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| LapisError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_config(&contents)
}

/// Loads configuration the way the binary does: `.env` is read first, then
/// the file named by `LAPIS_CONFIG` (or `lapis.toml`). A missing default
/// file yields `LapisConfig::default()`; a missing file that was asked for
/// explicitly is an error.
pub fn load_config() -> Result<LapisConfig> {
    dotenv::dotenv().ok();

    match env::var(CONFIG_ENV_VAR) {
        Ok(path) => load_config_from(Path::new(&path)),
        Err(_) => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                load_config_from(path)
            } else {
                tracing::debug!("{} not found, using default configuration", DEFAULT_CONFIG_PATH);
                Ok(LapisConfig::default())
            }
        }
    }
}

/// Root structure of a locations file
#[derive(Debug, Deserialize)]
struct LocationFile {
    #[serde(default)]
    location: Vec<LocationSpec>,
}

/// Loads location descriptors from a TOML file of `[[location]]` tables.
///
/// Relative `file` paths are resolved against the locations file's directory.
pub fn load_locations(path: &Path) -> Result<Vec<LocationSpec>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| LapisError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let parsed: LocationFile = toml::from_str(&contents)
        .map_err(|e| LapisError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let locations = parsed
        .location
        .into_iter()
        .map(|spec| match spec {
            LocationSpec::File { name, value } if value.is_relative() => LocationSpec::File {
                name,
                value: base.join(value),
            },
            other => other,
        })
        .collect();

    Ok(locations)
}
