//! Runner configuration (`lidar.yaml`).
//!
//! Every field is optional; missing fields take the archive defaults.
//!
//! ```yaml
//! base_url: https://usgs-lidar-public.s3.us-west-2.amazonaws.com/
//! catalog_path: data/aws_dataset.json
//! known_partitions_path: data/filenames.txt
//! template_path: templates/pipeline.json
//! target_epsg: 26915
//! pdal_program: pdal
//! rate_limit_every: 100
//! pause_seconds: 5
//! request_timeout_secs: 60
//! ```

use crate::{Result, RunnerError};
use lidar_catalog::{ConsolidationConfig, DEFAULT_BASE_URL};
use lidar_fetch::{Epsg, FetcherSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "lidar.yaml";

/// Settings for the `lidar` command, read from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Archive root URL.
    pub base_url: String,
    /// Catalog interchange file.
    pub catalog_path: PathBuf,
    /// Newline-delimited list of archive folder names.
    pub known_partitions_path: PathBuf,
    /// Pipeline stage template; the built-in template is used when unset.
    pub template_path: Option<PathBuf>,
    /// EPSG code of the returned points.
    pub target_epsg: u16,
    /// Point cloud engine executable.
    pub pdal_program: String,
    /// Metadata fetches between throttle pauses (0 disables).
    pub rate_limit_every: usize,
    /// Length of each throttle pause, in seconds.
    pub pause_seconds: u64,
    /// HTTP timeout for metadata requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            catalog_path: PathBuf::from("aws_dataset.json"),
            known_partitions_path: PathBuf::from("filenames.txt"),
            template_path: None,
            target_epsg: 26915,
            pdal_program: "pdal".to_string(),
            rate_limit_every: 100,
            pause_seconds: 5,
            request_timeout_secs: 60,
        }
    }
}

impl RunnerConfig {
    /// Parse YAML text.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| RunnerError::Config {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a configuration file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    /// Load `path` if given, else `lidar.yaml` if present, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load_from(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Settings for a catalog build.
    pub fn consolidation_config(&self) -> ConsolidationConfig {
        ConsolidationConfig {
            base_url: self.base_url.clone(),
            rate_limit_every: self.rate_limit_every,
            pause: Duration::from_secs(self.pause_seconds),
        }
    }

    /// Settings for point extraction.
    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            base_url: self.base_url.clone(),
            target_epsg: Epsg(self.target_epsg),
        }
    }

    /// Metadata request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, "https://usgs-lidar-public.s3.us-west-2.amazonaws.com/");
        assert_eq!(config.target_epsg, 26915);
        assert_eq!(config.rate_limit_every, 100);
        assert_eq!(config.consolidation_config().pause, Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RunnerConfig::from_yaml_str(
            "target_epsg: 32615\ntemplate_path: templates/pipeline.json\nrate_limit_every: 0\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.target_epsg, 32615);
        assert_eq!(config.template_path, Some(PathBuf::from("templates/pipeline.json")));
        assert_eq!(config.consolidation_config().rate_limit_every, 0);
        assert_eq!(config.pdal_program, "pdal");
        assert_eq!(config.fetcher_settings().target_epsg, Epsg(32615));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(RunnerConfig::from_yaml_str("\n", "inline").unwrap(), RunnerConfig::default());
    }

    #[test]
    fn test_bad_yaml_names_the_file() {
        let err = RunnerConfig::from_yaml_str("target_epsg: [1, 2", "lidar.yaml").unwrap_err();
        assert!(matches!(err, RunnerError::Config { ref path, .. } if path == "lidar.yaml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lidar.yaml");
        fs::write(&path, "pdal_program: /opt/pdal/bin/pdal\npause_seconds: 1\n").unwrap();

        let config = RunnerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.pdal_program, "/opt/pdal/bin/pdal");
        assert_eq!(config.pause_seconds, 1);
    }
}
