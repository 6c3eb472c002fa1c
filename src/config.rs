use crate::error::ConfigError;
use crate::filter::ProjectFilter;
use crate::taxonomy::{OPERATIONAL_ENERGY, TOTAL_EMBODIED_CARBON};
use crate::transform::{AreaLookup, DEFAULT_GIA_M2};
use crate::types::{Project, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming a JSON config file for the CLI.
pub const CONFIG_ENV: &str = "KPI_DASHBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    pub output_dir: PathBuf,
    pub primary_kpi: String,
    pub secondary_kpi: String,
    pub value_type: ValueType,
    pub scheme: String,
    pub benchmarks_enabled: bool,
    pub filter: ProjectFilter,
    pub default_area: f64,
    /// Normalised project id → GIA, for projects whose own GIA is missing.
    pub fallback_areas: BTreeMap<String, f64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/sample_projects.csv"),
            output_dir: PathBuf::from("reports"),
            primary_kpi: TOTAL_EMBODIED_CARBON.to_string(),
            secondary_kpi: OPERATIONAL_ENERGY.to_string(),
            value_type: ValueType::PerArea,
            scheme: "BREEAM".to_string(),
            benchmarks_enabled: true,
            filter: ProjectFilter::default(),
            default_area: DEFAULT_GIA_M2,
            fallback_areas: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config. No path, or a path that does not exist, yields the
    /// defaults; an unreadable or malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            info!(path = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load from the file named by [`CONFIG_ENV`], if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    pub fn area_lookup(&self, projects: &[Project]) -> AreaLookup {
        AreaLookup::from_projects(projects)
            .with_fallbacks(&self.fallback_areas)
            .with_default_area(self.default_area)
    }
}
