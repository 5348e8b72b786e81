//! Dashboard settings file.
//!
//! Stored as a JSON object, every key optional:
//! ```json
//! {
//!   "input": "exports/waybills_2024_01.json",
//!   "presentation": {
//!     "highlight_fields": ["cargo_turnover", "equipment_duration"],
//!     "color_by": "work_type",
//!     "hover_fields": ["reference", "driver"]
//!   },
//!   "ranking_kpi": "fuel_per_ton",
//!   "ranking_order": "descending"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::analyzers::types::SortOrder;
use crate::error::{DashboardError, Result};
use crate::kpi::Kpi;
use crate::presentation::PresentationConfig;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "WAYBILL_DASHBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Document to load when no `--input` is passed.
    pub input: Option<PathBuf>,
    pub presentation: PresentationConfig,
    pub ranking_kpi: Kpi,
    pub ranking_order: SortOrder,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            input: None,
            presentation: PresentationConfig::default(),
            ranking_kpi: Kpi::FuelPerTon,
            ranking_order: SortOrder::Descending,
        }
    }
}

impl DashboardConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DashboardError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Explicit path first, then [`CONFIG_ENV`], then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }
}
