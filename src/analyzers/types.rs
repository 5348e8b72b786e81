//! Data types used by the aggregation pipeline.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::kpi::{Kpi, KpiSummary};
use crate::record::Category;

/// Dimension a KPI table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Driver,
    Route,
}

impl GroupBy {
    pub fn category(self) -> Category {
        match self {
            GroupBy::Driver => Category::Driver,
            GroupBy::Route => Category::Route,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// KPI means for every record sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub(crate) key: String,
    pub(crate) records: usize,
    pub(crate) means: KpiSummary,
}

impl GroupSummary {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn means(&self) -> &KpiSummary {
        &self.means
    }

    pub fn mean(&self, kpi: Kpi) -> Option<f64> {
        self.means.value(kpi)
    }
}
