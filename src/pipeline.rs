//! One end-to-end dashboard pass: load, filter, enrich, aggregate, present.
//!
//! Every stage takes its input by reference and returns a fresh value, so a
//! pass with the same source and selection always yields the same view.

use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::{GroupBy, SortOrder};
use crate::error::Result;
use crate::filter::{FilterCriteria, apply, require_non_empty};
use crate::kpi::{Kpi, KpiTable};
use crate::parser::{LoadedWaybills, parse_waybills};
use crate::presentation::{
    ChartSelection, DashboardView, PresentationConfig, chart_view, detail_rows, metric_tiles,
    ranking_chart,
};
use crate::record::RecordSet;
use crate::source::{InputSource, read_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingSelection {
    pub kpi: Kpi,
    pub order: SortOrder,
}

impl Default for RankingSelection {
    fn default() -> Self {
        Self {
            kpi: Kpi::FuelPerTon,
            order: SortOrder::Descending,
        }
    }
}

/// Filter and display choices for one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub criteria: FilterCriteria,
    pub chart: ChartSelection,
    pub ranking: RankingSelection,
}

/// Reads and parses the document. Dates and routes are derived here, once.
pub fn load(source: &InputSource) -> Result<LoadedWaybills> {
    let bytes = read_document(source)?;
    let loaded = parse_waybills(&bytes)?;
    info!(
        records = loaded.records.len(),
        undated = loaded.report.undated_records,
        negative_values = loaded.report.negative_values,
        "Waybills loaded"
    );
    Ok(loaded)
}

/// Filters the source and enriches the survivors with KPIs.
///
/// Fails with [`crate::DashboardError::EmptyResult`] when nothing matches.
pub fn filtered_kpis(source: &RecordSet, criteria: &FilterCriteria) -> Result<KpiTable> {
    let filtered = require_non_empty(apply(source, criteria))?;
    Ok(KpiTable::compute(&filtered))
}

#[tracing::instrument(skip_all, fields(source = source.len()))]
pub fn render_pass(
    source: &RecordSet,
    selection: &Selection,
    config: &PresentationConfig,
) -> Result<DashboardView> {
    let table = filtered_kpis(source, &selection.criteria)?;
    let RankingSelection { kpi, order } = selection.ranking;

    let view = DashboardView {
        records: table.len(),
        tiles: metric_tiles(&table.means()),
        details: detail_rows(&table),
        driver_ranking: ranking_chart(aggregate(&table, GroupBy::Driver), GroupBy::Driver, kpi, order),
        route_ranking: ranking_chart(aggregate(&table, GroupBy::Route), GroupBy::Route, kpi, order),
        chart: chart_view(&table, &selection.chart, config),
        raw: table.rows().iter().map(|r| r.record.clone()).collect(),
    };

    info!(records = view.records, "Dashboard rendered");
    Ok(view)
}
