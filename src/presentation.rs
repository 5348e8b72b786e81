//! Chart and table view models built from the filtered, KPI-enriched set.
//!
//! Nothing here draws. Every function maps pipeline output into serializable
//! structures a renderer (terminal tables, JSON consumers) can display
//! directly.

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::analyzers::aggregate::rank;
use crate::analyzers::types::{GroupBy, GroupSummary, SortOrder};
use crate::kpi::{Kpi, KpiRecord, KpiSummary, KpiTable};
use crate::record::{Category, RecordSet, Waybill, fields};

/// Numeric values that can be placed on a chart axis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    FuelConsumed,
    CargoTurnover,
    OperationCountTotal,
    NomenclatureCountTotal,
    EquipmentDuration,
    FuelPerTon,
    #[serde(rename = "fuel_per_100_ton_km")]
    #[value(name = "fuel-per-100-ton-km")]
    FuelPer100TonKm,
    AvgTonsPerOperation,
    ThroughputTonsPerHour,
}

impl NumericField {
    pub fn label(self) -> &'static str {
        match self {
            NumericField::FuelConsumed => fields::FUEL_CONSUMED,
            NumericField::CargoTurnover => fields::CARGO_TURNOVER,
            NumericField::OperationCountTotal => fields::OPERATION_COUNT_TOTAL,
            NumericField::NomenclatureCountTotal => fields::NOMENCLATURE_COUNT_TOTAL,
            NumericField::EquipmentDuration => fields::EQUIPMENT_DURATION,
            other => other.kpi().map_or("", Kpi::label),
        }
    }

    pub fn kpi(self) -> Option<Kpi> {
        match self {
            NumericField::FuelPerTon => Some(Kpi::FuelPerTon),
            NumericField::FuelPer100TonKm => Some(Kpi::FuelPer100TonKm),
            NumericField::AvgTonsPerOperation => Some(Kpi::AvgTonsPerOperation),
            NumericField::ThroughputTonsPerHour => Some(Kpi::ThroughputTonsPerHour),
            _ => None,
        }
    }

    pub fn value(self, row: &KpiRecord) -> Option<f64> {
        let r = &row.record;
        match self {
            NumericField::FuelConsumed => r.fuel_consumed,
            NumericField::CargoTurnover => r.cargo_turnover,
            NumericField::OperationCountTotal => r.operation_count_total,
            NumericField::NomenclatureCountTotal => r.nomenclature_count_total,
            NumericField::EquipmentDuration => r.equipment_duration,
            kpi => kpi.kpi().and_then(|k| row.kpis.get(k)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Scatter,
    TimeSeries,
}

/// Renderer settings that are not part of the filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Y-axis fields that switch a scatter chart to category colouring.
    pub highlight_fields: BTreeSet<NumericField>,
    pub color_by: Category,
    pub hover_fields: Vec<Category>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            highlight_fields: BTreeSet::from([
                NumericField::CargoTurnover,
                NumericField::OperationCountTotal,
                NumericField::NomenclatureCountTotal,
                NumericField::EquipmentDuration,
            ]),
            color_by: Category::WorkType,
            hover_fields: vec![Category::Reference, Category::Equipment, Category::Driver],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartSelection {
    pub kind: ChartKind,
    pub x: NumericField,
    pub y: NumericField,
}

impl Default for ChartSelection {
    fn default() -> Self {
        Self {
            kind: ChartKind::Scatter,
            x: NumericField::FuelConsumed,
            y: NumericField::NomenclatureCountTotal,
        }
    }
}

/// One summary tile. `value` is `None` when no record had the KPI defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTile {
    pub kpi: Kpi,
    pub label: &'static str,
    pub value: Option<f64>,
    pub defined: usize,
}

pub fn metric_tiles(summary: &KpiSummary) -> Vec<MetricTile> {
    Kpi::ALL
        .into_iter()
        .map(|kpi| {
            let mean = summary.get(kpi);
            MetricTile {
                kpi,
                label: kpi.label(),
                value: mean.value,
                defined: mean.defined,
            }
        })
        .collect()
}

/// Flat per-record row for the detail table and its CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub reference: String,
    pub document_datetime: Option<NaiveDateTime>,
    pub driver: String,
    pub equipment: String,
    pub route: String,
    pub fuel_per_ton: Option<f64>,
    pub fuel_per_100_ton_km: Option<f64>,
    pub avg_tons_per_operation: Option<f64>,
    pub throughput_tons_per_hour: Option<f64>,
}

pub fn detail_rows(table: &KpiTable) -> Vec<DetailRow> {
    table
        .rows()
        .iter()
        .map(|row| DetailRow {
            reference: row.record.reference.clone(),
            document_datetime: row.record.document_datetime,
            driver: row.record.driver.clone(),
            equipment: row.record.equipment.clone(),
            route: row.record.route(),
            fuel_per_ton: row.kpis.fuel_per_ton,
            fuel_per_100_ton_km: row.kpis.fuel_per_100_ton_km,
            avg_tons_per_operation: row.kpis.avg_tons_per_operation,
            throughput_tons_per_hour: row.kpis.throughput_tons_per_hour,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingBar {
    pub key: String,
    pub value: Option<f64>,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingChart {
    pub by: GroupBy,
    pub kpi: Kpi,
    pub order: SortOrder,
    pub bars: Vec<RankingBar>,
}

pub fn ranking_chart(groups: Vec<GroupSummary>, by: GroupBy, kpi: Kpi, order: SortOrder) -> RankingChart {
    let bars = rank(groups, kpi, order)
        .into_iter()
        .map(|g| RankingBar {
            value: g.mean(kpi),
            records: g.records(),
            key: g.key,
        })
        .collect();

    RankingChart { by, kpi, order, bars }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub color: Option<String>,
    pub hover: Vec<HoverField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub at: NaiveDateTime,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub name: String,
    pub points: Vec<TimePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartView {
    Scatter {
        x: NumericField,
        y: NumericField,
        color_by: Option<Category>,
        points: Vec<ScatterPoint>,
    },
    TimeSeries {
        y: NumericField,
        color_by: Category,
        series: Vec<TimeSeries>,
    },
}

/// Builds the configurable chart. Records without a value for an axis are
/// left out, as are undated records on a time series.
pub fn chart_view(table: &KpiTable, selection: &ChartSelection, config: &PresentationConfig) -> ChartView {
    match selection.kind {
        ChartKind::Scatter => scatter(table, selection, config),
        ChartKind::TimeSeries => time_series(table, selection.y, config.color_by),
    }
}

fn scatter(table: &KpiTable, selection: &ChartSelection, config: &PresentationConfig) -> ChartView {
    let color_by = config
        .highlight_fields
        .contains(&selection.y)
        .then_some(config.color_by);

    let points = table
        .rows()
        .iter()
        .filter_map(|row| {
            Some(ScatterPoint {
                x: selection.x.value(row)?,
                y: selection.y.value(row)?,
                color: color_by.map(|c| row.record.category(c).into_owned()),
                hover: hover(&row.record, &config.hover_fields),
            })
        })
        .collect();

    ChartView::Scatter {
        x: selection.x,
        y: selection.y,
        color_by,
        points,
    }
}

fn time_series(table: &KpiTable, y: NumericField, color_by: Category) -> ChartView {
    let mut names: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, Vec<TimePoint>> = HashMap::new();

    for row in table.rows() {
        let (Some(at), Some(value)) = (row.record.document_datetime, y.value(row)) else {
            continue;
        };
        let name = row.record.category(color_by).into_owned();
        by_name
            .entry(name.clone())
            .or_insert_with(|| {
                names.push(name);
                Vec::new()
            })
            .push(TimePoint { at, y: value });
    }

    let series = names
        .into_iter()
        .map(|name| {
            let mut points = by_name.remove(&name).unwrap_or_default();
            points.sort_by_key(|p| p.at);
            TimeSeries { name, points }
        })
        .collect();

    ChartView::TimeSeries { y, color_by, series }
}

fn hover(record: &Waybill, fields: &[Category]) -> Vec<HoverField> {
    fields
        .iter()
        .map(|&c| HoverField {
            label: c.label(),
            value: record.category(c).into_owned(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Values offered by the filter controls, drawn from the loaded set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub references: Vec<String>,
    pub work_types: Vec<String>,
    pub drivers: Vec<String>,
    pub equipment: Vec<String>,
    pub date_bounds: Option<DateBounds>,
}

pub fn filter_options(records: &RecordSet) -> FilterOptions {
    FilterOptions {
        references: records.distinct(Category::Reference),
        work_types: records.distinct(Category::WorkType),
        drivers: records.distinct(Category::Driver),
        equipment: records.distinct(Category::Equipment),
        date_bounds: records
            .date_bounds()
            .map(|(start, end)| DateBounds { start, end }),
    }
}

/// Everything a single render pass hands to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub records: usize,
    pub tiles: Vec<MetricTile>,
    pub details: Vec<DetailRow>,
    pub driver_ranking: RankingChart,
    pub route_ranking: RankingChart,
    pub chart: ChartView,
    pub raw: Vec<Waybill>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::{dated, waybill};

    fn table() -> KpiTable {
        let mut a = dated(waybill("Иванов"), 2024, 1, 20);
        a.work_type = "Погрузка".into();
        a.fuel_consumed = Some(30.0);

        let mut b = dated(waybill("Петров"), 2024, 1, 10);
        b.nomenclature_count_total = Some(0.0);

        let mut c = dated(waybill("Сидоров"), 2024, 1, 5);
        c.work_type = "Погрузка".into();
        c.fuel_consumed = Some(20.0);

        let mut undated = waybill("Иванов");
        undated.document_datetime = None;

        KpiTable::compute(&RecordSet::new(vec![a, b, c, undated]))
    }

    #[test]
    fn test_tiles_follow_kpi_order() {
        let tiles = metric_tiles(&table().means());
        let kpis: Vec<_> = tiles.iter().map(|t| t.kpi).collect();
        assert_eq!(kpis, Kpi::ALL.to_vec());
        // (6 + 4 + 2) / 3, the zero-tonnage record is excluded
        assert_eq!(tiles[0].value, Some(4.0));
        assert_eq!(tiles[0].defined, 3);
    }

    #[test]
    fn test_detail_rows_keep_undefined_values() {
        let rows = detail_rows(&table());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].fuel_per_ton, None);
        assert_eq!(rows[1].route, "Карьер → Склад");
    }

    #[test]
    fn test_scatter_colours_highlighted_field() {
        let selection = ChartSelection {
            kind: ChartKind::Scatter,
            x: NumericField::FuelConsumed,
            y: NumericField::CargoTurnover,
        };
        let ChartView::Scatter { color_by, points, .. } =
            chart_view(&table(), &selection, &PresentationConfig::default())
        else {
            panic!("expected scatter");
        };

        assert_eq!(color_by, Some(Category::WorkType));
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].color.as_deref(), Some("Погрузка"));
        assert_eq!(points[0].hover.len(), 3);
        assert_eq!(points[0].hover[2].value, "Иванов");
    }

    #[test]
    fn test_scatter_without_highlight_has_no_colour_and_skips_undefined() {
        let selection = ChartSelection {
            kind: ChartKind::Scatter,
            x: NumericField::FuelConsumed,
            y: NumericField::FuelPerTon,
        };
        let ChartView::Scatter { color_by, points, .. } =
            chart_view(&table(), &selection, &PresentationConfig::default())
        else {
            panic!("expected scatter");
        };

        assert_eq!(color_by, None);
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.color.is_none()));
    }

    #[test]
    fn test_time_series_grouped_and_sorted() {
        let selection = ChartSelection {
            kind: ChartKind::TimeSeries,
            x: NumericField::FuelConsumed,
            y: NumericField::FuelConsumed,
        };
        let ChartView::TimeSeries { series, .. } =
            chart_view(&table(), &selection, &PresentationConfig::default())
        else {
            panic!("expected time series");
        };

        let names: Vec<_> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Погрузка", "Перевозка"]);

        let loading: Vec<_> = series[0].points.iter().map(|p| p.y).collect();
        assert_eq!(loading, vec![20.0, 30.0]);
        // undated record is not plotted
        assert_eq!(series[1].points.len(), 1);
    }

    #[test]
    fn test_ranking_chart_bars() {
        let groups = crate::analyzers::aggregate::aggregate(&table(), GroupBy::Driver);
        let chart = ranking_chart(groups, GroupBy::Driver, Kpi::FuelPerTon, SortOrder::Descending);

        let keys: Vec<_> = chart.bars.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Иванов", "Сидоров", "Петров"]);
        assert_eq!(chart.bars[0].records, 2);
        assert_eq!(chart.bars[2].value, None);
    }

    #[test]
    fn test_filter_options_from_loaded_set() {
        let table = table();
        let records = RecordSet::new(table.rows().iter().map(|r| r.record.clone()).collect());
        let options = filter_options(&records);

        assert_eq!(options.drivers, vec!["Иванов", "Петров", "Сидоров"]);
        assert_eq!(options.work_types, vec!["Погрузка", "Перевозка"]);
        assert_eq!(
            options.date_bounds,
            Some(DateBounds {
                start: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            })
        );
    }

    #[test]
    fn test_kpi_fields_read_kpi_values() {
        let table = table();
        let row = &table.rows()[0];
        assert_eq!(NumericField::FuelPerTon.value(row), Some(6.0));
        assert_eq!(NumericField::FuelConsumed.value(row), Some(30.0));
        assert_eq!(NumericField::FuelPerTon.label(), Kpi::FuelPerTon.label());
    }
}
