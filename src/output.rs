//! Output formatting and export for dashboard views.
//!
//! Supports pretty-printing, JSON serialization, CSV export and markdown
//! tables for the terminal.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, info};

use crate::presentation::{
    ChartView, DashboardView, DetailRow, FilterOptions, MetricTile, RankingChart,
};
use crate::record::Waybill;

/// Shown in place of an undefined per-record value.
pub const UNDEFINED_CELL: &str = "—";
/// Shown on a summary tile whose KPI has no defined values.
pub const NO_DATA: &str = "нет данных";

/// Logs a view using Rust's debug pretty-print format.
pub fn print_pretty(view: &DashboardView) {
    debug!("{:#?}", view);
}

pub fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes rows to a CSV file, replacing any previous export at `path`.
///
/// The header row is written once, from the first record's field names.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV export");

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "CSV export written");
    Ok(())
}

pub fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED_CELL.to_string(), |v| format!("{v:.2}"))
}

fn format_tile(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}"))
}

fn markdown<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

#[derive(Tabled)]
struct TilePreview {
    #[tabled(rename = "Показатель")]
    label: &'static str,
    #[tabled(rename = "Среднее")]
    value: String,
    #[tabled(rename = "Записей")]
    defined: usize,
}

pub fn render_tiles(tiles: &[MetricTile]) -> String {
    markdown(tiles.iter().map(|t| TilePreview {
        label: t.label,
        value: format_tile(t.value),
        defined: t.defined,
    }))
}

#[derive(Tabled)]
struct DetailPreview {
    #[tabled(rename = "Документ")]
    reference: String,
    #[tabled(rename = "Водитель")]
    driver: String,
    #[tabled(rename = "Маршрут")]
    route: String,
    #[tabled(rename = "Топливо/т")]
    fuel_per_ton: String,
    #[tabled(rename = "Топливо/100 т·км")]
    fuel_per_100_ton_km: String,
    #[tabled(rename = "т/операция")]
    avg_tons_per_operation: String,
    #[tabled(rename = "т/ч")]
    throughput_tons_per_hour: String,
}

pub fn render_details(rows: &[DetailRow]) -> String {
    markdown(rows.iter().map(|r| DetailPreview {
        reference: r.reference.clone(),
        driver: r.driver.clone(),
        route: r.route.clone(),
        fuel_per_ton: format_value(r.fuel_per_ton),
        fuel_per_100_ton_km: format_value(r.fuel_per_100_ton_km),
        avg_tons_per_operation: format_value(r.avg_tons_per_operation),
        throughput_tons_per_hour: format_value(r.throughput_tons_per_hour),
    }))
}

#[derive(Tabled)]
struct RankingPreview {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Группа")]
    key: String,
    #[tabled(rename = "Значение")]
    value: String,
    #[tabled(rename = "Записей")]
    records: usize,
}

pub fn render_ranking(chart: &RankingChart) -> String {
    let title = format!("{}: {}", chart.by.category().label(), chart.kpi.label());
    let table = markdown(chart.bars.iter().enumerate().map(|(i, b)| RankingPreview {
        position: i + 1,
        key: b.key.clone(),
        value: format_value(b.value),
        records: b.records,
    }));
    format!("{title}\n{table}")
}

#[derive(Tabled)]
struct RawPreview {
    #[tabled(rename = "Документ")]
    reference: String,
    #[tabled(rename = "Вид работ")]
    work_type: String,
    #[tabled(rename = "Водитель")]
    driver: String,
    #[tabled(rename = "Оборудование")]
    equipment: String,
    #[tabled(rename = "Дата")]
    date: String,
    #[tabled(rename = "Топливо")]
    fuel_consumed: String,
    #[tabled(rename = "Грузооборот")]
    cargo_turnover: String,
    #[tabled(rename = "Операций")]
    operation_count_total: String,
    #[tabled(rename = "Тонн")]
    nomenclature_count_total: String,
    #[tabled(rename = "Часов")]
    equipment_duration: String,
}

pub fn render_raw(records: &[Waybill]) -> String {
    markdown(records.iter().map(|r| RawPreview {
        reference: r.reference.clone(),
        work_type: r.work_type.clone(),
        driver: r.driver.clone(),
        equipment: r.equipment.clone(),
        date: r
            .document_datetime
            .map_or_else(|| UNDEFINED_CELL.to_string(), |d| d.to_string()),
        fuel_consumed: format_value(r.fuel_consumed),
        cargo_turnover: format_value(r.cargo_turnover),
        operation_count_total: format_value(r.operation_count_total),
        nomenclature_count_total: format_value(r.nomenclature_count_total),
        equipment_duration: format_value(r.equipment_duration),
    }))
}

pub fn render_options(options: &FilterOptions) -> String {
    let list = |values: &[String]| {
        if values.is_empty() {
            UNDEFINED_CELL.to_string()
        } else {
            values.join(", ")
        }
    };
    let dates = options.date_bounds.map_or_else(
        || UNDEFINED_CELL.to_string(),
        |b| format!("{} … {}", b.start, b.end),
    );

    format!(
        "Документ: {}\nВид работ: {}\nВодитель: {}\nОборудование: {}\nПериод: {}",
        list(&options.references),
        list(&options.work_types),
        list(&options.drivers),
        list(&options.equipment),
        dates
    )
}

#[derive(Tabled)]
struct PointPreview {
    #[tabled(rename = "Серия")]
    series: String,
    x: String,
    y: String,
}

pub fn render_chart(chart: &ChartView) -> String {
    match chart {
        ChartView::Scatter { x, y, points, .. } => {
            let title = format!("{} × {}", x.label(), y.label());
            let table = markdown(points.iter().map(|p| PointPreview {
                series: p.color.clone().unwrap_or_else(|| UNDEFINED_CELL.to_string()),
                x: format!("{:.2}", p.x),
                y: format!("{:.2}", p.y),
            }));
            format!("{title}\n{table}")
        }
        ChartView::TimeSeries { y, series, .. } => {
            let title = format!("{} по времени", y.label());
            let table = markdown(series.iter().flat_map(|s| {
                s.points.iter().map(|p| PointPreview {
                    series: s.name.clone(),
                    x: p.at.to_string(),
                    y: format!("{:.2}", p.y),
                })
            }));
            format!("{title}\n{table}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::Kpi;
    use std::fs;

    fn tile(value: Option<f64>) -> MetricTile {
        MetricTile {
            kpi: Kpi::FuelPerTon,
            label: Kpi::FuelPerTon.label(),
            value,
            defined: usize::from(value.is_some()),
        }
    }

    fn detail(fuel_per_ton: Option<f64>) -> DetailRow {
        DetailRow {
            reference: "Путевой лист №1".to_string(),
            document_datetime: None,
            driver: "Иванов".to_string(),
            equipment: "КАМАЗ".to_string(),
            route: "Карьер → Склад".to_string(),
            fuel_per_ton,
            fuel_per_100_ton_km: Some(1.0),
            avg_tons_per_operation: None,
            throughput_tons_per_hour: Some(12.345),
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(2.5)), "2.50");
        assert_eq!(format_value(None), "—");
    }

    #[test]
    fn test_undefined_tile_shows_no_data() {
        let rendered = render_tiles(&[tile(None), tile(Some(3.0))]);
        assert!(rendered.contains("нет данных"));
        assert!(rendered.contains("3.00"));
        assert!(!rendered.contains("NaN"));
    }

    #[test]
    fn test_details_render_dash_for_undefined() {
        let rendered = render_details(&[detail(None)]);
        assert!(rendered.contains("—"));
        assert!(rendered.contains("12.35"));
    }

    #[test]
    fn test_json_keeps_undefined_as_null() {
        let json = to_json(&detail(None)).unwrap();
        assert!(json.contains("\"fuel_per_ton\": null"));
    }

    #[test]
    fn test_write_csv_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.csv");

        write_csv(&path, &[detail(Some(2.0)), detail(None)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("reference,"));
        assert_eq!(
            content.lines().filter(|l| l.contains("fuel_per_ton")).count(),
            1
        );
    }

    #[test]
    fn test_write_csv_replaces_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.csv");

        write_csv(&path, &[detail(Some(2.0)), detail(None)]).unwrap();
        write_csv(&path, &[detail(Some(2.0))]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
