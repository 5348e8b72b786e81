//! Per-record efficiency KPIs and set-level means.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzers::utility::mean;
use crate::record::{RecordSet, Waybill};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    FuelPerTon,
    #[serde(rename = "fuel_per_100_ton_km")]
    #[value(name = "fuel-per-100-ton-km")]
    FuelPer100TonKm,
    AvgTonsPerOperation,
    ThroughputTonsPerHour,
}

impl Kpi {
    pub const ALL: [Kpi; 4] = [
        Kpi::FuelPerTon,
        Kpi::FuelPer100TonKm,
        Kpi::AvgTonsPerOperation,
        Kpi::ThroughputTonsPerHour,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kpi::FuelPerTon => "Расход топлива на тонну",
            Kpi::FuelPer100TonKm => "Расход на 100 т·км",
            Kpi::AvgTonsPerOperation => "Средний тоннаж за операцию",
            Kpi::ThroughputTonsPerHour => "Производительность, т/ч",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// `numerator / denominator`, or `None` when either side is missing,
/// the denominator is zero, or the result is not finite.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    Some(n / d).filter(|v| v.is_finite())
}

/// The four KPIs of one record. `None` marks an undefined value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiValues {
    pub fuel_per_ton: Option<f64>,
    pub fuel_per_100_ton_km: Option<f64>,
    pub avg_tons_per_operation: Option<f64>,
    pub throughput_tons_per_hour: Option<f64>,
}

impl KpiValues {
    pub fn compute(record: &Waybill) -> Self {
        Self {
            fuel_per_ton: ratio(record.fuel_consumed, record.nomenclature_count_total),
            fuel_per_100_ton_km: ratio(record.fuel_consumed, record.cargo_turnover.map(|t| t / 100.0)),
            avg_tons_per_operation: ratio(record.nomenclature_count_total, record.operation_count_total),
            throughput_tons_per_hour: ratio(record.nomenclature_count_total, record.equipment_duration),
        }
    }

    pub fn get(&self, kpi: Kpi) -> Option<f64> {
        match kpi {
            Kpi::FuelPerTon => self.fuel_per_ton,
            Kpi::FuelPer100TonKm => self.fuel_per_100_ton_km,
            Kpi::AvgTonsPerOperation => self.avg_tons_per_operation,
            Kpi::ThroughputTonsPerHour => self.throughput_tons_per_hour,
        }
    }
}

/// Mean of one KPI over the records where it is defined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiMean {
    pub value: Option<f64>,
    pub defined: usize,
}

/// Means of all four KPIs, in [`Kpi::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    means: [KpiMean; 4],
}

impl KpiSummary {
    /// Averages each KPI over its defined values only.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a KpiValues>) -> Self {
        let mut series: [Vec<f64>; 4] = Default::default();
        for v in values {
            for kpi in Kpi::ALL {
                if let Some(x) = v.get(kpi) {
                    series[kpi.index()].push(x);
                }
            }
        }

        let mut summary = KpiSummary::default();
        for kpi in Kpi::ALL {
            let s = &series[kpi.index()];
            summary.means[kpi.index()] = KpiMean {
                value: mean(s),
                defined: s.len(),
            };
        }
        summary
    }

    pub fn get(&self, kpi: Kpi) -> KpiMean {
        self.means[kpi.index()]
    }

    pub fn value(&self, kpi: Kpi) -> Option<f64> {
        self.get(kpi).value
    }
}

/// A filtered record paired with its KPIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRecord {
    pub record: Waybill,
    pub kpis: KpiValues,
}

/// The filtered record set enriched with per-record KPIs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTable {
    rows: Vec<KpiRecord>,
}

impl KpiTable {
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn compute(records: &RecordSet) -> Self {
        let rows: Vec<KpiRecord> = records
            .iter()
            .map(|record| KpiRecord {
                kpis: KpiValues::compute(record),
                record: record.clone(),
            })
            .collect();

        debug!(rows = rows.len(), "KPIs computed");
        Self { rows }
    }

    pub fn rows(&self) -> &[KpiRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn means(&self) -> KpiSummary {
        KpiSummary::from_values(self.rows.iter().map(|r| &r.kpis))
    }
}
