//! Waybill records and the immutable record set they are loaded into.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Original field labels as they appear in the exported document.
pub mod fields {
    pub const REFERENCE: &str = "Ссылка";
    pub const WORK_TYPE: &str = "ТехнологическиеОперацииВидРабот";
    pub const DRIVER: &str = "Водитель";
    pub const EQUIPMENT: &str = "Оборудование";
    pub const WORK_SITE: &str = "ТехнологическиеОперацииУчастокРабот";
    pub const UNLOAD_SITE: &str = "ТехнологическиеОперацииУчастокРазгрузки";
    pub const FUEL_CONSUMED: &str = "РасходТоплива";
    pub const CARGO_TURNOVER: &str = "ТехнологическиеОперацииГрузооборот";
    pub const OPERATION_COUNT_TOTAL: &str = "ТехнологическиеОперацииКоличествоОперацийВсего";
    pub const NOMENCLATURE_COUNT_TOTAL: &str = "ТехнологическиеОперацииКоличествоНоменклатурыВсего";
    pub const EQUIPMENT_DURATION: &str = "ПоказателиОборудованияПоУчасткамПродолжительность";
}

/// Separator between work site and unload site in a route key.
pub const ROUTE_SEPARATOR: &str = " → ";

/// One trip-sheet entry.
///
/// Numeric fields are `None` when the document holds `null` for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waybill {
    pub reference: String,
    pub work_type: String,
    pub driver: String,
    pub equipment: String,
    pub work_site: String,
    pub unload_site: String,
    pub fuel_consumed: Option<f64>,
    pub cargo_turnover: Option<f64>,
    pub operation_count_total: Option<f64>,
    pub nomenclature_count_total: Option<f64>,
    pub equipment_duration: Option<f64>,
    pub document_datetime: Option<NaiveDateTime>,
}

impl Waybill {
    pub fn route(&self) -> String {
        format!("{}{}{}", self.work_site, ROUTE_SEPARATOR, self.unload_site)
    }

    /// Value of a categorical dimension. Routes are built on demand.
    pub fn category(&self, category: Category) -> std::borrow::Cow<'_, str> {
        match category {
            Category::Reference => self.reference.as_str().into(),
            Category::WorkType => self.work_type.as_str().into(),
            Category::Driver => self.driver.as_str().into(),
            Category::Equipment => self.equipment.as_str().into(),
            Category::Route => self.route().into(),
        }
    }

    pub fn document_date(&self) -> Option<NaiveDate> {
        self.document_datetime.map(|dt| dt.date())
    }
}

/// Categorical dimensions a record can be filtered, grouped or coloured by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Reference,
    WorkType,
    Driver,
    Equipment,
    Route,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Reference => "Документ",
            Category::WorkType => "Вид работ",
            Category::Driver => "Водитель",
            Category::Equipment => "Оборудование",
            Category::Route => "Маршрут",
        }
    }
}

/// Ordered, immutable sequence of waybills.
///
/// Order is the order of the source document. Filtering produces a new set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Arc<[Waybill]>,
}

impl RecordSet {
    pub fn new(records: Vec<Waybill>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waybill> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Waybill] {
        &self.records
    }

    /// Earliest and latest document dates, ignoring undated records.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(Waybill::document_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Distinct values of a dimension in order of first occurrence.
    pub fn distinct(&self, category: Category) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for record in self.records.iter() {
            let value = record.category(category);
            if seen.insert(value.to_string()) {
                values.push(value.into_owned());
            }
        }
        values
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Waybill;
    type IntoIter = std::slice::Iter<'a, Waybill>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
