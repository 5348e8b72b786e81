//! Narrowing a record set to the analyst's current selection.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::record::{RecordSet, Waybill};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidSelection(format!(
                "date range starts after it ends ({start} > {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Active constraints. An empty set leaves its field unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub references: BTreeSet<String>,
    pub work_types: BTreeSet<String>,
    pub drivers: BTreeSet<String>,
    pub equipment: BTreeSet<String>,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    pub fn is_unconstrained(&self) -> bool {
        self.references.is_empty()
            && self.work_types.is_empty()
            && self.drivers.is_empty()
            && self.equipment.is_empty()
            && self.date_range.is_none()
    }

    pub fn matches(&self, record: &Waybill) -> bool {
        allowed(&self.references, &record.reference)
            && allowed(&self.work_types, &record.work_type)
            && allowed(&self.drivers, &record.driver)
            && allowed(&self.equipment, &record.equipment)
            && self.date_range.is_none_or(|range| {
                record
                    .document_date()
                    .is_some_and(|date| range.contains(date))
            })
    }
}

fn allowed(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

/// Keeps the records matching every criterion, in their original order.
#[tracing::instrument(skip_all, fields(input = records.len()))]
pub fn apply(records: &RecordSet, criteria: &FilterCriteria) -> RecordSet {
    if criteria.is_unconstrained() {
        return records.clone();
    }

    let kept: Vec<Waybill> = records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();

    debug!(kept = kept.len(), "Filters applied");
    RecordSet::new(kept)
}

/// Surfaces an empty selection as [`DashboardError::EmptyResult`].
pub fn require_non_empty(records: RecordSet) -> Result<RecordSet> {
    if records.is_empty() {
        Err(DashboardError::EmptyResult)
    } else {
        Ok(records)
    }
}
