//! Grouping of KPI-enriched waybills and ranking of the groups.
//!
//! Records are grouped by driver or by route, each group reports the mean of
//! every KPI over the records where that KPI is defined, and groups can be
//! ranked by any single KPI.

pub mod aggregate;
pub mod types;
pub mod utility;
