use crate::analyzers::types::{GroupBy, GroupSummary, SortOrder};
use crate::kpi::{Kpi, KpiSummary, KpiTable, KpiValues};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Groups a [`KpiTable`] by driver or route into [`GroupSummary`] rows.
///
/// Groups come out in order of first occurrence. Each KPI mean covers only
/// the records of the group where that KPI is defined, so one group can have
/// some KPIs defined and others not.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn aggregate(table: &KpiTable, by: GroupBy) -> Vec<GroupSummary> {
    let category = by.category();

    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<&KpiValues>> = HashMap::new();

    for row in table.rows() {
        let key = row.record.category(category).into_owned();
        match members.get_mut(&key) {
            Some(values) => values.push(&row.kpis),
            None => {
                members.insert(key.clone(), vec![&row.kpis]);
                order.push(key);
            }
        }
    }

    let groups: Vec<GroupSummary> = order
        .into_iter()
        .map(|key| {
            let values = members.remove(&key).unwrap_or_default();
            GroupSummary {
                records: values.len(),
                means: KpiSummary::from_values(values),
                key,
            }
        })
        .collect();

    debug!(groups = groups.len(), "Groups aggregated");
    groups
}

/// Orders groups by one KPI mean.
///
/// The sort is stable, so equal means keep their prior relative order.
/// Groups with an undefined mean go last in either direction.
pub fn rank(mut groups: Vec<GroupSummary>, kpi: Kpi, order: SortOrder) -> Vec<GroupSummary> {
    groups.sort_by(|a, b| match (a.mean(kpi), b.mean(kpi)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSet;
    use crate::record::test_support::waybill;

    fn record(driver: &str, fuel: f64, tons: f64) -> crate::record::Waybill {
        let mut r = waybill(driver);
        r.fuel_consumed = Some(fuel);
        r.nomenclature_count_total = Some(tons);
        r
    }

    fn keys(groups: &[GroupSummary]) -> Vec<&str> {
        groups.iter().map(|g| g.key()).collect()
    }

    #[test]
    fn test_group_by_driver_scenario() {
        // fuel_per_ton = [2.0, 4.0, undefined]
        let records = RecordSet::new(vec![
            record("A", 2.0, 1.0),
            record("A", 8.0, 2.0),
            record("B", 5.0, 0.0),
        ]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Driver);

        assert_eq!(keys(&groups), vec!["A", "B"]);
        assert_eq!(groups[0].mean(Kpi::FuelPerTon), Some(3.0));
        assert_eq!(groups[0].records(), 2);
        assert_eq!(groups[1].mean(Kpi::FuelPerTon), None);
        assert_eq!(groups[1].records(), 1);
    }

    #[test]
    fn test_undefined_kpi_does_not_undefine_group() {
        let records = RecordSet::new(vec![record("B", 5.0, 0.0)]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Driver);

        // zero tonnage only removes the fuel-per-ton denominator
        assert_eq!(groups[0].mean(Kpi::FuelPerTon), None);
        assert_eq!(groups[0].mean(Kpi::FuelPer100TonKm), Some(5.0));
        assert_eq!(groups[0].mean(Kpi::AvgTonsPerOperation), Some(0.0));
    }

    #[test]
    fn test_group_mean_of_large_values_stays_finite() {
        let records = RecordSet::new(vec![record("A", 1e308, 1.0), record("A", 1e308, 1.0)]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Driver);

        assert_eq!(groups[0].mean(Kpi::FuelPerTon), Some(1e308));
        assert!(
            Kpi::ALL
                .iter()
                .filter_map(|&kpi| groups[0].mean(kpi))
                .all(f64::is_finite)
        );
    }

    #[test]
    fn test_group_by_route_first_occurrence_order() {
        let mut a = waybill("x");
        a.work_site = "Карьер".into();
        a.unload_site = "Склад".into();
        let mut b = waybill("y");
        b.work_site = "Склад".into();
        b.unload_site = "Стройка".into();

        let records = RecordSet::new(vec![b.clone(), a, b]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Route);

        assert_eq!(keys(&groups), vec!["Склад → Стройка", "Карьер → Склад"]);
        assert_eq!(groups[0].records(), 2);
    }

    #[test]
    fn test_aggregate_empty_table() {
        assert!(aggregate(&KpiTable::default(), GroupBy::Driver).is_empty());
    }

    #[test]
    fn test_rank_descending_and_ascending() {
        let records = RecordSet::new(vec![
            record("low", 1.0, 1.0),
            record("none", 1.0, 0.0),
            record("high", 9.0, 1.0),
            record("mid", 5.0, 1.0),
        ]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Driver);

        let desc = rank(groups.clone(), Kpi::FuelPerTon, SortOrder::Descending);
        assert_eq!(keys(&desc), vec!["high", "mid", "low", "none"]);

        let asc = rank(groups, Kpi::FuelPerTon, SortOrder::Ascending);
        assert_eq!(keys(&asc), vec!["low", "mid", "high", "none"]);
    }

    #[test]
    fn test_rank_ties_keep_prior_order() {
        let records = RecordSet::new(vec![
            record("first", 2.0, 1.0),
            record("top", 3.0, 1.0),
            record("second", 4.0, 2.0),
        ]);
        let groups = aggregate(&KpiTable::compute(&records), GroupBy::Driver);

        let desc = rank(groups.clone(), Kpi::FuelPerTon, SortOrder::Descending);
        assert_eq!(keys(&desc), vec!["top", "first", "second"]);

        let asc = rank(groups, Kpi::FuelPerTon, SortOrder::Ascending);
        assert_eq!(keys(&asc), vec!["first", "second", "top"]);
    }
}
