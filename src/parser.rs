//! JSON loader for waybill exports.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::dates::extract_document_datetime;
use crate::error::{DashboardError, Result, SchemaError};
use crate::record::{RecordSet, Waybill, fields};

/// What happened while loading a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_records: usize,
    /// Records whose reference carries no parseable timestamp.
    pub undated_records: usize,
    /// Negative numeric inputs. Kept as-is, only counted.
    pub negative_values: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedWaybills {
    pub records: RecordSet,
    pub report: LoadReport,
}

/// Decodes a JSON array of flat objects into a [`RecordSet`].
///
/// # Errors
///
/// [`DashboardError::Format`] if the bytes are not a JSON array of objects,
/// [`DashboardError::Schema`] if a record lacks a field or holds the wrong type.
#[tracing::instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_waybills(bytes: &[u8]) -> Result<LoadedWaybills> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| DashboardError::Format(e.to_string()))?;

    let Value::Array(items) = document else {
        return Err(DashboardError::Format(format!(
            "expected a top-level array, found {}",
            json_kind(&document)
        )));
    };

    let mut report = LoadReport {
        total_records: items.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(DashboardError::Format(format!(
                "element {index} is {}, expected an object",
                json_kind(item)
            )));
        };

        let row = RawRow { index, object };
        let record = row.to_waybill()?;

        if record.document_datetime.is_none() {
            debug!(index, reference = %record.reference, "No document datetime in reference");
            report.undated_records += 1;
        }
        report.negative_values += count_negatives(index, &record);
        records.push(record);
    }

    debug!(
        total = report.total_records,
        undated = report.undated_records,
        negative = report.negative_values,
        "Waybills parsed"
    );

    Ok(LoadedWaybills {
        records: RecordSet::new(records),
        report,
    })
}

struct RawRow<'a> {
    index: usize,
    object: &'a Map<String, Value>,
}

impl RawRow<'_> {
    fn get(&self, field: &'static str) -> std::result::Result<&Value, SchemaError> {
        self.object.get(field).ok_or(SchemaError::MissingField {
            index: self.index,
            field,
        })
    }

    fn string(&self, field: &'static str) -> std::result::Result<String, SchemaError> {
        match self.get(field)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(SchemaError::WrongType {
                index: self.index,
                field,
                expected: "string",
            }),
        }
    }

    /// `null` is accepted as a missing value.
    fn number(&self, field: &'static str) -> std::result::Result<Option<f64>, SchemaError> {
        match self.get(field)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            _ => Err(SchemaError::WrongType {
                index: self.index,
                field,
                expected: "number",
            }),
        }
    }

    fn to_waybill(&self) -> std::result::Result<Waybill, SchemaError> {
        let reference = self.string(fields::REFERENCE)?;
        let document_datetime = extract_document_datetime(&reference);

        Ok(Waybill {
            work_type: self.string(fields::WORK_TYPE)?,
            driver: self.string(fields::DRIVER)?,
            equipment: self.string(fields::EQUIPMENT)?,
            work_site: self.string(fields::WORK_SITE)?,
            unload_site: self.string(fields::UNLOAD_SITE)?,
            fuel_consumed: self.number(fields::FUEL_CONSUMED)?,
            cargo_turnover: self.number(fields::CARGO_TURNOVER)?,
            operation_count_total: self.number(fields::OPERATION_COUNT_TOTAL)?,
            nomenclature_count_total: self.number(fields::NOMENCLATURE_COUNT_TOTAL)?,
            equipment_duration: self.number(fields::EQUIPMENT_DURATION)?,
            reference,
            document_datetime,
        })
    }
}

fn count_negatives(index: usize, record: &Waybill) -> usize {
    let numeric = [
        (fields::FUEL_CONSUMED, record.fuel_consumed),
        (fields::CARGO_TURNOVER, record.cargo_turnover),
        (fields::OPERATION_COUNT_TOTAL, record.operation_count_total),
        (fields::NOMENCLATURE_COUNT_TOTAL, record.nomenclature_count_total),
        (fields::EQUIPMENT_DURATION, record.equipment_duration),
    ];

    let mut count = 0;
    for (field, value) in numeric {
        if let Some(v) = value.filter(|v| *v < 0.0) {
            warn!(index, field, value = v, "Negative value in waybill");
            count += 1;
        }
    }
    count
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row() -> Value {
        json!({
            "Ссылка": "Путевой лист №7 от 15.01.2024 9:15:00",
            "ТехнологическиеОперацииВидРабот": "Перевозка щебня",
            "Водитель": "Петров П.П.",
            "Оборудование": "КАМАЗ 65115",
            "ТехнологическиеОперацииУчастокРабот": "Карьер №2",
            "ТехнологическиеОперацииУчастокРазгрузки": "Площадка А",
            "РасходТоплива": 42.5,
            "ТехнологическиеОперацииГрузооборот": 850,
            "ТехнологическиеОперацииКоличествоОперацийВсего": 4,
            "ТехнологическиеОперацииКоличествоНоменклатурыВсего": 60,
            "ПоказателиОборудованияПоУчасткамПродолжительность": 7.5,
            "Комментарий": "extra keys are ignored"
        })
    }

    fn bytes(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_parse_valid_document() {
        let loaded = parse_waybills(&bytes(&json!([full_row(), full_row()]))).unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.report.total_records, 2);
        assert_eq!(loaded.report.undated_records, 0);

        let first = &loaded.records.as_slice()[0];
        assert_eq!(first.driver, "Петров П.П.");
        assert_eq!(first.route(), "Карьер №2 → Площадка А");
        assert_eq!(first.cargo_turnover, Some(850.0));
        assert_eq!(
            first.document_datetime.map(|d| d.to_string()),
            Some("2024-01-15 09:15:00".to_string())
        );
    }

    #[test]
    fn test_parse_empty_array() {
        let loaded = parse_waybills(b"[]").unwrap();
        assert!(loaded.records.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_waybills(b"{not json");
        assert!(matches!(result, Err(DashboardError::Format(_))));
    }

    #[test]
    fn test_parse_top_level_object_is_format_error() {
        let result = parse_waybills(&bytes(&full_row()));
        assert!(matches!(result, Err(DashboardError::Format(_))));
    }

    #[test]
    fn test_parse_non_object_element_is_format_error() {
        let result = parse_waybills(&bytes(&json!([full_row(), 5])));
        match result {
            Err(DashboardError::Format(msg)) => assert!(msg.contains("element 1")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_field_names_field() {
        let mut row = full_row();
        row.as_object_mut().unwrap().remove("Водитель");

        let result = parse_waybills(&bytes(&json!([full_row(), row])));
        match result {
            Err(DashboardError::Schema(err)) => {
                assert_eq!(
                    err,
                    SchemaError::MissingField {
                        index: 1,
                        field: "Водитель"
                    }
                );
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_string_in_numeric_field_is_schema_error() {
        let mut row = full_row();
        row["РасходТоплива"] = json!("42,5");

        let result = parse_waybills(&bytes(&json!([row])));
        assert!(matches!(
            result,
            Err(DashboardError::Schema(SchemaError::WrongType {
                field: "РасходТоплива",
                expected: "number",
                ..
            }))
        ));
    }

    #[test]
    fn test_null_numeric_is_missing_value() {
        let mut row = full_row();
        row["ТехнологическиеОперацииГрузооборот"] = Value::Null;

        let loaded = parse_waybills(&bytes(&json!([row]))).unwrap();
        assert_eq!(loaded.records.as_slice()[0].cargo_turnover, None);
    }

    #[test]
    fn test_undated_reference_is_kept() {
        let mut row = full_row();
        row["Ссылка"] = json!("Путевой лист без даты");

        let loaded = parse_waybills(&bytes(&json!([row]))).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records.as_slice()[0].document_datetime, None);
        assert_eq!(loaded.report.undated_records, 1);
    }

    #[test]
    fn test_negative_values_are_counted_not_rejected() {
        let mut row = full_row();
        row["РасходТоплива"] = json!(-3.0);
        row["ПоказателиОборудованияПоУчасткамПродолжительность"] = json!(-1);

        let loaded = parse_waybills(&bytes(&json!([row]))).unwrap();
        assert_eq!(loaded.report.negative_values, 2);
        assert_eq!(loaded.records.as_slice()[0].fuel_consumed, Some(-3.0));
    }
}
