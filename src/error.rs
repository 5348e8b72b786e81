//! Error taxonomy for a dashboard render pass.

use thiserror::Error;

/// A required field that is absent or holds the wrong JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("record {index}: missing required field \"{field}\"")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index}: field \"{field}\" must be a {expected}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
}

impl SchemaError {
    /// Original label of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            SchemaError::MissingField { field, .. } | SchemaError::WrongType { field, .. } => field,
        }
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not a JSON array of objects: {0}")]
    Format(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("no records match the selected filters")]
    EmptyResult,

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("config error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Blocking errors end the render pass and need new input or settings.
    /// An empty filter result only needs the filters adjusted.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, DashboardError::EmptyResult)
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_not_blocking() {
        assert!(!DashboardError::EmptyResult.is_blocking());
        assert!(DashboardError::Format("bad".into()).is_blocking());
        assert!(
            DashboardError::Schema(SchemaError::MissingField {
                index: 0,
                field: "Водитель"
            })
            .is_blocking()
        );
    }

    #[test]
    fn test_schema_error_names_field() {
        let err = SchemaError::WrongType {
            index: 3,
            field: "РасходТоплива",
            expected: "number",
        };
        assert_eq!(err.field(), "РасходТоплива");
        assert_eq!(
            err.to_string(),
            "record 3: field \"РасходТоплива\" must be a number"
        );
    }
}
