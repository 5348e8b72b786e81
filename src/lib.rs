pub mod analyzers;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod presentation;
pub mod record;
pub mod source;

pub use error::{DashboardError, Result, SchemaError};
