//! Document timestamps embedded in waybill references.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DOCUMENT_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bот\s+(\d{2})\.(\d{2})\.(\d{4})\s+(\d{1,2}):(\d{2}):(\d{2})")
        .expect("document datetime pattern is valid")
});

/// Extracts the `от DD.MM.YYYY H:MM:SS` timestamp from a reference string.
///
/// Day first, 24-hour clock. Returns `None` when there is no match or the
/// matched digits are not a real calendar date/time.
pub fn extract_document_datetime(reference: &str) -> Option<NaiveDateTime> {
    let caps = DOCUMENT_DATETIME.captures(reference)?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, num(2)?, num(1)?)?.and_hms_opt(num(4)?, num(5)?, num(6)?)
}
