use anyhow::{Context, Result};
use chrono::NaiveDate;

pub fn to_i64(value: u32) -> i64 {
    i64::from(value)
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("failed to parse {field} '{value}'"))
}
