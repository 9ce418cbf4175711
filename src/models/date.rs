use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::LedgerError;

/// 解析日历日期
///
/// 只取 `YYYY-MM-DD` 前缀, 不做任何时区换算:
/// `2024-03-01T23:30:00-05:00` 与 `2024-03-01T01:00:00+09:00` 都是 2024-03-01。
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, LedgerError> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| LedgerError::InvalidInput(format!("invalid date \"{}\": {}", raw, e)))
}

/// serde 反序列化: 必填日期
pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).map_err(serde::de::Error::custom)
}

/// serde 反序列化: 可选日期, 空串视为未填
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
