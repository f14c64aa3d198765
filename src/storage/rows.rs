//! Column decoding and query-building helpers shared by the table modules.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::query::Query;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn uuid_col(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    Uuid::parse_str(&value).with_context(|| format!("Invalid {}", column))
}

pub(crate) fn opt_uuid_col(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.get(column);
    value
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .with_context(|| format!("Invalid {}", column))
}

pub(crate) fn date_col(row: &SqliteRow, column: &str) -> Result<NaiveDate> {
    let value: String = row.get(column);
    NaiveDate::parse_from_str(&value, DATE_FORMAT).with_context(|| format!("Invalid {}", column))
}

pub(crate) fn opt_date_col(row: &SqliteRow, column: &str) -> Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(column);
    value
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
        .transpose()
        .with_context(|| format!("Invalid {}", column))
}

pub(crate) fn datetime_col(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid {} timestamp", column))?
        .with_timezone(&Utc))
}

pub(crate) fn enum_col<T>(
    row: &SqliteRow,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T> {
    let value: String = row.get(column);
    parse(&value).ok_or_else(|| anyhow!("Invalid {}: {}", column, value))
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn fmt_opt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(fmt_date)
}

/// Comma separated `?` placeholders.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Append `AND column IN (...)` for a row-grant filter. An empty grant list matches
/// nothing.
pub(crate) fn push_id_filter(sql: &mut String, column: &str, ids: Option<&[Uuid]>) {
    match ids {
        None => {}
        Some([]) => sql.push_str(" AND 0"),
        Some(ids) => {
            sql.push_str(&format!(" AND {} IN ({})", column, placeholders(ids.len())));
        }
    }
}

/// Bind the ids pushed by [`push_id_filter`].
pub(crate) fn bind_ids<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ids: Option<&[Uuid]>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for id in ids.unwrap_or_default() {
        query = query.bind(id.to_string());
    }
    query
}

/// `%term%` pattern for LIKE searches.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}
