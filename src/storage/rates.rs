use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{BaseRate, BaseRateId, SpaceId};

use super::rows::{date_col, fmt_date, uuid_col};

pub async fn insert(conn: &mut SqliteConnection, rate: &BaseRate) -> Result<()> {
    sqlx::query(
        "INSERT INTO base_rates (id, space_id, care_level, date, amount) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(rate.id.to_string())
    .bind(rate.space_id.to_string())
    .bind(&rate.care_level)
    .bind(fmt_date(rate.date))
    .bind(rate.amount)
    .execute(&mut *conn)
    .await
    .context("Failed to save base rate")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, rate: &BaseRate) -> Result<()> {
    sqlx::query("UPDATE base_rates SET care_level = ?, date = ?, amount = ? WHERE id = ?")
        .bind(&rate.care_level)
        .bind(fmt_date(rate.date))
        .bind(rate.amount)
        .bind(rate.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update base rate")?;
    Ok(())
}

pub async fn get(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: BaseRateId,
) -> Result<Option<BaseRate>> {
    let row = sqlx::query(
        "SELECT id, space_id, care_level, date, amount FROM base_rates WHERE space_id = ? \
         AND id = ?",
    )
    .bind(space_id.to_string())
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch base rate")?;

    row.as_ref().map(row_to_rate).transpose()
}

/// The rate for a care level on a date, excluding `except` (the rate being edited).
pub async fn find_by_date(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    care_level: &str,
    date: NaiveDate,
    except: Option<BaseRateId>,
) -> Result<Option<BaseRate>> {
    let row = sqlx::query(
        r#"
        SELECT id, space_id, care_level, date, amount
        FROM base_rates
        WHERE space_id = ? AND care_level = ? AND date = ? AND id != ?
        "#,
    )
    .bind(space_id.to_string())
    .bind(care_level)
    .bind(fmt_date(date))
    .bind(except.map(|id| id.to_string()).unwrap_or_default())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to look up base rate by date")?;

    row.as_ref().map(row_to_rate).transpose()
}

pub async fn list(conn: &mut SqliteConnection, space_id: SpaceId) -> Result<Vec<BaseRate>> {
    let rows = sqlx::query(
        r#"
        SELECT id, space_id, care_level, date, amount
        FROM base_rates
        WHERE space_id = ?
        ORDER BY care_level, date DESC
        "#,
    )
    .bind(space_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list base rates")?;

    rows.iter().map(row_to_rate).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: BaseRateId) -> Result<()> {
    sqlx::query("DELETE FROM base_rates WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete base rate")?;
    Ok(())
}

fn row_to_rate(row: &SqliteRow) -> Result<BaseRate> {
    Ok(BaseRate {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        care_level: row.get("care_level"),
        date: date_col(row, "date")?,
        amount: row.get("amount"),
    })
}
