use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{AdjustmentId, AdjustmentItem, AdjustmentKind, ResidentId};

use super::rows::{date_col, enum_col, fmt_date, uuid_col};

const ADJUSTMENT_COLUMNS: &str = "id, resident_id, kind, amount, start_date, end_date, notes";

pub async fn insert(conn: &mut SqliteConnection, item: &AdjustmentItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO adjustment_items (id, resident_id, kind, amount, start_date, end_date, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.resident_id.to_string())
    .bind(item.kind.as_str())
    .bind(item.amount)
    .bind(fmt_date(item.start))
    .bind(fmt_date(item.end))
    .bind(&item.notes)
    .execute(&mut *conn)
    .await
    .context("Failed to save adjustment item")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, item: &AdjustmentItem) -> Result<()> {
    sqlx::query(
        "UPDATE adjustment_items SET kind = ?, amount = ?, start_date = ?, end_date = ?, notes = ? \
         WHERE id = ?",
    )
    .bind(item.kind.as_str())
    .bind(item.amount)
    .bind(fmt_date(item.start))
    .bind(fmt_date(item.end))
    .bind(&item.notes)
    .bind(item.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update adjustment item")?;
    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: AdjustmentId) -> Result<Option<AdjustmentItem>> {
    let sql = format!("SELECT {} FROM adjustment_items WHERE id = ?", ADJUSTMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch adjustment item")?;

    row.as_ref().map(row_to_adjustment).transpose()
}

pub async fn list_for_resident(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
    kind: AdjustmentKind,
) -> Result<Vec<AdjustmentItem>> {
    let sql = format!(
        "SELECT {} FROM adjustment_items WHERE resident_id = ? AND kind = ? ORDER BY start_date",
        ADJUSTMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .bind(kind.as_str())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list adjustment items")?;

    rows.iter().map(row_to_adjustment).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: AdjustmentId) -> Result<()> {
    sqlx::query("DELETE FROM adjustment_items WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete adjustment item")?;
    Ok(())
}

fn row_to_adjustment(row: &SqliteRow) -> Result<AdjustmentItem> {
    Ok(AdjustmentItem {
        id: uuid_col(row, "id")?,
        resident_id: uuid_col(row, "resident_id")?,
        kind: enum_col(row, "kind", AdjustmentKind::from_str)?,
        amount: row.get("amount"),
        start: date_col(row, "start_date")?,
        end: date_col(row, "end_date")?,
        notes: row.get("notes"),
    })
}
