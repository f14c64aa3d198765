use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{
    LedgerId, LedgerItem, LedgerItemId, LedgerItemKind, MonthKey, ResidentId, ResidentLedger,
};

use super::rows::{date_col, datetime_col, enum_col, fmt_date, uuid_col};

const LEDGER_COLUMNS: &str = "id, resident_id, ledger_month, created_at, amount, balance_due, \
                              private_pay_balance_due, sources";
const ITEM_COLUMNS: &str = "id, ledger_id, kind, amount, date, notes";

// ========================
// Ledgers
// ========================

pub async fn insert(conn: &mut SqliteConnection, ledger: &ResidentLedger) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO resident_ledgers
            (id, resident_id, ledger_month, created_at, amount,
             balance_due, private_pay_balance_due, sources)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ledger.id.to_string())
    .bind(ledger.resident_id.to_string())
    .bind(ledger.month.as_string())
    .bind(ledger.created_at.to_rfc3339())
    .bind(ledger.amount)
    .bind(ledger.balance_due)
    .bind(ledger.private_pay_balance_due)
    .bind(serde_json::to_string(&ledger.sources)?)
    .execute(&mut *conn)
    .await
    .context("Failed to save resident ledger")?;
    Ok(())
}

/// Persist the mutable part of a ledger: amounts, balances and payment sources.
pub async fn update(conn: &mut SqliteConnection, ledger: &ResidentLedger) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE resident_ledgers
        SET amount = ?, balance_due = ?, private_pay_balance_due = ?, sources = ?
        WHERE id = ?
        "#,
    )
    .bind(ledger.amount)
    .bind(ledger.balance_due)
    .bind(ledger.private_pay_balance_due)
    .bind(serde_json::to_string(&ledger.sources)?)
    .bind(ledger.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update resident ledger")?;
    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: LedgerId) -> Result<Option<ResidentLedger>> {
    let sql = format!("SELECT {} FROM resident_ledgers WHERE id = ?", LEDGER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch resident ledger")?;

    row.as_ref().map(row_to_ledger).transpose()
}

pub async fn get_by_month(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
    month: MonthKey,
) -> Result<Option<ResidentLedger>> {
    let sql = format!(
        "SELECT {} FROM resident_ledgers WHERE resident_id = ? AND ledger_month = ?",
        LEDGER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .bind(month.as_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch resident ledger by month")?;

    row.as_ref().map(row_to_ledger).transpose()
}

/// Ledgers of the resident whose month lies in `[from, to]`.
pub async fn list_in_months(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
    from: MonthKey,
    to: MonthKey,
) -> Result<Vec<ResidentLedger>> {
    let sql = format!(
        r#"
        SELECT {} FROM resident_ledgers
        WHERE resident_id = ? AND ledger_month >= ? AND ledger_month <= ?
        ORDER BY ledger_month
        "#,
        LEDGER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .bind(from.as_string())
        .bind(to.as_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list resident ledgers in range")?;

    rows.iter().map(row_to_ledger).collect()
}

pub async fn list_for_resident(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
) -> Result<Vec<ResidentLedger>> {
    let sql = format!(
        "SELECT {} FROM resident_ledgers WHERE resident_id = ? ORDER BY ledger_month DESC",
        LEDGER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list resident ledgers")?;

    rows.iter().map(row_to_ledger).collect()
}

pub async fn grid_for_resident(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
    limit: u64,
    offset: u64,
) -> Result<(Vec<ResidentLedger>, i64)> {
    let total: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM resident_ledgers WHERE resident_id = ?",
    )
    .bind(resident_id.to_string())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to count resident ledgers")?
    .get("count");

    let sql = format!(
        "SELECT {} FROM resident_ledgers WHERE resident_id = ? ORDER BY ledger_month DESC \
         LIMIT ? OFFSET ?",
        LEDGER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to page resident ledgers")?;

    let ledgers = rows.iter().map(row_to_ledger).collect::<Result<Vec<_>>>()?;
    Ok((ledgers, total))
}

pub async fn delete(conn: &mut SqliteConnection, id: LedgerId) -> Result<()> {
    sqlx::query("DELETE FROM resident_ledgers WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete resident ledger")?;
    Ok(())
}

fn row_to_ledger(row: &SqliteRow) -> Result<ResidentLedger> {
    let month: String = row.get("ledger_month");
    let sources: String = row.get("sources");
    Ok(ResidentLedger {
        id: uuid_col(row, "id")?,
        resident_id: uuid_col(row, "resident_id")?,
        month: MonthKey::parse(&month).ok_or_else(|| anyhow!("Invalid ledger month: {}", month))?,
        created_at: datetime_col(row, "created_at")?,
        amount: row.get("amount"),
        balance_due: row.get("balance_due"),
        private_pay_balance_due: row.get("private_pay_balance_due"),
        sources: serde_json::from_str(&sources).context("Invalid ledger sources")?,
    })
}

// ========================
// Ledger items
// ========================

pub async fn insert_item(conn: &mut SqliteConnection, item: &LedgerItem) -> Result<()> {
    sqlx::query(
        "INSERT INTO ledger_items (id, ledger_id, kind, amount, date, notes) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id.to_string())
    .bind(item.ledger_id.to_string())
    .bind(item.kind.as_str())
    .bind(item.amount)
    .bind(fmt_date(item.date))
    .bind(&item.notes)
    .execute(&mut *conn)
    .await
    .context("Failed to save ledger item")?;
    Ok(())
}

pub async fn update_item(conn: &mut SqliteConnection, item: &LedgerItem) -> Result<()> {
    sqlx::query("UPDATE ledger_items SET kind = ?, amount = ?, date = ?, notes = ? WHERE id = ?")
        .bind(item.kind.as_str())
        .bind(item.amount)
        .bind(fmt_date(item.date))
        .bind(&item.notes)
        .bind(item.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update ledger item")?;
    Ok(())
}

pub async fn get_item(conn: &mut SqliteConnection, id: LedgerItemId) -> Result<Option<LedgerItem>> {
    let sql = format!("SELECT {} FROM ledger_items WHERE id = ?", ITEM_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch ledger item")?;

    row.as_ref().map(row_to_item).transpose()
}

/// Items of a ledger, optionally only one kind.
pub async fn list_items(
    conn: &mut SqliteConnection,
    ledger_id: LedgerId,
    kind: Option<LedgerItemKind>,
) -> Result<Vec<LedgerItem>> {
    let mut sql = format!("SELECT {} FROM ledger_items WHERE ledger_id = ?", ITEM_COLUMNS);
    if kind.is_some() {
        sql.push_str(" AND kind = ?");
    }
    sql.push_str(" ORDER BY date");

    let mut query = sqlx::query(&sql).bind(ledger_id.to_string());
    if let Some(kind) = kind {
        query = query.bind(kind.as_str());
    }
    let rows = query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list ledger items")?;

    rows.iter().map(row_to_item).collect()
}

pub async fn delete_item(conn: &mut SqliteConnection, id: LedgerItemId) -> Result<()> {
    sqlx::query("DELETE FROM ledger_items WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete ledger item")?;
    Ok(())
}

pub async fn delete_items_for_ledger(
    conn: &mut SqliteConnection,
    ledger_id: LedgerId,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ledger_items WHERE ledger_id = ?")
        .bind(ledger_id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete ledger items")?;
    Ok(result.rows_affected())
}

fn row_to_item(row: &SqliteRow) -> Result<LedgerItem> {
    Ok(LedgerItem {
        id: uuid_col(row, "id")?,
        ledger_id: uuid_col(row, "ledger_id")?,
        kind: enum_col(row, "kind", LedgerItemKind::from_str)?,
        amount: row.get("amount"),
        date: date_col(row, "date")?,
        notes: row.get("notes"),
    })
}
