use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::domain::{RentId, RentPeriod, Resident, ResidentId, ResidentRent, SpaceId};

use super::rows::{
    bind_ids, date_col, datetime_col, enum_col, fmt_date, fmt_opt_date, like_pattern,
    opt_date_col, opt_uuid_col, placeholders, push_id_filter, uuid_col,
};

const RESIDENT_COLUMNS: &str =
    "id, space_id, first_name, last_name, physician_id, admitted_on, discharged_on, created_at";

// ========================
// Residents
// ========================

pub async fn insert(conn: &mut SqliteConnection, resident: &Resident) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO residents
            (id, space_id, first_name, last_name, physician_id,
             admitted_on, discharged_on, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resident.id.to_string())
    .bind(resident.space_id.to_string())
    .bind(&resident.first_name)
    .bind(&resident.last_name)
    .bind(resident.physician_id.map(|id| id.to_string()))
    .bind(fmt_date(resident.admitted_on))
    .bind(fmt_opt_date(resident.discharged_on))
    .bind(resident.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .context("Failed to save resident")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, resident: &Resident) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE residents
        SET first_name = ?, last_name = ?, physician_id = ?, admitted_on = ?, discharged_on = ?
        WHERE id = ?
        "#,
    )
    .bind(&resident.first_name)
    .bind(&resident.last_name)
    .bind(resident.physician_id.map(|id| id.to_string()))
    .bind(fmt_date(resident.admitted_on))
    .bind(fmt_opt_date(resident.discharged_on))
    .bind(resident.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update resident")?;
    Ok(())
}

/// Get a resident by id within a space.
pub async fn get(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: ResidentId,
) -> Result<Option<Resident>> {
    let sql = format!("SELECT {} FROM residents WHERE space_id = ? AND id = ?", RESIDENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(space_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch resident")?;

    row.as_ref().map(row_to_resident).transpose()
}

/// Residents of the space among `ids`, honouring the grant filter.
pub async fn get_many(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    ids: &[Uuid],
    grant: Option<&[Uuid]>,
) -> Result<Vec<Resident>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut sql = format!(
        "SELECT {} FROM residents WHERE space_id = ? AND id IN ({})",
        RESIDENT_COLUMNS,
        placeholders(ids.len())
    );
    push_id_filter(&mut sql, "id", grant);

    let mut query = sqlx::query(&sql).bind(space_id.to_string());
    query = bind_ids(query, Some(ids));
    query = bind_ids(query, grant);

    let rows = query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch residents")?;

    rows.iter().map(row_to_resident).collect()
}

pub async fn list(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    grant: Option<&[Uuid]>,
) -> Result<Vec<Resident>> {
    let mut sql = format!("SELECT {} FROM residents WHERE space_id = ?", RESIDENT_COLUMNS);
    push_id_filter(&mut sql, "id", grant);
    sql.push_str(" ORDER BY last_name, first_name");

    let query = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), grant);
    let rows = query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list residents")?;

    rows.iter().map(row_to_resident).collect()
}

/// One page of residents plus the total number of matches.
pub async fn grid(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    grant: Option<&[Uuid]>,
    search: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<(Vec<Resident>, i64)> {
    let mut filter = String::from(" WHERE space_id = ?");
    push_id_filter(&mut filter, "id", grant);
    if search.is_some() {
        filter.push_str(r" AND (first_name || ' ' || last_name) LIKE ? ESCAPE '\'");
    }
    let pattern = search.map(like_pattern);

    let count_sql = format!("SELECT COUNT(*) AS count FROM residents{}", filter);
    let mut count_query = bind_ids(sqlx::query(&count_sql).bind(space_id.to_string()), grant);
    if let Some(pattern) = &pattern {
        count_query = count_query.bind(pattern.clone());
    }
    let total: i64 = count_query
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count residents")?
        .get("count");

    let sql = format!(
        "SELECT {} FROM residents{} ORDER BY last_name, first_name LIMIT ? OFFSET ?",
        RESIDENT_COLUMNS, filter
    );
    let mut query = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), grant);
    if let Some(pattern) = &pattern {
        query = query.bind(pattern.clone());
    }
    let rows = query
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to page residents")?;

    let residents = rows.iter().map(row_to_resident).collect::<Result<Vec<_>>>()?;
    Ok((residents, total))
}

pub async fn delete(conn: &mut SqliteConnection, id: ResidentId) -> Result<()> {
    sqlx::query("DELETE FROM residents WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete resident")?;
    Ok(())
}

/// Number of rows in `table` that reference the resident.
pub async fn count_owned(conn: &mut SqliteConnection, table: &str, id: ResidentId) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) AS count FROM {} WHERE resident_id = ?", table);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("Failed to count {}", table))?;
    Ok(row.get("count"))
}

pub async fn count_by_physician(conn: &mut SqliteConnection, physician_id: Uuid) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM residents WHERE physician_id = ?")
        .bind(physician_id.to_string())
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count residents by physician")?;
    Ok(row.get("count"))
}

fn row_to_resident(row: &SqliteRow) -> Result<Resident> {
    Ok(Resident {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        physician_id: opt_uuid_col(row, "physician_id")?,
        admitted_on: date_col(row, "admitted_on")?,
        discharged_on: opt_date_col(row, "discharged_on")?,
        created_at: datetime_col(row, "created_at")?,
    })
}

// ========================
// Rents
// ========================

pub async fn insert_rent(conn: &mut SqliteConnection, rent: &ResidentRent) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO resident_rents (id, resident_id, period, amount, start_date, end_date, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rent.id.to_string())
    .bind(rent.resident_id.to_string())
    .bind(rent.period.as_str())
    .bind(rent.amount)
    .bind(fmt_date(rent.start))
    .bind(fmt_opt_date(rent.end))
    .bind(&rent.notes)
    .execute(&mut *conn)
    .await
    .context("Failed to save resident rent")?;
    Ok(())
}

pub async fn update_rent(conn: &mut SqliteConnection, rent: &ResidentRent) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE resident_rents
        SET period = ?, amount = ?, start_date = ?, end_date = ?, notes = ?
        WHERE id = ?
        "#,
    )
    .bind(rent.period.as_str())
    .bind(rent.amount)
    .bind(fmt_date(rent.start))
    .bind(fmt_opt_date(rent.end))
    .bind(&rent.notes)
    .bind(rent.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update resident rent")?;
    Ok(())
}

pub async fn get_rent(conn: &mut SqliteConnection, id: RentId) -> Result<Option<ResidentRent>> {
    let row = sqlx::query(
        "SELECT id, resident_id, period, amount, start_date, end_date, notes FROM resident_rents \
         WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch resident rent")?;

    row.as_ref().map(row_to_rent).transpose()
}

pub async fn list_rents(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
) -> Result<Vec<ResidentRent>> {
    let rows = sqlx::query(
        r#"
        SELECT id, resident_id, period, amount, start_date, end_date, notes
        FROM resident_rents
        WHERE resident_id = ?
        ORDER BY start_date
        "#,
    )
    .bind(resident_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list resident rents")?;

    rows.iter().map(row_to_rent).collect()
}

pub async fn delete_rent(conn: &mut SqliteConnection, id: RentId) -> Result<()> {
    sqlx::query("DELETE FROM resident_rents WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete resident rent")?;
    Ok(())
}

fn row_to_rent(row: &SqliteRow) -> Result<ResidentRent> {
    Ok(ResidentRent {
        id: uuid_col(row, "id")?,
        resident_id: uuid_col(row, "resident_id")?,
        period: enum_col(row, "period", RentPeriod::from_str)?,
        amount: row.get("amount"),
        start: date_col(row, "start_date")?,
        end: opt_date_col(row, "end_date")?,
        notes: row.get("notes"),
    })
}
