use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::domain::{Medication, MedicationId, Physician, PhysicianId, SpaceId};

use super::rows::{bind_ids, like_pattern, placeholders, push_id_filter, uuid_col};

// ========================
// Physicians
// ========================

pub async fn insert_physician(conn: &mut SqliteConnection, physician: &Physician) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO physicians (id, space_id, first_name, last_name, phone, email)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(physician.id.to_string())
    .bind(physician.space_id.to_string())
    .bind(&physician.first_name)
    .bind(&physician.last_name)
    .bind(&physician.phone)
    .bind(&physician.email)
    .execute(&mut *conn)
    .await
    .context("Failed to save physician")?;
    Ok(())
}

pub async fn update_physician(conn: &mut SqliteConnection, physician: &Physician) -> Result<()> {
    sqlx::query(
        "UPDATE physicians SET first_name = ?, last_name = ?, phone = ?, email = ? WHERE id = ?",
    )
    .bind(&physician.first_name)
    .bind(&physician.last_name)
    .bind(&physician.phone)
    .bind(&physician.email)
    .bind(physician.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update physician")?;
    Ok(())
}

pub async fn get_physician(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: PhysicianId,
) -> Result<Option<Physician>> {
    let row = sqlx::query(
        r#"
        SELECT id, space_id, first_name, last_name, phone, email
        FROM physicians
        WHERE space_id = ? AND id = ?
        "#,
    )
    .bind(space_id.to_string())
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch physician")?;

    row.as_ref().map(row_to_physician).transpose()
}

pub async fn get_physicians(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    ids: &[Uuid],
) -> Result<Vec<Physician>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id, space_id, first_name, last_name, phone, email FROM physicians \
         WHERE space_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let rows = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), Some(ids))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch physicians")?;

    rows.iter().map(row_to_physician).collect()
}

pub async fn list_physicians(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
) -> Result<Vec<Physician>> {
    let rows = sqlx::query(
        r#"
        SELECT id, space_id, first_name, last_name, phone, email
        FROM physicians
        WHERE space_id = ?
        ORDER BY last_name, first_name
        "#,
    )
    .bind(space_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list physicians")?;

    rows.iter().map(row_to_physician).collect()
}

pub async fn grid_physicians(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    grant: Option<&[Uuid]>,
    search: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<(Vec<Physician>, i64)> {
    let pattern = like_pattern(search.unwrap_or_default());
    let mut filter = String::from(
        r" WHERE space_id = ? AND (first_name || ' ' || last_name) LIKE ? ESCAPE '\'",
    );
    push_id_filter(&mut filter, "id", grant);

    let count_sql = format!("SELECT COUNT(*) AS count FROM physicians{}", filter);
    let count_query = sqlx::query(&count_sql)
        .bind(space_id.to_string())
        .bind(&pattern);
    let total: i64 = bind_ids(count_query, grant)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count physicians")?
        .get("count");

    let sql = format!(
        "SELECT id, space_id, first_name, last_name, phone, email FROM physicians{} \
         ORDER BY last_name, first_name LIMIT ? OFFSET ?",
        filter
    );
    let query = sqlx::query(&sql).bind(space_id.to_string()).bind(&pattern);
    let rows = bind_ids(query, grant)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to page physicians")?;

    let physicians = rows.iter().map(row_to_physician).collect::<Result<Vec<_>>>()?;
    Ok((physicians, total))
}

pub async fn delete_physician(conn: &mut SqliteConnection, id: PhysicianId) -> Result<()> {
    sqlx::query("DELETE FROM physicians WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete physician")?;
    Ok(())
}

fn row_to_physician(row: &SqliteRow) -> Result<Physician> {
    Ok(Physician {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        email: row.get("email"),
    })
}

// ========================
// Medications
// ========================

pub async fn insert_medication(conn: &mut SqliteConnection, medication: &Medication) -> Result<()> {
    sqlx::query("INSERT INTO medications (id, space_id, title) VALUES (?, ?, ?)")
        .bind(medication.id.to_string())
        .bind(medication.space_id.to_string())
        .bind(&medication.title)
        .execute(&mut *conn)
        .await
        .context("Failed to save medication")?;
    Ok(())
}

pub async fn update_medication(conn: &mut SqliteConnection, medication: &Medication) -> Result<()> {
    sqlx::query("UPDATE medications SET title = ? WHERE id = ?")
        .bind(&medication.title)
        .bind(medication.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update medication")?;
    Ok(())
}

pub async fn get_medication(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: MedicationId,
) -> Result<Option<Medication>> {
    let row = sqlx::query(
        "SELECT id, space_id, title FROM medications WHERE space_id = ? AND id = ?",
    )
    .bind(space_id.to_string())
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch medication")?;

    row.as_ref().map(row_to_medication).transpose()
}

pub async fn get_medications(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    ids: &[Uuid],
) -> Result<Vec<Medication>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id, space_id, title FROM medications WHERE space_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let rows = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), Some(ids))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch medications")?;

    rows.iter().map(row_to_medication).collect()
}

pub async fn list_medications(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
) -> Result<Vec<Medication>> {
    let rows = sqlx::query(
        "SELECT id, space_id, title FROM medications WHERE space_id = ? ORDER BY title",
    )
    .bind(space_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list medications")?;

    rows.iter().map(row_to_medication).collect()
}

pub async fn delete_medication(conn: &mut SqliteConnection, id: MedicationId) -> Result<()> {
    sqlx::query("DELETE FROM medications WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete medication")?;
    Ok(())
}

fn row_to_medication(row: &SqliteRow) -> Result<Medication> {
    Ok(Medication {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        title: row.get("title"),
    })
}
