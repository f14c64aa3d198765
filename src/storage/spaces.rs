use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{Space, SpaceId};

use super::rows::{datetime_col, uuid_col};

pub async fn insert(conn: &mut SqliteConnection, space: &Space) -> Result<()> {
    sqlx::query("INSERT INTO spaces (id, name, created_at) VALUES (?, ?, ?)")
        .bind(space.id.to_string())
        .bind(&space.name)
        .bind(space.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save space")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, space: &Space) -> Result<()> {
    sqlx::query("UPDATE spaces SET name = ? WHERE id = ?")
        .bind(&space.name)
        .bind(space.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update space")?;
    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: SpaceId) -> Result<Option<Space>> {
    let row = sqlx::query("SELECT id, name, created_at FROM spaces WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch space")?;

    row.as_ref().map(row_to_space).transpose()
}

pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Space>> {
    let row = sqlx::query("SELECT id, name, created_at FROM spaces WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch space by name")?;

    row.as_ref().map(row_to_space).transpose()
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Space>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM spaces ORDER BY name")
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list spaces")?;

    rows.iter().map(row_to_space).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: SpaceId) -> Result<()> {
    sqlx::query("DELETE FROM spaces WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete space")?;
    Ok(())
}

/// Number of rows in `table` owned by the space.
pub async fn count_owned(conn: &mut SqliteConnection, table: &str, id: SpaceId) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) AS count FROM {} WHERE space_id = ?", table);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("Failed to count {}", table))?;
    Ok(row.get("count"))
}

fn row_to_space(row: &SqliteRow) -> Result<Space> {
    Ok(Space {
        id: uuid_col(row, "id")?,
        name: row.get("name"),
        created_at: datetime_col(row, "created_at")?,
    })
}
