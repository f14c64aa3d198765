use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::domain::{Document, DocumentId, SpaceId};

use super::rows::{bind_ids, datetime_col, like_pattern, placeholders, push_id_filter, uuid_col};

const DOCUMENT_COLUMNS: &str = "id, space_id, title, description, file_key, mime_type, created_at";

pub async fn insert(conn: &mut SqliteConnection, document: &Document) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, space_id, title, description, file_key, mime_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(document.id.to_string())
    .bind(document.space_id.to_string())
    .bind(&document.title)
    .bind(&document.description)
    .bind(&document.file_key)
    .bind(&document.mime_type)
    .bind(document.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .context("Failed to save document")?;
    Ok(())
}

pub async fn update(conn: &mut SqliteConnection, document: &Document) -> Result<()> {
    sqlx::query(
        "UPDATE documents SET title = ?, description = ?, file_key = ?, mime_type = ? WHERE id = ?",
    )
    .bind(&document.title)
    .bind(&document.description)
    .bind(&document.file_key)
    .bind(&document.mime_type)
    .bind(document.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update document")?;
    Ok(())
}

pub async fn get(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: DocumentId,
) -> Result<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE space_id = ? AND id = ?", DOCUMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(space_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch document")?;

    row.as_ref().map(row_to_document).transpose()
}

pub async fn get_many(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    ids: &[Uuid],
) -> Result<Vec<Document>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {} FROM documents WHERE space_id = ? AND id IN ({}) ORDER BY created_at",
        DOCUMENT_COLUMNS,
        placeholders(ids.len())
    );
    let rows = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), Some(ids))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch documents")?;

    rows.iter().map(row_to_document).collect()
}

pub async fn list(conn: &mut SqliteConnection, space_id: SpaceId) -> Result<Vec<Document>> {
    let sql = format!(
        "SELECT {} FROM documents WHERE space_id = ? ORDER BY title",
        DOCUMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(space_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list documents")?;

    rows.iter().map(row_to_document).collect()
}

pub async fn grid(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    grant: Option<&[Uuid]>,
    search: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<(Vec<Document>, i64)> {
    let pattern = like_pattern(search.unwrap_or_default());
    let mut filter = String::from(r" WHERE space_id = ? AND title LIKE ? ESCAPE '\'");
    push_id_filter(&mut filter, "id", grant);

    let count_sql = format!("SELECT COUNT(*) AS count FROM documents{}", filter);
    let count_query = sqlx::query(&count_sql)
        .bind(space_id.to_string())
        .bind(&pattern);
    let total: i64 = bind_ids(count_query, grant)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count documents")?
        .get("count");

    let sql = format!(
        "SELECT {} FROM documents{} ORDER BY title LIMIT ? OFFSET ?",
        DOCUMENT_COLUMNS, filter
    );
    let query = sqlx::query(&sql).bind(space_id.to_string()).bind(&pattern);
    let rows = bind_ids(query, grant)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to page documents")?;

    let documents = rows.iter().map(row_to_document).collect::<Result<Vec<_>>>()?;
    Ok((documents, total))
}

pub async fn delete(conn: &mut SqliteConnection, id: DocumentId) -> Result<()> {
    sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete document")?;
    Ok(())
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        title: row.get("title"),
        description: row.get("description"),
        file_key: row.get("file_key"),
        mime_type: row.get("mime_type"),
        created_at: datetime_col(row, "created_at")?,
    })
}
