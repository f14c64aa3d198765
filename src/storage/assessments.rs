use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row as _, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    Assessment, AssessmentId, AssessmentRow, Category, CategoryId, Form, FormCategory, FormId,
    ResidentId, Row, SpaceId,
};

use super::rows::{bind_ids, date_col, fmt_date, like_pattern, placeholders, uuid_col};

// ========================
// Categories
// ========================

pub async fn insert_category(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
    sqlx::query(
        "INSERT INTO assessment_categories (id, space_id, title, multi_item) VALUES (?, ?, ?, ?)",
    )
    .bind(category.id.to_string())
    .bind(category.space_id.to_string())
    .bind(&category.title)
    .bind(category.multi_item)
    .execute(&mut *conn)
    .await
    .context("Failed to save assessment category")?;

    insert_rows(conn, &category.rows).await
}

/// Update a category and sync its rows: existing rows are updated in place, new ones
/// inserted and missing ones deleted.
pub async fn update_category(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
    sqlx::query("UPDATE assessment_categories SET title = ?, multi_item = ? WHERE id = ?")
        .bind(&category.title)
        .bind(category.multi_item)
        .bind(category.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update assessment category")?;

    let kept: Vec<Uuid> = category.rows.iter().map(|row| row.id).collect();
    let mut sql = String::from("DELETE FROM assessment_rows WHERE category_id = ?");
    if !kept.is_empty() {
        sql.push_str(&format!(" AND id NOT IN ({})", placeholders(kept.len())));
    }
    bind_ids(sqlx::query(&sql).bind(category.id.to_string()), Some(kept.as_slice()))
        .execute(&mut *conn)
        .await
        .context("Failed to prune assessment rows")?;

    for (position, row) in category.rows.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO assessment_rows (id, category_id, title, score, position)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE
            SET title = excluded.title, score = excluded.score, position = excluded.position
            "#,
        )
        .bind(row.id.to_string())
        .bind(category.id.to_string())
        .bind(&row.title)
        .bind(row.score)
        .bind(position as i64)
        .execute(&mut *conn)
        .await
        .context("Failed to save assessment row")?;
    }
    Ok(())
}

async fn insert_rows(conn: &mut SqliteConnection, rows: &[Row]) -> Result<()> {
    for (position, row) in rows.iter().enumerate() {
        sqlx::query(
            "INSERT INTO assessment_rows (id, category_id, title, score, position) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(row.id.to_string())
        .bind(row.category_id.to_string())
        .bind(&row.title)
        .bind(row.score)
        .bind(position as i64)
        .execute(&mut *conn)
        .await
        .context("Failed to save assessment row")?;
    }
    Ok(())
}

pub async fn get_category(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: CategoryId,
) -> Result<Option<Category>> {
    Ok(get_categories(conn, space_id, &[id]).await?.into_iter().next())
}

/// Categories of the space among `ids`, rows included.
pub async fn get_categories(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    ids: &[Uuid],
) -> Result<Vec<Category>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id, space_id, title, multi_item FROM assessment_categories WHERE space_id = ? \
         AND id IN ({}) ORDER BY title",
        placeholders(ids.len())
    );
    let rows = bind_ids(sqlx::query(&sql).bind(space_id.to_string()), Some(ids))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch assessment categories")?;

    let categories = rows.iter().map(row_to_category).collect::<Result<Vec<_>>>()?;
    attach_rows(conn, categories).await
}

pub async fn list_categories(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        "SELECT id, space_id, title, multi_item FROM assessment_categories WHERE space_id = ? \
         ORDER BY title",
    )
    .bind(space_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list assessment categories")?;

    let categories = rows.iter().map(row_to_category).collect::<Result<Vec<_>>>()?;
    attach_rows(conn, categories).await
}

pub async fn delete_category(conn: &mut SqliteConnection, id: CategoryId) -> Result<()> {
    sqlx::query("DELETE FROM assessment_categories WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete assessment category")?;
    Ok(())
}

/// Number of forms that include the category.
pub async fn count_forms_with_category(conn: &mut SqliteConnection, id: CategoryId) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM assessment_form_categories WHERE category_id = ?",
    )
    .bind(id.to_string())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to count forms with category")?;
    Ok(row.get("count"))
}

async fn attach_rows(
    conn: &mut SqliteConnection,
    mut categories: Vec<Category>,
) -> Result<Vec<Category>> {
    if categories.is_empty() {
        return Ok(categories);
    }
    let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    let sql = format!(
        "SELECT id, category_id, title, score FROM assessment_rows WHERE category_id IN ({}) \
         ORDER BY position",
        placeholders(ids.len())
    );
    let rows = bind_ids(sqlx::query(&sql), Some(ids.as_slice()))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch assessment rows")?;

    let mut by_category: HashMap<CategoryId, Vec<Row>> = HashMap::new();
    for row in &rows {
        let row = Row {
            id: uuid_col(row, "id")?,
            category_id: uuid_col(row, "category_id")?,
            title: row.get("title"),
            score: row.get("score"),
        };
        by_category.entry(row.category_id).or_default().push(row);
    }
    for category in &mut categories {
        category.rows = by_category.remove(&category.id).unwrap_or_default();
    }
    Ok(categories)
}

fn row_to_category(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        title: row.get("title"),
        multi_item: row.get("multi_item"),
        rows: Vec::new(),
    })
}

// ========================
// Forms
// ========================

pub async fn insert_form(conn: &mut SqliteConnection, form: &Form) -> Result<()> {
    sqlx::query("INSERT INTO assessment_forms (id, space_id, title) VALUES (?, ?, ?)")
        .bind(form.id.to_string())
        .bind(form.space_id.to_string())
        .bind(&form.title)
        .execute(&mut *conn)
        .await
        .context("Failed to save assessment form")?;

    insert_form_categories(conn, form).await
}

pub async fn update_form(conn: &mut SqliteConnection, form: &Form) -> Result<()> {
    sqlx::query("UPDATE assessment_forms SET title = ? WHERE id = ?")
        .bind(&form.title)
        .bind(form.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update assessment form")?;

    sqlx::query("DELETE FROM assessment_form_categories WHERE form_id = ?")
        .bind(form.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to clear form categories")?;

    insert_form_categories(conn, form).await
}

async fn insert_form_categories(conn: &mut SqliteConnection, form: &Form) -> Result<()> {
    for fc in &form.categories {
        sqlx::query(
            "INSERT INTO assessment_form_categories (form_id, category_id, order_number) \
             VALUES (?, ?, ?)",
        )
        .bind(form.id.to_string())
        .bind(fc.category_id.to_string())
        .bind(fc.order_number)
        .execute(&mut *conn)
        .await
        .context("Failed to save form category")?;
    }
    Ok(())
}

pub async fn get_form(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    id: FormId,
) -> Result<Option<Form>> {
    let row = sqlx::query(
        "SELECT id, space_id, title FROM assessment_forms WHERE space_id = ? AND id = ?",
    )
    .bind(space_id.to_string())
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch assessment form")?;

    match row {
        Some(row) => {
            let mut form = row_to_form(&row)?;
            form.categories = form_categories(conn, form.id).await?;
            Ok(Some(form))
        }
        None => Ok(None),
    }
}

/// One page of forms matching `search` plus the total number of matches.
pub async fn grid_forms(
    conn: &mut SqliteConnection,
    space_id: SpaceId,
    search: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<(Vec<Form>, i64)> {
    let pattern = like_pattern(search.unwrap_or_default());

    let total: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS count FROM assessment_forms
        WHERE space_id = ? AND title LIKE ? ESCAPE '\'
        "#,
    )
    .bind(space_id.to_string())
    .bind(&pattern)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to count assessment forms")?
    .get("count");

    let rows = sqlx::query(
        r#"
        SELECT id, space_id, title FROM assessment_forms
        WHERE space_id = ? AND title LIKE ? ESCAPE '\'
        ORDER BY title
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(space_id.to_string())
    .bind(&pattern)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to page assessment forms")?;

    let mut forms = rows.iter().map(row_to_form).collect::<Result<Vec<_>>>()?;
    for form in &mut forms {
        form.categories = form_categories(conn, form.id).await?;
    }
    Ok((forms, total))
}

pub async fn list_forms(conn: &mut SqliteConnection, space_id: SpaceId) -> Result<Vec<Form>> {
    let rows = sqlx::query(
        "SELECT id, space_id, title FROM assessment_forms WHERE space_id = ? ORDER BY title",
    )
    .bind(space_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list assessment forms")?;

    let mut forms = rows.iter().map(row_to_form).collect::<Result<Vec<_>>>()?;
    for form in &mut forms {
        form.categories = form_categories(conn, form.id).await?;
    }
    Ok(forms)
}

/// Delete a form with its category links.
pub async fn delete_form(conn: &mut SqliteConnection, id: FormId) -> Result<()> {
    sqlx::query("DELETE FROM assessment_form_categories WHERE form_id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete form categories")?;

    sqlx::query("DELETE FROM assessment_forms WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete assessment form")?;
    Ok(())
}

async fn form_categories(
    conn: &mut SqliteConnection,
    form_id: FormId,
) -> Result<Vec<FormCategory>> {
    let rows = sqlx::query(
        "SELECT category_id, order_number FROM assessment_form_categories WHERE form_id = ? \
         ORDER BY order_number",
    )
    .bind(form_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to fetch form categories")?;

    rows.iter()
        .map(|row| {
            Ok(FormCategory {
                category_id: uuid_col(row, "category_id")?,
                order_number: row.get("order_number"),
            })
        })
        .collect()
}

fn row_to_form(row: &SqliteRow) -> Result<Form> {
    Ok(Form {
        id: uuid_col(row, "id")?,
        space_id: uuid_col(row, "space_id")?,
        title: row.get("title"),
        categories: Vec::new(),
    })
}

// ========================
// Assessments
// ========================

const ASSESSMENT_COLUMNS: &str = "id, resident_id, form_id, date, performed_by, notes, score";

pub async fn insert_assessment(conn: &mut SqliteConnection, assessment: &Assessment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assessments (id, resident_id, form_id, date, performed_by, notes, score)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(assessment.id.to_string())
    .bind(assessment.resident_id.to_string())
    .bind(assessment.form_id.to_string())
    .bind(fmt_date(assessment.date))
    .bind(&assessment.performed_by)
    .bind(&assessment.notes)
    .bind(assessment.score)
    .execute(&mut *conn)
    .await
    .context("Failed to save assessment")?;

    insert_assessment_rows(conn, assessment).await
}

pub async fn update_assessment(conn: &mut SqliteConnection, assessment: &Assessment) -> Result<()> {
    sqlx::query(
        "UPDATE assessments SET form_id = ?, date = ?, performed_by = ?, notes = ?, score = ? \
         WHERE id = ?",
    )
    .bind(assessment.form_id.to_string())
    .bind(fmt_date(assessment.date))
    .bind(&assessment.performed_by)
    .bind(&assessment.notes)
    .bind(assessment.score)
    .bind(assessment.id.to_string())
    .execute(&mut *conn)
    .await
    .context("Failed to update assessment")?;

    sqlx::query("DELETE FROM assessment_assessment_rows WHERE assessment_id = ?")
        .bind(assessment.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to clear assessment rows")?;

    insert_assessment_rows(conn, assessment).await
}

async fn insert_assessment_rows(
    conn: &mut SqliteConnection,
    assessment: &Assessment,
) -> Result<()> {
    for row in &assessment.rows {
        sqlx::query(
            "INSERT INTO assessment_assessment_rows (assessment_id, row_id, score) \
             VALUES (?, ?, ?)",
        )
        .bind(assessment.id.to_string())
        .bind(row.row_id.to_string())
        .bind(row.score)
        .execute(&mut *conn)
        .await
        .context("Failed to save assessment row")?;
    }
    Ok(())
}

pub async fn get_assessment(
    conn: &mut SqliteConnection,
    id: AssessmentId,
) -> Result<Option<Assessment>> {
    let sql = format!("SELECT {} FROM assessments WHERE id = ?", ASSESSMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch assessment")?;

    match row {
        Some(row) => {
            let mut assessment = row_to_assessment(&row)?;
            assessment.rows = assessment_rows(conn, assessment.id).await?;
            Ok(Some(assessment))
        }
        None => Ok(None),
    }
}

pub async fn list_assessments(
    conn: &mut SqliteConnection,
    resident_id: ResidentId,
) -> Result<Vec<Assessment>> {
    let sql = format!(
        "SELECT {} FROM assessments WHERE resident_id = ? ORDER BY date DESC",
        ASSESSMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resident_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list assessments")?;

    let mut assessments = rows.iter().map(row_to_assessment).collect::<Result<Vec<_>>>()?;
    for assessment in &mut assessments {
        assessment.rows = assessment_rows(conn, assessment.id).await?;
    }
    Ok(assessments)
}

pub async fn delete_assessment(conn: &mut SqliteConnection, id: AssessmentId) -> Result<()> {
    sqlx::query("DELETE FROM assessment_assessment_rows WHERE assessment_id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete assessment rows")?;

    sqlx::query("DELETE FROM assessments WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to delete assessment")?;
    Ok(())
}

pub async fn count_assessments_for_form(
    conn: &mut SqliteConnection,
    form_id: FormId,
) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM assessments WHERE form_id = ?")
        .bind(form_id.to_string())
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count assessments")?;
    Ok(row.get("count"))
}

async fn assessment_rows(
    conn: &mut SqliteConnection,
    id: AssessmentId,
) -> Result<Vec<AssessmentRow>> {
    let rows = sqlx::query(
        "SELECT row_id, score FROM assessment_assessment_rows WHERE assessment_id = ?",
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await
    .context("Failed to fetch assessment rows")?;

    rows.iter()
        .map(|row| {
            Ok(AssessmentRow {
                row_id: uuid_col(row, "row_id")?,
                score: row.get("score"),
            })
        })
        .collect()
}

fn row_to_assessment(row: &SqliteRow) -> Result<Assessment> {
    Ok(Assessment {
        id: uuid_col(row, "id")?,
        resident_id: uuid_col(row, "resident_id")?,
        form_id: uuid_col(row, "form_id")?,
        date: date_col(row, "date")?,
        performed_by: row.get("performed_by"),
        notes: row.get("notes"),
        score: row.get("score"),
        rows: Vec::new(),
    })
}
