use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    validate_selection, Assessment, AssessmentId, AssessmentReport, Category, CategoryId,
    EntityKind, Form, FormId, ResidentId, Row, RowId, TenantContext, Validate,
};
use crate::storage::{assessments, Database};

use super::scope::{nothing_found, require_resident, resident_visible};
use super::{AppError, GridQuery, Page, RelatedInfo};

// ========================
// Categories
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowInput {
    /// Id of an existing row to keep; `None` creates a new row.
    pub id: Option<RowId>,
    pub title: String,
    pub score: f64,
}

impl RowInput {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            id: None,
            title: title.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub title: String,
    pub multi_item: bool,
    pub rows: Vec<RowInput>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Database,
}

impl CategoryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Category>, AppError> {
        let mut conn = self.db.acquire().await?;
        Ok(assessments::list_categories(&mut conn, ctx.space_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: CategoryId) -> Result<Category, AppError> {
        let mut conn = self.db.acquire().await?;
        assessments::get_category(&mut conn, ctx.space_id, id)
            .await?
            .ok_or(AppError::not_found(EntityKind::Category, id))
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        input: CategoryInput,
    ) -> Result<Category, AppError> {
        let space_id = ctx.space_id;
        let category = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut category =
                        Category::new(space_id, input.title.trim(), input.multi_item);
                    let category_id = category.id;
                    category.rows = input
                        .rows
                        .into_iter()
                        .map(|row| Row::new(category_id, row.title, row.score))
                        .collect();
                    category.validate()?;
                    assessments::insert_category(conn, &category).await?;
                    Ok::<_, AppError>(category)
                })
            })
            .await?;

        info!(
            category_id = %category.id,
            rows = category.rows.len(),
            "assessment category created"
        );
        Ok(category)
    }

    /// Replace the category. Rows given with a known id are updated in place, other rows
    /// are created, and rows left out are removed.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category, AppError> {
        let space_id = ctx.space_id;
        let category = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut category = assessments::get_category(conn, space_id, id)
                        .await?
                        .ok_or(AppError::not_found(EntityKind::Category, id))?;
                    let existing: Vec<RowId> = category.rows.iter().map(|row| row.id).collect();

                    category.title = input.title.trim().to_string();
                    category.multi_item = input.multi_item;
                    category.rows = input
                        .rows
                        .into_iter()
                        .map(|row| match row.id {
                            Some(row_id) if existing.contains(&row_id) => Row {
                                id: row_id,
                                category_id: id,
                                title: row.title,
                                score: row.score,
                            },
                            _ => Row::new(id, row.title, row.score),
                        })
                        .collect();
                    category.validate()?;
                    assessments::update_category(conn, &category).await?;
                    Ok::<_, AppError>(category)
                })
            })
            .await?;

        info!(category_id = %category.id, "assessment category updated");
        Ok(category)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: CategoryId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Remove categories with their rows and form links.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<CategoryId>,
    ) -> Result<(), AppError> {
        let space_id = ctx.space_id;
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let found = assessments::get_categories(conn, space_id, &ids).await?;
                    if found.is_empty() {
                        return Err(nothing_found(EntityKind::Category, &ids));
                    }
                    for category in &found {
                        assessments::delete_category(conn, category.id).await?;
                    }
                    Ok::<_, AppError>(found.len())
                })
            })
            .await?;

        info!(count = removed, "assessment categories removed");
        Ok(())
    }

    /// Forms that include each category.
    pub async fn related_info(
        &self,
        ctx: &TenantContext,
        ids: &[CategoryId],
    ) -> Result<Vec<RelatedInfo>, AppError> {
        let mut conn = self.db.acquire().await?;
        let found = assessments::get_categories(&mut conn, ctx.space_id, ids).await?;
        let mut related = Vec::new();
        for category in &found {
            let count = assessments::count_forms_with_category(&mut conn, category.id).await?;
            if count > 0 {
                related.push(RelatedInfo::new(category.id, EntityKind::Form, count));
            }
        }
        Ok(related)
    }
}

// ========================
// Forms
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInput {
    pub title: String,
    /// Categories in display order.
    pub categories: Vec<CategoryId>,
}

#[derive(Clone)]
pub struct FormService {
    db: Database,
}

impl FormService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Form>, AppError> {
        let mut conn = self.db.acquire().await?;
        Ok(assessments::list_forms(&mut conn, ctx.space_id).await?)
    }

    pub async fn grid_select(
        &self,
        ctx: &TenantContext,
        query: &GridQuery,
    ) -> Result<Page<Form>, AppError> {
        let (limit, offset) = query.pagination.limit_offset();
        let mut conn = self.db.acquire().await?;
        let (items, total) = assessments::grid_forms(
            &mut conn,
            ctx.space_id,
            query.search_term(),
            limit,
            offset,
        )
        .await?;
        Ok(Page::new(items, total, query.pagination))
    }

    pub async fn get(&self, ctx: &TenantContext, id: FormId) -> Result<Form, AppError> {
        let mut conn = self.db.acquire().await?;
        require_form(&mut conn, ctx, id).await
    }

    pub async fn add(&self, ctx: &TenantContext, input: FormInput) -> Result<Form, AppError> {
        let ctx = ctx.clone();
        let form = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let form = Form::new(ctx.space_id, input.title.trim(), &input.categories);
                    form.validate()?;
                    check_categories(conn, &ctx, &input.categories).await?;
                    assessments::insert_form(conn, &form).await?;
                    Ok::<_, AppError>(form)
                })
            })
            .await?;

        info!(form_id = %form.id, categories = form.categories.len(), "assessment form created");
        Ok(form)
    }

    /// Replace the title and the ordered category list.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: FormId,
        input: FormInput,
    ) -> Result<Form, AppError> {
        let ctx = ctx.clone();
        let form = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut form = require_form(conn, &ctx, id).await?;
                    form.title = input.title.trim().to_string();
                    form.set_categories(&input.categories);
                    form.validate()?;
                    check_categories(conn, &ctx, &input.categories).await?;
                    assessments::update_form(conn, &form).await?;
                    Ok::<_, AppError>(form)
                })
            })
            .await?;

        info!(form_id = %form.id, "assessment form updated");
        Ok(form)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: FormId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(&self, ctx: &TenantContext, ids: Vec<FormId>) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        if assessments::get_form(conn, ctx.space_id, *id).await?.is_some() {
                            assessments::delete_form(conn, *id).await?;
                            removed += 1;
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::Form, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "assessment forms removed");
        Ok(())
    }

    /// Assessments filled in with each form.
    pub async fn related_info(
        &self,
        ctx: &TenantContext,
        ids: &[FormId],
    ) -> Result<Vec<RelatedInfo>, AppError> {
        let mut conn = self.db.acquire().await?;
        let mut related = Vec::new();
        for id in ids {
            if assessments::get_form(&mut conn, ctx.space_id, *id).await?.is_none() {
                continue;
            }
            let count = assessments::count_assessments_for_form(&mut conn, *id).await?;
            if count > 0 {
                related.push(RelatedInfo::new(*id, EntityKind::Assessment, count));
            }
        }
        Ok(related)
    }
}

async fn require_form(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: FormId,
) -> Result<Form, AppError> {
    assessments::get_form(conn, ctx.space_id, id)
        .await?
        .ok_or(AppError::not_found(EntityKind::Form, id))
}

async fn check_categories(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    ids: &[CategoryId],
) -> Result<(), AppError> {
    let found = assessments::get_categories(conn, ctx.space_id, ids).await?;
    match ids.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
        Some(missing) => Err(AppError::not_found(EntityKind::Category, *missing)),
        None => Ok(()),
    }
}

/// The form and its categories, rows included.
async fn load_form_tree(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    form_id: FormId,
) -> Result<(Form, Vec<Category>), AppError> {
    let form = require_form(conn, ctx, form_id).await?;
    let ids: Vec<Uuid> = form.categories.iter().map(|fc| fc.category_id).collect();
    let categories = assessments::get_categories(conn, ctx.space_id, &ids).await?;
    Ok((form, categories))
}

// ========================
// Assessments
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub form_id: FormId,
    pub date: NaiveDate,
    pub performed_by: String,
    pub notes: Option<String>,
    /// Selected rows of the form.
    pub rows: Vec<RowId>,
}

#[derive(Clone)]
pub struct AssessmentService {
    db: Database,
}

impl AssessmentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
    ) -> Result<Vec<Assessment>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(assessments::list_assessments(&mut conn, resident_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: AssessmentId) -> Result<Assessment, AppError> {
        let mut conn = self.db.acquire().await?;
        load(&mut conn, ctx, id).await
    }

    /// Save an assessment. The selection must respect the form's categories; the score
    /// is the report total.
    pub async fn add(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        input: AssessmentInput,
    ) -> Result<Assessment, AppError> {
        let ctx = ctx.clone();
        let assessment = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    require_resident(conn, &ctx, resident_id).await?;
                    let mut assessment = Assessment::new(
                        resident_id,
                        input.form_id,
                        input.date,
                        input.performed_by.trim(),
                    );
                    assessment.notes = input.notes;
                    assessment.validate()?;
                    score(conn, &ctx, &mut assessment, &input.rows).await?;
                    assessments::insert_assessment(conn, &assessment).await?;
                    Ok::<_, AppError>(assessment)
                })
            })
            .await?;

        info!(
            assessment_id = %assessment.id,
            resident_id = %resident_id,
            score = assessment.score,
            "assessment created"
        );
        Ok(assessment)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: AssessmentId,
        input: AssessmentInput,
    ) -> Result<Assessment, AppError> {
        let ctx = ctx.clone();
        let assessment = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut assessment = load(conn, &ctx, id).await?;
                    assessment.form_id = input.form_id;
                    assessment.date = input.date;
                    assessment.performed_by = input.performed_by.trim().to_string();
                    assessment.notes = input.notes;
                    assessment.validate()?;
                    score(conn, &ctx, &mut assessment, &input.rows).await?;
                    assessments::update_assessment(conn, &assessment).await?;
                    Ok::<_, AppError>(assessment)
                })
            })
            .await?;

        info!(assessment_id = %assessment.id, score = assessment.score, "assessment updated");
        Ok(assessment)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: AssessmentId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<AssessmentId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        match load(conn, &ctx, *id).await {
                            Ok(assessment) => {
                                assessments::delete_assessment(conn, assessment.id).await?;
                                removed += 1;
                            }
                            Err(err) if err.is_not_found() => continue,
                            Err(err) => return Err(err),
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::Assessment, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "assessments removed");
        Ok(())
    }

    /// Scored table of a saved assessment, using the scores captured when it was saved.
    pub async fn report(
        &self,
        ctx: &TenantContext,
        id: AssessmentId,
    ) -> Result<AssessmentReport, AppError> {
        let mut conn = self.db.acquire().await?;
        let assessment = load(&mut conn, ctx, id).await?;
        let (form, categories) = load_form_tree(&mut conn, ctx, assessment.form_id).await?;
        Ok(AssessmentReport::build(&form, &categories, &assessment.rows))
    }
}

/// Validate the selection against the form and store rows and total score.
async fn score(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    assessment: &mut Assessment,
    selected: &[RowId],
) -> Result<(), AppError> {
    let (form, categories) = load_form_tree(conn, ctx, assessment.form_id).await?;
    let rows = validate_selection(&form, &categories, selected)?;
    let report = AssessmentReport::build(&form, &categories, &rows);
    assessment.rows = rows;
    assessment.score = report.total;
    Ok(())
}

async fn load(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: AssessmentId,
) -> Result<Assessment, AppError> {
    let not_found = AppError::not_found(EntityKind::Assessment, id);
    let Some(assessment) = assessments::get_assessment(conn, id).await? else {
        return Err(not_found);
    };
    if !resident_visible(conn, ctx, assessment.resident_id).await? {
        return Err(not_found);
    }
    Ok(assessment)
}
