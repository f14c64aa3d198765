mod common;

use anyhow::Result;
use common::{Residents, date, space, test_admin};
use facility_admin::application::{
    AppError, AssessmentInput, CategoryInput, FacilityAdmin, FormInput, RowInput,
};
use facility_admin::domain::{Category, EntityKind, Form, RowId, TenantContext};
use uuid::Uuid;

fn row_id(category: &Category, title: &str) -> RowId {
    category
        .rows
        .iter()
        .find(|row| row.title == title)
        .map(|row| row.id)
        .expect("row exists")
}

/// Mobility (single select) and Needs (multi select) on one form.
async fn care_form(
    admin: &FacilityAdmin,
    ctx: &TenantContext,
) -> Result<(Form, Category, Category)> {
    let mobility = admin
        .categories
        .add(
            ctx,
            CategoryInput {
                title: "Mobility".into(),
                multi_item: false,
                rows: vec![RowInput::new("Independent", 0.0), RowInput::new("Walker", 2.0)],
            },
        )
        .await?;
    let needs = admin
        .categories
        .add(
            ctx,
            CategoryInput {
                title: "Needs".into(),
                multi_item: true,
                rows: vec![RowInput::new("Bathing", 1.5), RowInput::new("Dressing", 1.0)],
            },
        )
        .await?;
    let form = admin
        .forms
        .add(
            ctx,
            FormInput {
                title: "Care level".into(),
                categories: vec![mobility.id, needs.id],
            },
        )
        .await?;
    Ok((form, mobility, needs))
}

fn assessment(form: &Form, rows: Vec<RowId>) -> AssessmentInput {
    AssessmentInput {
        form_id: form.id,
        date: date("2024-03-01"),
        performed_by: "Nurse Ratched".into(),
        notes: None,
        rows,
    }
}

#[tokio::test]
async fn test_single_select_category_accepts_one_row() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;
    let (form, mobility, _) = care_form(&admin, &ctx).await?;

    let both = vec![row_id(&mobility, "Independent"), row_id(&mobility, "Walker")];
    let err = admin
        .assessments
        .add(&ctx, resident.id, assessment(&form, both))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AssessmentCategoryMultiple(ref title) if title == "Mobility"));
    assert!(admin.assessments.list(&ctx, resident.id).await?.is_empty());

    let saved = admin
        .assessments
        .add(&ctx, resident.id, assessment(&form, vec![row_id(&mobility, "Walker")]))
        .await?;
    assert_eq!(saved.score, 2.0);

    Ok(())
}

#[tokio::test]
async fn test_score_sums_selected_rows() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;
    let (form, mobility, needs) = care_form(&admin, &ctx).await?;

    let rows = vec![
        row_id(&mobility, "Walker"),
        row_id(&needs, "Bathing"),
        row_id(&needs, "Dressing"),
    ];
    let saved = admin.assessments.add(&ctx, resident.id, assessment(&form, rows)).await?;
    assert_eq!(saved.score, 4.5);

    let report = admin.assessments.report(&ctx, saved.id).await?;
    assert_eq!(report.total, 4.5);
    assert_eq!(report.categories.len(), 2);
    assert_eq!(report.categories[0].title, "Mobility");
    assert_eq!(report.categories[0].subtotal, 2.0);
    assert_eq!(report.categories[1].subtotal, 2.5);

    Ok(())
}

#[tokio::test]
async fn test_rows_outside_the_form_are_rejected() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;
    let (form, _, _) = care_form(&admin, &ctx).await?;

    let stray = Uuid::new_v4();
    let err = admin
        .assessments
        .add(&ctx, resident.id, assessment(&form, vec![stray]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RowNotInForm(id) if id == stray));

    Ok(())
}

#[tokio::test]
async fn test_report_keeps_scores_captured_at_save() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;
    let (form, mobility, _) = care_form(&admin, &ctx).await?;
    let walker = row_id(&mobility, "Walker");

    let saved = admin
        .assessments
        .add(&ctx, resident.id, assessment(&form, vec![walker]))
        .await?;

    // Rescore the row afterwards
    admin
        .categories
        .edit(
            &ctx,
            mobility.id,
            CategoryInput {
                title: "Mobility".into(),
                multi_item: false,
                rows: vec![
                    RowInput { id: Some(walker), title: "Walker".into(), score: 5.0 },
                    RowInput::new("Wheelchair", 4.0),
                ],
            },
        )
        .await?;

    let report = admin.assessments.report(&ctx, saved.id).await?;
    assert_eq!(report.total, 2.0);

    let category = admin.categories.get(&ctx, mobility.id).await?;
    assert_eq!(category.rows.len(), 2);
    assert!(category.rows.iter().any(|row| row.id == walker && row.score == 5.0));

    Ok(())
}

#[tokio::test]
async fn test_form_with_unknown_category_is_not_found() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;

    let missing = Uuid::new_v4();
    let err = admin
        .forms
        .add(&ctx, FormInput { title: "Empty".into(), categories: vec![missing] })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::NotFound { entity: EntityKind::Category, id } if id == missing
    ));

    Ok(())
}

#[tokio::test]
async fn test_related_info_for_forms_and_categories() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;
    let (form, mobility, _) = care_form(&admin, &ctx).await?;
    admin
        .assessments
        .add(&ctx, resident.id, assessment(&form, vec![row_id(&mobility, "Walker")]))
        .await?;

    let by_form = admin.forms.related_info(&ctx, &[form.id]).await?;
    assert_eq!(by_form.len(), 1);
    assert_eq!(by_form[0].entity, EntityKind::Assessment);
    assert_eq!(by_form[0].count, 1);

    let by_category = admin.categories.related_info(&ctx, &[mobility.id]).await?;
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].entity, EntityKind::Form);

    Ok(())
}
