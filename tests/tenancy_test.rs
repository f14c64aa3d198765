mod common;

use anyhow::Result;
use common::{Residents, at, date, space, test_admin};
use facility_admin::application::{
    AppError, DocumentInput, GridQuery, PhysicianInput, ResidentInput, SpaceInput,
};
use facility_admin::domain::{EntityKind, Grants, TenantContext};
use uuid::Uuid;

#[tokio::test]
async fn test_space_changes_need_permission() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = TenantContext::new(Uuid::nil(), Grants::new());

    let err = admin
        .spaces
        .add(&ctx, SpaceInput { name: "North Wing".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(admin.spaces.get_by_name("North Wing").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_space_names_are_unique() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    space(&admin, "North Wing").await?;

    let err = space(&admin, "North Wing").await.unwrap_err();
    let err = err.downcast::<AppError>()?;
    assert!(matches!(err, AppError::Validation { field: "name", .. }));

    Ok(())
}

#[tokio::test]
async fn test_entities_do_not_leak_across_spaces() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let north = space(&admin, "North Wing").await?;
    let south = space(&admin, "South Wing").await?;
    let resident = Residents::admit(&admin, &north, "Doe", "2024-01-01").await?;

    assert!(admin.residents.list(&south).await?.is_empty());
    let err = admin.residents.get(&south, resident.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: EntityKind::Resident, .. }));

    // Child lookups go through the owning resident
    let err = admin
        .ledgers
        .add(&south, resident.id, at("2024-01-01"), Vec::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_row_grants_restrict_residents() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let visible = Residents::admit(&admin, &ctx, "Allen", "2024-01-01").await?;
    let hidden = Residents::admit(&admin, &ctx, "Baker", "2024-01-01").await?;

    let restricted = TenantContext::new(
        ctx.space_id,
        Grants::new().with_entity_ids(EntityKind::Resident, [visible.id]),
    );

    let listed = admin.residents.list(&restricted).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, visible.id);

    let page = admin.residents.grid_select(&restricted, &GridQuery::default()).await?;
    assert_eq!(page.total, 1);

    assert!(admin.residents.get(&restricted, hidden.id).await.unwrap_err().is_not_found());
    assert!(admin.ledgers.list(&restricted, hidden.id).await.unwrap_err().is_not_found());

    // Removing a hidden resident is a not-found and removes nothing
    assert!(admin.residents.remove(&restricted, hidden.id).await.unwrap_err().is_not_found());
    assert_eq!(admin.residents.list(&ctx).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_resident_grid_search_and_pages() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    for last_name in ["Adams", "Baker", "Bakerson", "Carter", "Davis"] {
        Residents::admit(&admin, &ctx, last_name, "2024-01-01").await?;
    }

    let first = admin.residents.grid_select(&ctx, &GridQuery::page(1, 2)).await?;
    assert_eq!(first.total, 5);
    assert_eq!(first.pages(), 3);
    assert_eq!(first.items[0].last_name, "Adams");

    let searched = admin
        .residents
        .grid_select(&ctx, &GridQuery::page(1, 20).with_search("baker"))
        .await?;
    assert_eq!(searched.total, 2);

    // Out-of-range paging is clamped rather than rejected
    let clamped = admin.residents.grid_select(&ctx, &GridQuery::page(0, 0)).await?;
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unknown_physician_is_not_found() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;

    let mut input = ResidentInput::new("Jane", "Doe", date("2024-01-01"));
    input.physician_id = Some(Uuid::new_v4());
    let err = admin.residents.add(&ctx, input).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: EntityKind::Physician, .. }));

    Ok(())
}

#[tokio::test]
async fn test_related_info_counts_dependents() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let physician = admin
        .physicians
        .add(
            &ctx,
            PhysicianInput {
                first_name: "Gregory".into(),
                last_name: "House".into(),
                ..Default::default()
            },
        )
        .await?;

    let mut input = ResidentInput::new("Jane", "Doe", date("2024-01-01"));
    input.physician_id = Some(physician.id);
    let resident = admin.residents.add(&ctx, input).await?;
    admin.ledgers.add(&ctx, resident.id, at("2024-01-01"), Vec::new()).await?;
    admin.ledgers.add(&ctx, resident.id, at("2024-02-01"), Vec::new()).await?;

    let by_physician = admin.physicians.related_info(&ctx, &[physician.id]).await?;
    assert_eq!(by_physician.len(), 1);
    assert_eq!(by_physician[0].entity, EntityKind::Resident);
    assert_eq!(by_physician[0].count, 1);

    let by_resident = admin.residents.related_info(&ctx, &[resident.id]).await?;
    let ledgers = by_resident
        .iter()
        .find(|info| info.entity == EntityKind::ResidentLedger)
        .expect("ledger count");
    assert_eq!(ledgers.count, 2);

    let by_space = admin.spaces.related_info(&ctx, &[ctx.space_id]).await?;
    assert!(by_space.iter().any(|info| info.entity == EntityKind::Resident && info.count == 1));

    Ok(())
}

#[tokio::test]
async fn test_removing_resident_removes_owned_records() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-01-01", 100000).await?;
    let ledger = admin.ledgers.add(&ctx, resident.id, at("2024-01-01"), Vec::new()).await?;

    admin.residents.remove(&ctx, resident.id).await?;

    assert!(admin.ledgers.get(&ctx, ledger.id).await.unwrap_err().is_not_found());
    assert!(admin.residents.related_info(&ctx, &[resident.id]).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_remove_bulk_with_only_unknown_ids_fails() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let kept = Residents::admit(&admin, &ctx, "Doe", "2024-01-01").await?;

    let err = admin
        .residents
        .remove_bulk(&ctx, vec![Uuid::new_v4(), Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(admin.residents.get(&ctx, kept.id).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_physician_and_document_grids_honour_grants() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;

    let mut physicians = Vec::new();
    for last_name in ["House", "Wilson"] {
        let input = PhysicianInput {
            first_name: "Greg".into(),
            last_name: last_name.into(),
            ..Default::default()
        };
        physicians.push(admin.physicians.add(&ctx, input).await?);
    }
    let mut documents = Vec::new();
    for title in ["Care plan", "Intake form"] {
        let input = DocumentInput { title: title.into(), ..Default::default() };
        documents.push(admin.documents.add(&ctx, input, None).await?);
    }

    let restricted = TenantContext::new(
        ctx.space_id,
        Grants::new()
            .with_entity_ids(EntityKind::Physician, [physicians[0].id])
            .with_entity_ids(EntityKind::Document, [documents[1].id]),
    );

    let page = admin.physicians.grid_select(&restricted, &GridQuery::default()).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, physicians[0].id);
    assert_eq!(admin.physicians.list(&restricted).await?.len(), 1);

    let page = admin.documents.grid_select(&restricted, &GridQuery::default()).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, documents[1].id);

    // An empty grant hides everything
    let nothing = TenantContext::new(
        ctx.space_id,
        Grants::new().with_entity_ids(EntityKind::Physician, Vec::<Uuid>::new()),
    );
    let page = admin.physicians.grid_select(&nothing, &GridQuery::default()).await?;
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());

    let page = admin.physicians.grid_select(&ctx, &GridQuery::default()).await?;
    assert_eq!(page.total, 2);

    Ok(())
}
