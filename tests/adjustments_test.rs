mod common;

use anyhow::Result;
use common::{Residents, at, date, space, test_admin};
use facility_admin::application::{AdjustmentInput, AppError};
use facility_admin::domain::{AdjustmentKind, EntityKind};
use uuid::Uuid;

#[tokio::test]
async fn test_discount_lifecycle_moves_private_pay_balance() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;
    assert_eq!(ledger.amount, 100000);
    let baseline = ledger.private_pay_balance_due;

    let discount = admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(
                AdjustmentKind::Discount,
                5000,
                date("2024-03-01"),
                date("2024-03-31"),
            ),
        )
        .await?;
    let after_add = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(after_add.private_pay_balance_due, baseline - 5000);

    admin
        .adjustments
        .edit(
            &ctx,
            discount.id,
            AdjustmentInput::new(
                AdjustmentKind::Discount,
                7500,
                date("2024-03-01"),
                date("2024-03-31"),
            ),
        )
        .await?;
    let after_edit = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(after_edit.private_pay_balance_due, baseline - 7500);

    admin.adjustments.remove(&ctx, discount.id).await?;
    let after_remove = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(after_remove.private_pay_balance_due, baseline);

    // Adjustments never move the balance due
    assert_eq!(after_remove.balance_due, ledger.balance_due);

    Ok(())
}

#[tokio::test]
async fn test_credit_applies_to_every_ledger_in_range() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-01-01", 100000).await?;
    let mut ledgers = Vec::new();
    for day in ["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01"] {
        ledgers.push(admin.ledgers.add(&ctx, resident.id, at(day), Vec::new()).await?);
    }

    // Mid-month dates cover whole months
    admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(
                AdjustmentKind::Credit,
                1000,
                date("2024-02-15"),
                date("2024-03-10"),
            ),
        )
        .await?;

    let changed: Vec<i64> = {
        let mut out = Vec::new();
        for ledger in &ledgers {
            let current = admin.ledgers.get(&ctx, ledger.id).await?;
            out.push(ledger.private_pay_balance_due - current.private_pay_balance_due);
        }
        out
    };
    assert_eq!(changed, vec![0, 1000, 1000, 0]);

    Ok(())
}

#[tokio::test]
async fn test_moving_the_range_reverts_old_months() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-02-01", 100000).await?;
    let february = admin.ledgers.add(&ctx, resident.id, at("2024-02-01"), Vec::new()).await?;
    let march = admin.ledgers.add(&ctx, resident.id, at("2024-03-01"), Vec::new()).await?;

    let credit = admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(
                AdjustmentKind::Credit,
                2000,
                date("2024-02-01"),
                date("2024-02-29"),
            ),
        )
        .await?;
    assert_eq!(
        admin.ledgers.get(&ctx, february.id).await?.private_pay_balance_due,
        february.private_pay_balance_due - 2000
    );

    admin
        .adjustments
        .edit(
            &ctx,
            credit.id,
            AdjustmentInput::new(
                AdjustmentKind::Credit,
                3000,
                date("2024-03-01"),
                date("2024-03-31"),
            ),
        )
        .await?;

    assert_eq!(
        admin.ledgers.get(&ctx, february.id).await?.private_pay_balance_due,
        february.private_pay_balance_due
    );
    assert_eq!(
        admin.ledgers.get(&ctx, march.id).await?.private_pay_balance_due,
        march.private_pay_balance_due - 3000
    );

    Ok(())
}

#[tokio::test]
async fn test_reversed_range_is_rejected_before_saving() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;

    let err = admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(
                AdjustmentKind::Discount,
                500,
                date("2024-05-01"),
                date("2024-03-01"),
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StartGreaterEndDate));
    assert!(admin.adjustments.list(&ctx, resident.id, AdjustmentKind::Discount).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_filters_by_kind() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;

    for kind in [AdjustmentKind::Credit, AdjustmentKind::Discount, AdjustmentKind::Discount] {
        admin
            .adjustments
            .add(
                &ctx,
                resident.id,
                AdjustmentInput::new(kind, 100, date("2024-03-01"), date("2024-03-31")),
            )
            .await?;
    }

    let discounts = admin
        .adjustments
        .list(&ctx, resident.id, AdjustmentKind::Discount)
        .await?;
    assert_eq!(discounts.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_remove_bulk_skips_missing_ids() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let credit = admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(
                AdjustmentKind::Credit,
                100,
                date("2024-03-01"),
                date("2024-03-31"),
            ),
        )
        .await?;

    admin
        .adjustments
        .remove_bulk(&ctx, vec![Uuid::new_v4(), credit.id])
        .await?;
    assert!(admin.adjustments.get(&ctx, credit.id).await.unwrap_err().is_not_found());

    let missing = Uuid::new_v4();
    let err = admin.adjustments.remove_bulk(&ctx, vec![missing]).await.unwrap_err();
    match err {
        AppError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::AdjustmentItem);
            assert_eq!(id, missing);
        }
        other => panic!("unexpected error: {other}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_edit_replaces_the_kind() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    let range = (date("2024-03-01"), date("2024-03-31"));
    let credit = admin
        .adjustments
        .add(
            &ctx,
            resident.id,
            AdjustmentInput::new(AdjustmentKind::Credit, 2500, range.0, range.1),
        )
        .await?;
    let edited = admin
        .adjustments
        .edit(
            &ctx,
            credit.id,
            AdjustmentInput::new(AdjustmentKind::Discount, 2500, range.0, range.1),
        )
        .await?;
    assert_eq!(edited.kind, AdjustmentKind::Discount);

    let stored = admin.adjustments.get(&ctx, credit.id).await?;
    assert_eq!(stored.kind, AdjustmentKind::Discount);
    assert!(
        admin
            .adjustments
            .list(&ctx, resident.id, AdjustmentKind::Credit)
            .await?
            .is_empty()
    );
    assert_eq!(
        admin
            .adjustments
            .list(&ctx, resident.id, AdjustmentKind::Discount)
            .await?
            .len(),
        1
    );

    // Same months and amount: the ledger keeps a single 25.00 reduction
    assert_eq!(
        admin.ledgers.get(&ctx, ledger.id).await?.private_pay_balance_due,
        ledger.private_pay_balance_due - 2500
    );

    Ok(())
}
