mod common;

use anyhow::Result;
use common::{Residents, at, date, space, test_admin};
use facility_admin::application::{AppError, GridQuery, LedgerItemInput, RentInput};
use facility_admin::domain::{LedgerItemKind, MonthKey, PaymentSource};

#[tokio::test]
async fn test_ledger_amount_is_monthly_rent() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;

    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-05"), Vec::new())
        .await?;

    assert_eq!(ledger.month, MonthKey::new(2024, 3).unwrap());
    assert_eq!(ledger.amount, 100000);
    assert_eq!(ledger.balance_due, 100000);
    assert_eq!(ledger.private_pay_balance_due, 100000);

    Ok(())
}

#[tokio::test]
async fn test_second_ledger_for_same_month_is_rejected() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;

    admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;
    let err = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-28"), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ResidentLedgerAlreadyExists { .. }));
    assert_eq!(admin.ledgers.list(&ctx, resident.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_missing_previous_ledger_carries_rent_forward() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-01-01", 100000).await?;

    // February has no ledger: its rent lands in March's balance
    let march = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;
    assert_eq!(march.amount, 100000);
    assert_eq!(march.balance_due, 200000);

    // March exists now, so April starts clean
    let april = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-04-01"), Vec::new())
        .await?;
    assert_eq!(april.balance_due, 100000);

    Ok(())
}

#[tokio::test]
async fn test_mid_month_admission_is_prorated() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::admit(&admin, &ctx, "Doe", "2024-03-22").await?;
    admin
        .rents
        .add(&ctx, resident.id, RentInput::monthly(310000, date("2024-03-01")))
        .await?;

    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-25"), Vec::new())
        .await?;

    // 10 of 31 days
    assert_eq!(ledger.amount, 100000);

    Ok(())
}

#[tokio::test]
async fn test_item_sign_rules() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::Expense, 2500, date("2024-03-10")),
        )
        .await?;
    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 102500);

    admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::CreditDiscount, 500, date("2024-03-11")),
        )
        .await?;
    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 103000);

    let payment = admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::PaymentReceived, 60000, date("2024-03-15")),
        )
        .await?;
    admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(
                LedgerItemKind::NotPrivatePayPaymentReceived,
                40000,
                date("2024-03-16"),
            ),
        )
        .await?;

    let after = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(after.balance_due, 3000);
    // Ledger items never touch the private-pay balance
    assert_eq!(after.private_pay_balance_due, 100000);

    // Lower the payment: less paid, more due
    admin
        .ledger_items
        .edit(
            &ctx,
            payment.id,
            LedgerItemInput::new(LedgerItemKind::PaymentReceived, 50000, date("2024-03-15")),
        )
        .await?;
    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 13000);

    admin.ledger_items.remove(&ctx, payment.id).await?;
    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 63000);

    Ok(())
}

#[tokio::test]
async fn test_item_kind_change_reverts_and_reapplies() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    let item = admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::Expense, 1000, date("2024-03-02")),
        )
        .await?;
    admin
        .ledger_items
        .edit(
            &ctx,
            item.id,
            LedgerItemInput::new(LedgerItemKind::PaymentReceived, 1000, date("2024-03-02")),
        )
        .await?;

    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 99000);

    let stored = admin.ledger_items.get(&ctx, item.id).await?;
    assert_eq!(stored.kind, LedgerItemKind::PaymentReceived);
    let payments = admin
        .ledger_items
        .list(&ctx, ledger.id, Some(LedgerItemKind::PaymentReceived))
        .await?;
    assert_eq!(payments.len(), 1);

    // Removing reverses the payment, not the original expense
    admin.ledger_items.remove(&ctx, item.id).await?;
    assert_eq!(admin.ledgers.get(&ctx, ledger.id).await?.balance_due, 100000);

    Ok(())
}

#[tokio::test]
async fn test_effective_date_must_be_in_ledger_month() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    let err = admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::Expense, 1000, date("2024-04-01")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidEffectiveDate { .. }));

    let unchanged = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(unchanged.balance_due, 100000);
    assert!(admin.ledger_items.list(&ctx, ledger.id, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_items_by_kind() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    for (kind, amount) in [
        (LedgerItemKind::Expense, 100),
        (LedgerItemKind::Expense, 200),
        (LedgerItemKind::PaymentReceived, 300),
    ] {
        admin
            .ledger_items
            .add(&ctx, ledger.id, LedgerItemInput::new(kind, amount, date("2024-03-05")))
            .await?;
    }

    let expenses = admin
        .ledger_items
        .list(&ctx, ledger.id, Some(LedgerItemKind::Expense))
        .await?;
    assert_eq!(expenses.len(), 2);
    assert_eq!(admin.ledger_items.list(&ctx, ledger.id, None).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_edit_replaces_sources_without_touching_balances() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;

    let sources = vec![
        PaymentSource { name: "Private pay".into(), amount: 40000 },
        PaymentSource { name: "Medicaid".into(), amount: 60000 },
    ];
    let edited = admin.ledgers.edit(&ctx, ledger.id, sources.clone()).await?;
    assert_eq!(edited.sources, sources);

    let stored = admin.ledgers.get(&ctx, ledger.id).await?;
    assert_eq!(stored.sources, sources);
    assert_eq!(stored.balance_due, ledger.balance_due);

    Ok(())
}

#[tokio::test]
async fn test_remove_ledger_removes_items() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-03-01", 100000).await?;
    let ledger = admin
        .ledgers
        .add(&ctx, resident.id, at("2024-03-01"), Vec::new())
        .await?;
    let item = admin
        .ledger_items
        .add(
            &ctx,
            ledger.id,
            LedgerItemInput::new(LedgerItemKind::Expense, 100, date("2024-03-05")),
        )
        .await?;

    admin.ledgers.remove(&ctx, ledger.id).await?;

    assert!(admin.ledgers.get(&ctx, ledger.id).await.unwrap_err().is_not_found());
    assert!(admin.ledger_items.get(&ctx, item.id).await.unwrap_err().is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_ledger_grid_is_paged_newest_first() -> Result<()> {
    let (admin, _temp, _blobs) = test_admin().await?;
    let ctx = space(&admin, "North Wing").await?;
    let resident = Residents::with_rent(&admin, &ctx, "Doe", "2024-01-01", 100000).await?;
    for day in ["2024-01-01", "2024-02-01", "2024-03-01"] {
        admin.ledgers.add(&ctx, resident.id, at(day), Vec::new()).await?;
    }

    let page = admin
        .ledgers
        .grid_select(&ctx, resident.id, &GridQuery::page(1, 2))
        .await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.pages(), 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].month, MonthKey::new(2024, 3).unwrap());

    let last = admin
        .ledgers
        .grid_select(&ctx, resident.id, &GridQuery::page(2, 2))
        .await?;
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].month, MonthKey::new(2024, 1).unwrap());

    Ok(())
}
