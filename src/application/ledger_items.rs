use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::domain::{
    Cents, EntityKind, LedgerId, LedgerItem, LedgerItemId, LedgerItemKind, TenantContext, Validate,
};
use crate::storage::{ledgers, Database};

use super::scope::{nothing_found, require_ledger};
use super::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerItemInput {
    pub kind: LedgerItemKind,
    pub amount: Cents,
    /// Effective date; must fall inside the ledger's month.
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl LedgerItemInput {
    pub fn new(kind: LedgerItemKind, amount: Cents, date: NaiveDate) -> Self {
        Self {
            kind,
            amount,
            date,
            notes: None,
        }
    }
}

/// Expense, credit/discount and payment lines of a single ledger. Every change moves
/// the ledger's balance due by the amount delta.
#[derive(Clone)]
pub struct LedgerItemService {
    db: Database,
}

impl LedgerItemService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        ledger_id: LedgerId,
        kind: Option<LedgerItemKind>,
    ) -> Result<Vec<LedgerItem>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_ledger(&mut conn, ctx, ledger_id).await?;
        Ok(ledgers::list_items(&mut conn, ledger_id, kind).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: LedgerItemId) -> Result<LedgerItem, AppError> {
        let mut conn = self.db.acquire().await?;
        load(&mut conn, ctx, id).await
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        ledger_id: LedgerId,
        input: LedgerItemInput,
    ) -> Result<LedgerItem, AppError> {
        let ctx = ctx.clone();
        let item = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut ledger = require_ledger(conn, &ctx, ledger_id).await?;
                    ledger.check_effective_date(input.date)?;

                    let item = LedgerItem::new(ledger.id, input.kind, input.amount, input.date)
                        .with_notes(input.notes);
                    item.validate()?;
                    ledgers::insert_item(conn, &item).await?;

                    let delta = ledger.apply_item_change(item.kind, 0, item.amount);
                    ledgers::update(conn, &ledger).await?;
                    debug!(
                        ledger_id = %ledger.id,
                        kind = %item.kind,
                        delta,
                        "balance due recalculated"
                    );
                    Ok::<_, AppError>(item)
                })
            })
            .await?;

        info!(
            item_id = %item.id,
            ledger_id = %item.ledger_id,
            kind = %item.kind,
            amount = item.amount,
            "ledger item created"
        );
        Ok(item)
    }

    /// Replace every field of the item. The ledger is recalculated only when the amount
    /// or the kind changed.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: LedgerItemId,
        input: LedgerItemInput,
    ) -> Result<LedgerItem, AppError> {
        let ctx = ctx.clone();
        let item = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut item = load(conn, &ctx, id).await?;
                    let mut ledger = require_ledger(conn, &ctx, item.ledger_id).await?;
                    ledger.check_effective_date(input.date)?;

                    let old_kind = item.kind;
                    let old_amount = item.amount;
                    item.kind = input.kind;
                    item.amount = input.amount;
                    item.date = input.date;
                    item.notes = input.notes;
                    item.validate()?;
                    ledgers::update_item(conn, &item).await?;

                    if old_kind != item.kind {
                        ledger.apply_item_change(old_kind, old_amount, 0);
                        ledger.apply_item_change(item.kind, 0, item.amount);
                        ledgers::update(conn, &ledger).await?;
                    } else if old_amount != item.amount {
                        let delta = ledger.apply_item_change(item.kind, old_amount, item.amount);
                        ledgers::update(conn, &ledger).await?;
                        debug!(ledger_id = %ledger.id, delta, "balance due recalculated");
                    }
                    Ok::<_, AppError>(item)
                })
            })
            .await?;

        info!(item_id = %item.id, "ledger item updated");
        Ok(item)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: LedgerItemId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Remove items and take their amounts back out of their ledgers.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<LedgerItemId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        let item = match load(conn, &ctx, *id).await {
                            Ok(item) => item,
                            Err(err) if err.is_not_found() => continue,
                            Err(err) => return Err(err),
                        };
                        let mut ledger = require_ledger(conn, &ctx, item.ledger_id).await?;
                        ledger.apply_item_change(item.kind, item.amount, 0);
                        ledgers::delete_item(conn, item.id).await?;
                        ledgers::update(conn, &ledger).await?;
                        removed += 1;
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::LedgerItem, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "ledger items removed");
        Ok(())
    }
}

async fn load(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: LedgerItemId,
) -> Result<LedgerItem, AppError> {
    let not_found = AppError::not_found(EntityKind::LedgerItem, id);
    let Some(item) = ledgers::get_item(conn, id).await? else {
        return Err(not_found);
    };
    match require_ledger(conn, ctx, item.ledger_id).await {
        Ok(_) => Ok(item),
        Err(err) if err.is_not_found() => Err(not_found),
        Err(err) => Err(err),
    }
}
