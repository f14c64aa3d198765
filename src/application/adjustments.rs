use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::domain::{
    AdjustmentId, AdjustmentItem, AdjustmentKind, Cents, EntityKind, ResidentId,
    TenantContext, Validate,
};
use crate::storage::{adjustments, ledgers, Database};

use super::scope::{nothing_found, require_resident, resident_visible};
use super::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentInput {
    pub kind: AdjustmentKind,
    pub amount: Cents,
    /// Snapped to the first day of its month.
    pub start: NaiveDate,
    /// Snapped to the last day of its month.
    pub end: NaiveDate,
    pub notes: Option<String>,
}

impl AdjustmentInput {
    pub fn new(kind: AdjustmentKind, amount: Cents, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            kind,
            amount,
            start,
            end,
            notes: None,
        }
    }
}

/// Resident credits and discounts. Each one lowers the private-pay balance of every
/// ledger whose month falls inside its range.
#[derive(Clone)]
pub struct ResidentAdjustmentService {
    db: Database,
}

impl ResidentAdjustmentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        kind: AdjustmentKind,
    ) -> Result<Vec<AdjustmentItem>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(adjustments::list_for_resident(&mut conn, resident_id, kind).await?)
    }

    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: AdjustmentId,
    ) -> Result<AdjustmentItem, AppError> {
        let mut conn = self.db.acquire().await?;
        load(&mut conn, ctx, id).await
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        input: AdjustmentInput,
    ) -> Result<AdjustmentItem, AppError> {
        let ctx = ctx.clone();
        let item = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    require_resident(conn, &ctx, resident_id).await?;
                    let mut item = AdjustmentItem::new(
                        resident_id,
                        input.kind,
                        input.amount,
                        input.start,
                        input.end,
                    );
                    item.notes = input.notes;
                    item.validate()?;
                    adjustments::insert(conn, &item).await?;
                    recalculate(conn, &item, 0, item.amount).await?;
                    Ok::<_, AppError>(item)
                })
            })
            .await?;

        info!(
            adjustment_id = %item.id,
            resident_id = %item.resident_id,
            kind = %item.kind,
            amount = item.amount,
            "adjustment created"
        );
        Ok(item)
    }

    /// Replace every field. With an unchanged range the ledgers get a single
    /// `old -> new` pass; a moved range is reverted on the old months and applied on
    /// the new ones.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: AdjustmentId,
        input: AdjustmentInput,
    ) -> Result<AdjustmentItem, AppError> {
        let ctx = ctx.clone();
        let item = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut item = load(conn, &ctx, id).await?;
                    let previous = item.clone();

                    item.kind = input.kind;
                    item.amount = input.amount;
                    item.set_range(input.start, input.end);
                    item.notes = input.notes;
                    item.validate()?;
                    adjustments::update(conn, &item).await?;

                    if previous.months() == item.months() {
                        if previous.amount != item.amount {
                            recalculate(conn, &item, previous.amount, item.amount).await?;
                        }
                    } else {
                        recalculate(conn, &previous, previous.amount, 0).await?;
                        recalculate(conn, &item, 0, item.amount).await?;
                    }
                    Ok::<_, AppError>(item)
                })
            })
            .await?;

        info!(adjustment_id = %item.id, amount = item.amount, "adjustment updated");
        Ok(item)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: AdjustmentId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<AdjustmentId>,
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
                        adjustments::delete(conn, item.id).await?;
                        recalculate(conn, &item, item.amount, 0).await?;
                        removed += 1;
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::AdjustmentItem, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "adjustments removed");
        Ok(())
    }
}

/// Apply an `old -> new` amount change to every ledger of the resident inside the
/// item's range. Returns the number of ledgers touched.
async fn recalculate(
    conn: &mut SqliteConnection,
    item: &AdjustmentItem,
    old: Cents,
    new: Cents,
) -> Result<usize, AppError> {
    let (from, to) = item.months();
    let affected = ledgers::list_in_months(conn, item.resident_id, from, to).await?;
    let count = affected.len();
    for mut ledger in affected {
        let delta = ledger.apply_adjustment_change(old, new);
        ledgers::update(conn, &ledger).await?;
        debug!(
            ledger_id = %ledger.id,
            month = %ledger.month,
            delta,
            "private pay balance recalculated"
        );
    }
    Ok(count)
}

async fn load(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: AdjustmentId,
) -> Result<AdjustmentItem, AppError> {
    let not_found = AppError::not_found(EntityKind::AdjustmentItem, id);
    let Some(item) = adjustments::get(conn, id).await? else {
        return Err(not_found);
    };
    if !resident_visible(conn, ctx, item.resident_id).await? {
        return Err(not_found);
    }
    Ok(item)
}
