use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{
    Cents, EntityKind, LedgerId, MonthKey, PaymentSource, RentProration, Resident, ResidentId,
    ResidentLedger, ResidentRent, TenantContext, Validate,
};
use crate::storage::{ledgers, residents, Database};

use super::scope::{nothing_found, require_ledger, require_resident};
use super::{AppError, GridQuery, Page};

/// Rent charged to the resident for `month`: every rent clipped to the resident's stay,
/// prorated over the month.
pub fn rent_amount(
    proration: &dyn RentProration,
    resident: &Resident,
    rents: &[ResidentRent],
    month: MonthKey,
) -> Cents {
    let stay = resident.stay();
    rents
        .iter()
        .filter_map(|rent| {
            stay.intersect(&rent.interval())
                .map(|interval| proration.calculate(interval, rent.period, rent.amount, month))
        })
        .map(|charge| charge.amount)
        .sum()
}

/// Monthly resident ledgers.
#[derive(Clone)]
pub struct ResidentLedgerService {
    db: Database,
    proration: Arc<dyn RentProration>,
}

impl ResidentLedgerService {
    pub fn new(db: Database, proration: Arc<dyn RentProration>) -> Self {
        Self { db, proration }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
    ) -> Result<Vec<ResidentLedger>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(ledgers::list_for_resident(&mut conn, resident_id).await?)
    }

    /// Ledgers of a resident, newest month first.
    pub async fn grid_select(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        query: &GridQuery,
    ) -> Result<Page<ResidentLedger>, AppError> {
        let (limit, offset) = query.pagination.limit_offset();
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        let (items, total) =
            ledgers::grid_for_resident(&mut conn, resident_id, limit, offset).await?;
        Ok(Page::new(items, total, query.pagination))
    }

    pub async fn get(&self, ctx: &TenantContext, id: LedgerId) -> Result<ResidentLedger, AppError> {
        let mut conn = self.db.acquire().await?;
        require_ledger(&mut conn, ctx, id).await
    }

    pub async fn get_by_month(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        month: MonthKey,
    ) -> Result<Option<ResidentLedger>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(ledgers::get_by_month(&mut conn, resident_id, month).await?)
    }

    /// Create the ledger for the month of `created_at`.
    ///
    /// The amount is the prorated rent of the month. When the previous month has no
    /// ledger, its rent is carried into the balance due once.
    pub async fn add(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        created_at: DateTime<Utc>,
        sources: Vec<PaymentSource>,
    ) -> Result<ResidentLedger, AppError> {
        let ctx = ctx.clone();
        let proration = Arc::clone(&self.proration);
        let ledger = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let resident = require_resident(conn, &ctx, resident_id).await?;
                    let month = MonthKey::of(created_at.date_naive());
                    if ledgers::get_by_month(conn, resident_id, month).await?.is_some() {
                        return Err(AppError::ResidentLedgerAlreadyExists { resident_id, month });
                    }

                    let rents = residents::list_rents(conn, resident_id).await?;
                    let amount = rent_amount(proration.as_ref(), &resident, &rents, month);

                    let previous = month.previous();
                    let carry = match ledgers::get_by_month(conn, resident_id, previous).await? {
                        Some(_) => None,
                        None => Some(rent_amount(proration.as_ref(), &resident, &rents, previous)),
                    };
                    debug!(
                        %resident_id,
                        %month,
                        amount,
                        carry = carry.unwrap_or(0),
                        "ledger amounts computed"
                    );

                    let ledger = ResidentLedger::new(resident_id, created_at, amount, carry)
                        .with_sources(sources);
                    ledger.validate()?;
                    ledgers::insert(conn, &ledger).await?;
                    Ok::<_, AppError>(ledger)
                })
            })
            .await?;

        info!(
            ledger_id = %ledger.id,
            resident_id = %ledger.resident_id,
            month = %ledger.month,
            balance_due = ledger.balance_due,
            "resident ledger created"
        );
        Ok(ledger)
    }

    /// Replace the payment-source list. Balances are left untouched.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: LedgerId,
        sources: Vec<PaymentSource>,
    ) -> Result<ResidentLedger, AppError> {
        let ctx = ctx.clone();
        let ledger = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut ledger = require_ledger(conn, &ctx, id).await?;
                    ledger.sources = sources;
                    ledger.validate()?;
                    ledgers::update(conn, &ledger).await?;
                    Ok::<_, AppError>(ledger)
                })
            })
            .await?;

        info!(ledger_id = %ledger.id, "resident ledger updated");
        Ok(ledger)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: LedgerId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Remove ledgers together with their items.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<LedgerId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        match require_ledger(conn, &ctx, *id).await {
                            Ok(ledger) => {
                                let items =
                                    ledgers::delete_items_for_ledger(conn, ledger.id).await?;
                                ledgers::delete(conn, ledger.id).await?;
                                debug!(ledger_id = %ledger.id, items, "ledger deleted");
                                removed += 1;
                            }
                            Err(err) if err.is_not_found() => continue,
                            Err(err) => return Err(err),
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::ResidentLedger, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "resident ledgers removed");
        Ok(())
    }
}
