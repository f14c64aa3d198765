use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{
    Cents, EntityKind, PhysicianId, RentId, RentPeriod, Resident, ResidentId, ResidentRent,
    TenantContext, Validate,
};
use crate::storage::{directory, residents, Database};

use super::scope::{nothing_found, require_resident, resident_visible};
use super::{AppError, GridQuery, Page, RelatedInfo};

/// Editable fields of a resident. `edit` replaces all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentInput {
    pub first_name: String,
    pub last_name: String,
    pub physician_id: Option<PhysicianId>,
    pub admitted_on: NaiveDate,
    pub discharged_on: Option<NaiveDate>,
}

impl ResidentInput {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        admitted_on: NaiveDate,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            physician_id: None,
            admitted_on,
            discharged_on: None,
        }
    }
}

/// Resident-owned tables, reported by `related_info`.
const RESIDENT_OWNED: &[(&str, EntityKind)] = &[
    ("resident_rents", EntityKind::ResidentRent),
    ("contracts", EntityKind::Contract),
    ("resident_ledgers", EntityKind::ResidentLedger),
    ("adjustment_items", EntityKind::AdjustmentItem),
    ("assessments", EntityKind::Assessment),
];

#[derive(Clone)]
pub struct ResidentService {
    db: Database,
}

impl ResidentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Resident>, AppError> {
        let grant = ctx.grant_filter(EntityKind::Resident);
        let mut conn = self.db.acquire().await?;
        Ok(residents::list(&mut conn, ctx.space_id, grant.as_deref()).await?)
    }

    pub async fn grid_select(
        &self,
        ctx: &TenantContext,
        query: &GridQuery,
    ) -> Result<Page<Resident>, AppError> {
        let grant = ctx.grant_filter(EntityKind::Resident);
        let (limit, offset) = query.pagination.limit_offset();
        let mut conn = self.db.acquire().await?;
        let (items, total) = residents::grid(
            &mut conn,
            ctx.space_id,
            grant.as_deref(),
            query.search_term(),
            limit,
            offset,
        )
        .await?;
        Ok(Page::new(items, total, query.pagination))
    }

    pub async fn get(&self, ctx: &TenantContext, id: ResidentId) -> Result<Resident, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, id).await
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        input: ResidentInput,
    ) -> Result<Resident, AppError> {
        let ctx = ctx.clone();
        let resident = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut resident = Resident::new(
                        ctx.space_id,
                        input.first_name,
                        input.last_name,
                        input.admitted_on,
                    );
                    resident.discharged_on = input.discharged_on;
                    resident.physician_id = input.physician_id;
                    check_physician(conn, &ctx, resident.physician_id).await?;
                    resident.validate()?;
                    residents::insert(conn, &resident).await?;
                    Ok::<_, AppError>(resident)
                })
            })
            .await?;

        info!(resident_id = %resident.id, space_id = %resident.space_id, "resident created");
        Ok(resident)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: ResidentId,
        input: ResidentInput,
    ) -> Result<Resident, AppError> {
        let ctx = ctx.clone();
        let resident = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut resident = require_resident(conn, &ctx, id).await?;
                    resident.first_name = input.first_name;
                    resident.last_name = input.last_name;
                    resident.physician_id = input.physician_id;
                    resident.admitted_on = input.admitted_on;
                    resident.discharged_on = input.discharged_on;
                    check_physician(conn, &ctx, resident.physician_id).await?;
                    resident.validate()?;
                    residents::update(conn, &resident).await?;
                    Ok::<_, AppError>(resident)
                })
            })
            .await?;

        info!(resident_id = %resident.id, "resident updated");
        Ok(resident)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: ResidentId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Remove residents together with their rents, contracts, ledgers, adjustments and
    /// assessments.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<ResidentId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let grant = ctx.grant_filter(EntityKind::Resident);
                    let found =
                        residents::get_many(conn, ctx.space_id, &ids, grant.as_deref()).await?;
                    if found.is_empty() {
                        return Err(nothing_found(EntityKind::Resident, &ids));
                    }
                    for resident in &found {
                        residents::delete(conn, resident.id).await?;
                    }
                    Ok::<_, AppError>(found.len())
                })
            })
            .await?;

        info!(count = removed, "residents removed");
        Ok(())
    }

    pub async fn related_info(
        &self,
        ctx: &TenantContext,
        ids: &[ResidentId],
    ) -> Result<Vec<RelatedInfo>, AppError> {
        let grant = ctx.grant_filter(EntityKind::Resident);
        let mut conn = self.db.acquire().await?;
        let found = residents::get_many(&mut conn, ctx.space_id, ids, grant.as_deref()).await?;

        let mut related = Vec::new();
        for resident in &found {
            for (table, entity) in RESIDENT_OWNED {
                let count = residents::count_owned(&mut conn, table, resident.id).await?;
                if count > 0 {
                    related.push(RelatedInfo::new(resident.id, *entity, count));
                }
            }
        }
        Ok(related)
    }
}

async fn check_physician(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    physician_id: Option<PhysicianId>,
) -> Result<(), AppError> {
    let Some(id) = physician_id else {
        return Ok(());
    };
    if directory::get_physician(conn, ctx.space_id, id).await?.is_none() {
        return Err(AppError::not_found(EntityKind::Physician, id));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentInput {
    pub period: RentPeriod,
    pub amount: Cents,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RentInput {
    pub fn monthly(amount: Cents, start: NaiveDate) -> Self {
        Self {
            period: RentPeriod::Monthly,
            amount,
            start,
            end: None,
            notes: None,
        }
    }
}

/// Room rents of a resident, the input of ledger proration.
#[derive(Clone)]
pub struct ResidentRentService {
    db: Database,
}

impl ResidentRentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
    ) -> Result<Vec<ResidentRent>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(residents::list_rents(&mut conn, resident_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: RentId) -> Result<ResidentRent, AppError> {
        let mut conn = self.db.acquire().await?;
        load_rent(&mut conn, ctx, id).await
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        input: RentInput,
    ) -> Result<ResidentRent, AppError> {
        let ctx = ctx.clone();
        let rent = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    require_resident(conn, &ctx, resident_id).await?;
                    let mut rent =
                        ResidentRent::new(resident_id, input.period, input.amount, input.start);
                    rent.end = input.end;
                    rent.notes = input.notes;
                    rent.validate()?;
                    residents::insert_rent(conn, &rent).await?;
                    Ok::<_, AppError>(rent)
                })
            })
            .await?;

        info!(
            rent_id = %rent.id,
            resident_id = %rent.resident_id,
            amount = rent.amount,
            "rent created"
        );
        Ok(rent)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: RentId,
        input: RentInput,
    ) -> Result<ResidentRent, AppError> {
        let ctx = ctx.clone();
        let rent = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut rent = load_rent(conn, &ctx, id).await?;
                    rent.period = input.period;
                    rent.amount = input.amount;
                    rent.start = input.start;
                    rent.end = input.end;
                    rent.notes = input.notes;
                    rent.validate()?;
                    residents::update_rent(conn, &rent).await?;
                    Ok::<_, AppError>(rent)
                })
            })
            .await?;

        info!(rent_id = %rent.id, "rent updated");
        Ok(rent)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: RentId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(&self, ctx: &TenantContext, ids: Vec<RentId>) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        match load_rent(conn, &ctx, *id).await {
                            Ok(rent) => {
                                residents::delete_rent(conn, rent.id).await?;
                                removed += 1;
                            }
                            Err(err) if err.is_not_found() => continue,
                            Err(err) => return Err(err),
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::ResidentRent, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "rents removed");
        Ok(())
    }
}

async fn load_rent(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: RentId,
) -> Result<ResidentRent, AppError> {
    let not_found = AppError::not_found(EntityKind::ResidentRent, id);
    let Some(rent) = residents::get_rent(conn, id).await? else {
        return Err(not_found);
    };
    if !resident_visible(conn, ctx, rent.resident_id).await? {
        return Err(not_found);
    }
    Ok(rent)
}
