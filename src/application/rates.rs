use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{BaseRate, BaseRateId, Cents, EntityKind, TenantContext, Validate};
use crate::storage::{rates, Database};

use super::scope::nothing_found;
use super::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRateInput {
    pub care_level: String,
    pub date: NaiveDate,
    pub amount: Cents,
}

#[derive(Clone)]
pub struct BaseRateService {
    db: Database,
}

impl BaseRateService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<BaseRate>, AppError> {
        let mut conn = self.db.acquire().await?;
        Ok(rates::list(&mut conn, ctx.space_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: BaseRateId) -> Result<BaseRate, AppError> {
        let mut conn = self.db.acquire().await?;
        rates::get(&mut conn, ctx.space_id, id)
            .await?
            .ok_or(AppError::not_found(EntityKind::BaseRate, id))
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        input: BaseRateInput,
    ) -> Result<BaseRate, AppError> {
        let space_id = ctx.space_id;
        let rate = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let rate =
                        BaseRate::new(space_id, input.care_level.trim(), input.date, input.amount);
                    rate.validate()?;
                    ensure_unique_date(conn, &rate).await?;
                    rates::insert(conn, &rate).await?;
                    Ok::<_, AppError>(rate)
                })
            })
            .await?;

        info!(
            rate_id = %rate.id,
            care_level = %rate.care_level,
            date = %rate.date,
            "base rate created"
        );
        Ok(rate)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: BaseRateId,
        input: BaseRateInput,
    ) -> Result<BaseRate, AppError> {
        let space_id = ctx.space_id;
        let rate = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut rate = rates::get(conn, space_id, id)
                        .await?
                        .ok_or(AppError::not_found(EntityKind::BaseRate, id))?;
                    rate.care_level = input.care_level.trim().to_string();
                    rate.date = input.date;
                    rate.amount = input.amount;
                    rate.validate()?;
                    ensure_unique_date(conn, &rate).await?;
                    rates::update(conn, &rate).await?;
                    Ok::<_, AppError>(rate)
                })
            })
            .await?;

        info!(rate_id = %rate.id, "base rate updated");
        Ok(rate)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: BaseRateId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<BaseRateId>,
    ) -> Result<(), AppError> {
        let space_id = ctx.space_id;
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        if rates::get(conn, space_id, *id).await?.is_some() {
                            rates::delete(conn, *id).await?;
                            removed += 1;
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::BaseRate, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "base rates removed");
        Ok(())
    }
}

async fn ensure_unique_date(conn: &mut SqliteConnection, rate: &BaseRate) -> Result<(), AppError> {
    if rates::find_by_date(conn, rate.space_id, &rate.care_level, rate.date, Some(rate.id))
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateBaseRateByDate {
            care_level: rate.care_level.clone(),
            date: rate.date,
        });
    }
    Ok(())
}
