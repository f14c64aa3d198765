use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{
    Contract, ContractId, ContractType, EntityKind, ResidentId, TenantContext, Validate,
};
use crate::storage::{contracts, Database};

use super::scope::{nothing_found, require_resident, resident_visible};
use super::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInput {
    pub contract_type: ContractType,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl ContractInput {
    pub fn new(contract_type: ContractType, start: NaiveDate) -> Self {
        Self {
            contract_type,
            start,
            end: None,
            options: serde_json::Value::Null,
        }
    }
}

#[derive(Clone)]
pub struct ContractService {
    db: Database,
}

impl ContractService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
    ) -> Result<Vec<Contract>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(contracts::list_for_resident(&mut conn, resident_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: ContractId) -> Result<Contract, AppError> {
        let mut conn = self.db.acquire().await?;
        load(&mut conn, ctx, id).await
    }

    /// The resident's active contract, if any.
    pub async fn active(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
    ) -> Result<Option<Contract>, AppError> {
        let mut conn = self.db.acquire().await?;
        require_resident(&mut conn, ctx, resident_id).await?;
        Ok(contracts::get_active(&mut conn, resident_id).await?)
    }

    /// Fails with `ContractAlreadyExists` while the resident has an active contract,
    /// whatever the type or options of the new one.
    pub async fn add(
        &self,
        ctx: &TenantContext,
        resident_id: ResidentId,
        input: ContractInput,
    ) -> Result<Contract, AppError> {
        let ctx = ctx.clone();
        let contract = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    require_resident(conn, &ctx, resident_id).await?;
                    if contracts::get_active(conn, resident_id).await?.is_some() {
                        return Err(AppError::ContractAlreadyExists(resident_id));
                    }
                    let mut contract = Contract::new(resident_id, input.contract_type, input.start);
                    contract.end = input.end;
                    contract.options = input.options;
                    contract.validate()?;
                    contracts::insert(conn, &contract).await?;
                    Ok::<_, AppError>(contract)
                })
            })
            .await?;

        info!(
            contract_id = %contract.id,
            resident_id = %resident_id,
            kind = %contract.contract_type,
            "contract created"
        );
        Ok(contract)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: ContractId,
        input: ContractInput,
    ) -> Result<Contract, AppError> {
        let ctx = ctx.clone();
        let contract = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut contract = load(conn, &ctx, id).await?;
                    contract.contract_type = input.contract_type;
                    contract.start = input.start;
                    contract.end = input.end;
                    contract.options = input.options;
                    contract.validate()?;
                    if contract.is_active() {
                        match contracts::get_active(conn, contract.resident_id).await? {
                            Some(active) if active.id != contract.id => {
                                return Err(AppError::ContractAlreadyExists(contract.resident_id));
                            }
                            _ => {}
                        }
                    }
                    contracts::update(conn, &contract).await?;
                    Ok::<_, AppError>(contract)
                })
            })
            .await?;

        info!(contract_id = %contract.id, "contract updated");
        Ok(contract)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: ContractId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<ContractId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = 0;
                    for id in &ids {
                        match load(conn, &ctx, *id).await {
                            Ok(contract) => {
                                contracts::delete(conn, contract.id).await?;
                                removed += 1;
                            }
                            Err(err) if err.is_not_found() => continue,
                            Err(err) => return Err(err),
                        }
                    }
                    if removed == 0 {
                        return Err(nothing_found(EntityKind::Contract, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed, "contracts removed");
        Ok(())
    }
}

async fn load(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: ContractId,
) -> Result<Contract, AppError> {
    let not_found = AppError::not_found(EntityKind::Contract, id);
    let Some(contract) = contracts::get(conn, id).await? else {
        return Err(not_found);
    };
    if !resident_visible(conn, ctx, contract.resident_id).await? {
        return Err(not_found);
    }
    Ok(contract)
}
