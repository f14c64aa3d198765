use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    EntityKind, Medication, MedicationId, Physician, PhysicianId, TenantContext, Validate,
};
use crate::storage::{directory, residents, Database};

use super::scope::nothing_found;
use super::{AppError, GridQuery, Page, RelatedInfo};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicianInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct PhysicianService {
    db: Database,
}

impl PhysicianService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Physician>, AppError> {
        let mut conn = self.db.acquire().await?;
        let all = directory::list_physicians(&mut conn, ctx.space_id).await?;
        Ok(all
            .into_iter()
            .filter(|p| ctx.allows(EntityKind::Physician, p.id))
            .collect())
    }

    pub async fn grid_select(
        &self,
        ctx: &TenantContext,
        query: &GridQuery,
    ) -> Result<Page<Physician>, AppError> {
        let (limit, offset) = query.pagination.limit_offset();
        let grant = ctx.grant_filter(EntityKind::Physician);
        let mut conn = self.db.acquire().await?;
        let (items, total) = directory::grid_physicians(
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

    pub async fn get(&self, ctx: &TenantContext, id: PhysicianId) -> Result<Physician, AppError> {
        let not_found = AppError::not_found(EntityKind::Physician, id);
        if !ctx.allows(EntityKind::Physician, id) {
            return Err(not_found);
        }
        let mut conn = self.db.acquire().await?;
        directory::get_physician(&mut conn, ctx.space_id, id)
            .await?
            .ok_or(not_found)
    }

    pub async fn add(
        &self,
        ctx: &TenantContext,
        input: PhysicianInput,
    ) -> Result<Physician, AppError> {
        let space_id = ctx.space_id;
        let physician = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut physician = Physician::new(space_id, input.first_name, input.last_name);
                    physician.phone = input.phone;
                    physician.email = input.email;
                    physician.validate()?;
                    directory::insert_physician(conn, &physician).await?;
                    Ok::<_, AppError>(physician)
                })
            })
            .await?;

        info!(physician_id = %physician.id, "physician created");
        Ok(physician)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: PhysicianId,
        input: PhysicianInput,
    ) -> Result<Physician, AppError> {
        let ctx = ctx.clone();
        let physician = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let not_found = AppError::not_found(EntityKind::Physician, id);
                    if !ctx.allows(EntityKind::Physician, id) {
                        return Err(not_found);
                    }
                    let mut physician = directory::get_physician(conn, ctx.space_id, id)
                        .await?
                        .ok_or(not_found)?;
                    physician.first_name = input.first_name;
                    physician.last_name = input.last_name;
                    physician.phone = input.phone;
                    physician.email = input.email;
                    physician.validate()?;
                    directory::update_physician(conn, &physician).await?;
                    Ok::<_, AppError>(physician)
                })
            })
            .await?;

        info!(physician_id = %physician.id, "physician updated");
        Ok(physician)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: PhysicianId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Residents referencing a removed physician keep their record with no physician.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<PhysicianId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let allowed: Vec<_> = ids
                        .iter()
                        .copied()
                        .filter(|id| ctx.allows(EntityKind::Physician, *id))
                        .collect();
                    let found = directory::get_physicians(conn, ctx.space_id, &allowed).await?;
                    if found.is_empty() {
                        return Err(nothing_found(EntityKind::Physician, &ids));
                    }
                    for physician in &found {
                        directory::delete_physician(conn, physician.id).await?;
                    }
                    Ok::<_, AppError>(found.len())
                })
            })
            .await?;

        info!(count = removed, "physicians removed");
        Ok(())
    }

    /// Residents referencing each physician.
    pub async fn related_info(
        &self,
        ctx: &TenantContext,
        ids: &[PhysicianId],
    ) -> Result<Vec<RelatedInfo>, AppError> {
        let mut conn = self.db.acquire().await?;
        let found = directory::get_physicians(&mut conn, ctx.space_id, ids).await?;
        let mut related = Vec::new();
        for physician in &found {
            let count = residents::count_by_physician(&mut conn, physician.id).await?;
            if count > 0 {
                related.push(RelatedInfo::new(physician.id, EntityKind::Resident, count));
            }
        }
        Ok(related)
    }
}

#[derive(Clone)]
pub struct MedicationService {
    db: Database,
}

impl MedicationService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Medication>, AppError> {
        let mut conn = self.db.acquire().await?;
        Ok(directory::list_medications(&mut conn, ctx.space_id).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: MedicationId) -> Result<Medication, AppError> {
        let mut conn = self.db.acquire().await?;
        directory::get_medication(&mut conn, ctx.space_id, id)
            .await?
            .ok_or(AppError::not_found(EntityKind::Medication, id))
    }

    pub async fn add(&self, ctx: &TenantContext, title: String) -> Result<Medication, AppError> {
        let space_id = ctx.space_id;
        let medication = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let medication = Medication::new(space_id, title.trim());
                    medication.validate()?;
                    directory::insert_medication(conn, &medication).await?;
                    Ok::<_, AppError>(medication)
                })
            })
            .await?;

        info!(medication_id = %medication.id, "medication created");
        Ok(medication)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: MedicationId,
        title: String,
    ) -> Result<Medication, AppError> {
        let space_id = ctx.space_id;
        let medication = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut medication = directory::get_medication(conn, space_id, id)
                        .await?
                        .ok_or(AppError::not_found(EntityKind::Medication, id))?;
                    medication.title = title.trim().to_string();
                    medication.validate()?;
                    directory::update_medication(conn, &medication).await?;
                    Ok::<_, AppError>(medication)
                })
            })
            .await?;

        info!(medication_id = %medication.id, "medication updated");
        Ok(medication)
    }

    pub async fn remove(&self, ctx: &TenantContext, id: MedicationId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<MedicationId>,
    ) -> Result<(), AppError> {
        let space_id = ctx.space_id;
        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let found = directory::get_medications(conn, space_id, &ids).await?;
                    if found.is_empty() {
                        return Err(nothing_found(EntityKind::Medication, &ids));
                    }
                    for medication in &found {
                        directory::delete_medication(conn, medication.id).await?;
                    }
                    Ok::<_, AppError>(found.len())
                })
            })
            .await?;

        info!(count = removed, "medications removed");
        Ok(())
    }
}
