use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::{EntityKind, Space, SpaceId, TenantContext, Validate, MANAGE_SPACES};
use crate::storage::{spaces, Database};

use super::scope::{check_permission, nothing_found};
use super::{AppError, RelatedInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceInput {
    pub name: String,
}

/// Tables whose rows belong to a space, reported by `related_info`.
const SPACE_OWNED: &[(&str, EntityKind)] = &[
    ("residents", EntityKind::Resident),
    ("physicians", EntityKind::Physician),
    ("medications", EntityKind::Medication),
    ("documents", EntityKind::Document),
    ("base_rates", EntityKind::BaseRate),
    ("assessment_forms", EntityKind::Form),
    ("assessment_categories", EntityKind::Category),
];

#[derive(Clone)]
pub struct SpaceService {
    db: Database,
}

impl SpaceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Spaces visible to the caller.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Space>, AppError> {
        let mut conn = self.db.acquire().await?;
        let all = spaces::list(&mut conn).await?;
        Ok(all
            .into_iter()
            .filter(|space| ctx.allows(EntityKind::Space, space.id))
            .collect())
    }

    pub async fn get(&self, ctx: &TenantContext, id: SpaceId) -> Result<Space, AppError> {
        let not_found = AppError::not_found(EntityKind::Space, id);
        if !ctx.allows(EntityKind::Space, id) {
            return Err(not_found);
        }
        let mut conn = self.db.acquire().await?;
        spaces::get(&mut conn, id).await?.ok_or(not_found)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Space>, AppError> {
        let mut conn = self.db.acquire().await?;
        Ok(spaces::get_by_name(&mut conn, name).await?)
    }

    pub async fn add(&self, ctx: &TenantContext, input: SpaceInput) -> Result<Space, AppError> {
        check_permission(ctx, MANAGE_SPACES)?;

        let space = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let space = Space::new(input.name.trim());
                    space.validate()?;
                    ensure_unique_name(conn, &space).await?;
                    spaces::insert(conn, &space).await?;
                    Ok::<_, AppError>(space)
                })
            })
            .await?;

        info!(space_id = %space.id, name = %space.name, "space created");
        Ok(space)
    }

    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: SpaceId,
        input: SpaceInput,
    ) -> Result<Space, AppError> {
        check_permission(ctx, MANAGE_SPACES)?;
        let ctx = ctx.clone();

        let space = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut space = load(conn, &ctx, id).await?;
                    space.name = input.name.trim().to_string();
                    space.validate()?;
                    ensure_unique_name(conn, &space).await?;
                    spaces::update(conn, &space).await?;
                    Ok::<_, AppError>(space)
                })
            })
            .await?;

        info!(space_id = %space.id, "space updated");
        Ok(space)
    }

    /// Remove a space and, through cascades, everything it owns.
    pub async fn remove(&self, ctx: &TenantContext, id: SpaceId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<SpaceId>,
    ) -> Result<(), AppError> {
        check_permission(ctx, MANAGE_SPACES)?;
        let ctx = ctx.clone();

        let removed = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut removed = Vec::new();
                    for id in &ids {
                        if !ctx.allows(EntityKind::Space, *id) {
                            continue;
                        }
                        if spaces::get(conn, *id).await?.is_some() {
                            spaces::delete(conn, *id).await?;
                            removed.push(*id);
                        }
                    }
                    if removed.is_empty() {
                        return Err(nothing_found(EntityKind::Space, &ids));
                    }
                    Ok::<_, AppError>(removed)
                })
            })
            .await?;

        info!(count = removed.len(), "spaces removed");
        Ok(())
    }

    /// Entities owned by each of the given spaces.
    pub async fn related_info(
        &self,
        ctx: &TenantContext,
        ids: &[SpaceId],
    ) -> Result<Vec<RelatedInfo>, AppError> {
        let mut conn = self.db.acquire().await?;
        let mut related = Vec::new();
        for id in ids {
            if !ctx.allows(EntityKind::Space, *id) || spaces::get(&mut conn, *id).await?.is_none() {
                continue;
            }
            for (table, entity) in SPACE_OWNED {
                let count = spaces::count_owned(&mut conn, table, *id).await?;
                if count > 0 {
                    related.push(RelatedInfo::new(*id, *entity, count));
                }
            }
        }
        Ok(related)
    }
}

async fn load(
    conn: &mut sqlx::SqliteConnection,
    ctx: &TenantContext,
    id: Uuid,
) -> Result<Space, AppError> {
    let not_found = AppError::not_found(EntityKind::Space, id);
    if !ctx.allows(EntityKind::Space, id) {
        return Err(not_found);
    }
    spaces::get(conn, id).await?.ok_or(not_found)
}

async fn ensure_unique_name(
    conn: &mut sqlx::SqliteConnection,
    space: &Space,
) -> Result<(), AppError> {
    match spaces::get_by_name(conn, &space.name).await? {
        Some(existing) if existing.id != space.id => Err(AppError::Validation {
            field: "name",
            message: format!("space '{}' already exists", space.name),
        }),
        _ => Ok(()),
    }
}
