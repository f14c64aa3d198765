//! Tenant-scoped lookups shared by the services. Anything outside the caller's space or
//! row grants is reported as not found.

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{EntityKind, LedgerId, Resident, ResidentId, ResidentLedger, TenantContext};
use crate::storage::{ledgers, residents};

use super::AppError;

pub(crate) async fn require_resident(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: ResidentId,
) -> Result<Resident, AppError> {
    if !ctx.allows(EntityKind::Resident, id) {
        return Err(AppError::not_found(EntityKind::Resident, id));
    }
    residents::get(conn, ctx.space_id, id)
        .await?
        .ok_or(AppError::not_found(EntityKind::Resident, id))
}

/// Whether the resident is visible to the caller.
pub(crate) async fn resident_visible(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: ResidentId,
) -> Result<bool, AppError> {
    if !ctx.allows(EntityKind::Resident, id) {
        return Ok(false);
    }
    Ok(residents::get(conn, ctx.space_id, id).await?.is_some())
}

pub(crate) async fn require_ledger(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    id: LedgerId,
) -> Result<ResidentLedger, AppError> {
    let not_found = AppError::not_found(EntityKind::ResidentLedger, id);
    let Some(ledger) = ledgers::get(conn, id).await? else {
        return Err(not_found);
    };
    if !resident_visible(conn, ctx, ledger.resident_id).await? {
        return Err(not_found);
    }
    Ok(ledger)
}

/// Error for an empty bulk selection: names the first requested id.
pub(crate) fn nothing_found(entity: EntityKind, ids: &[Uuid]) -> AppError {
    AppError::not_found(entity, ids.first().copied().unwrap_or_default())
}

pub(crate) fn check_permission(ctx: &TenantContext, permission: &str) -> Result<(), AppError> {
    if ctx.has_permission(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("missing permission '{}'", permission)))
    }
}
