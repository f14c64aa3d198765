use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::SpaceId;

/// Permission that allows creating, editing and removing spaces.
pub const MANAGE_SPACES: &str = "manage-spaces";

/// Every entity type the services expose. Used for row grants and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Space,
    Resident,
    ResidentRent,
    BaseRate,
    Physician,
    Medication,
    Document,
    Contract,
    ResidentLedger,
    LedgerItem,
    AdjustmentItem,
    Form,
    Category,
    Row,
    Assessment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Space => "space",
            EntityKind::Resident => "resident",
            EntityKind::ResidentRent => "resident rent",
            EntityKind::BaseRate => "base rate",
            EntityKind::Physician => "physician",
            EntityKind::Medication => "medication",
            EntityKind::Document => "document",
            EntityKind::Contract => "contract",
            EntityKind::ResidentLedger => "resident ledger",
            EntityKind::LedgerItem => "ledger item",
            EntityKind::AdjustmentItem => "adjustment item",
            EntityKind::Form => "assessment form",
            EntityKind::Category => "assessment category",
            EntityKind::Row => "assessment row",
            EntityKind::Assessment => "assessment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Permission names plus row-level grants of the current user.
///
/// An entity kind without an entry in `entities` is unrestricted; an entry limits the user
/// to the listed ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    permissions: HashSet<String>,
    entities: HashMap<EntityKind, HashSet<Uuid>>,
}

impl Grants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.permissions.insert(name.into());
        self
    }

    pub fn with_entity_ids(
        mut self,
        kind: EntityKind,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        self.entities.entry(kind).or_default().extend(ids);
        self
    }

    pub fn has(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn entity_ids(&self, kind: EntityKind) -> Option<&HashSet<Uuid>> {
        self.entities.get(&kind)
    }
}

/// Tenant scope of a single call: the current space and what the caller may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub space_id: SpaceId,
    pub grants: Grants,
}

impl TenantContext {
    pub fn new(space_id: SpaceId, grants: Grants) -> Self {
        Self { space_id, grants }
    }

    /// Context with every permission and no row restrictions.
    pub fn full_access(space_id: SpaceId) -> Self {
        Self::new(space_id, Grants::new().with_permission(MANAGE_SPACES))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.grants.has(permission)
    }

    /// Whether row grants let the caller see the entity with `id`.
    pub fn allows(&self, kind: EntityKind, id: Uuid) -> bool {
        self.grants
            .entity_ids(kind)
            .is_none_or(|ids| ids.contains(&id))
    }

    /// Row grant filter for queries: `None` means unrestricted.
    pub fn grant_filter(&self, kind: EntityKind) -> Option<Vec<Uuid>> {
        self.grants
            .entity_ids(kind)
            .map(|ids| ids.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_kind_allows_everything() {
        let ctx = TenantContext::new(Uuid::new_v4(), Grants::new());
        assert!(ctx.allows(EntityKind::Resident, Uuid::new_v4()));
        assert!(ctx.grant_filter(EntityKind::Resident).is_none());
        assert!(!ctx.has_permission(MANAGE_SPACES));
    }

    #[test]
    fn test_row_grants_limit_ids() {
        let visible = Uuid::new_v4();
        let grants = Grants::new().with_entity_ids(EntityKind::Resident, [visible]);
        let ctx = TenantContext::new(Uuid::new_v4(), grants);

        assert!(ctx.allows(EntityKind::Resident, visible));
        assert!(!ctx.allows(EntityKind::Resident, Uuid::new_v4()));
        assert!(ctx.allows(EntityKind::Physician, Uuid::new_v4()));
        assert_eq!(ctx.grant_filter(EntityKind::Resident), Some(vec![visible]));
    }

    #[test]
    fn test_full_access_can_manage_spaces() {
        let ctx = TenantContext::full_access(Uuid::new_v4());
        assert!(ctx.has_permission(MANAGE_SPACES));
    }
}
