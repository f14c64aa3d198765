//! Per-entity services. Every call takes an explicit
//! [`TenantContext`](crate::domain::TenantContext); mutations run inside
//! [`Database::transaction`](crate::storage::Database::transaction).

mod admin;
mod adjustments;
mod assessments;
mod contracts;
mod directory;
mod documents;
mod error;
mod grid;
mod ledger_items;
mod ledgers;
mod rates;
mod residents;
mod scope;
mod spaces;

pub use admin::FacilityAdmin;
pub use adjustments::{AdjustmentInput, ResidentAdjustmentService};
pub use assessments::{
    AssessmentInput, AssessmentService, CategoryInput, CategoryService, FormInput, FormService,
    RowInput,
};
pub use contracts::{ContractInput, ContractService};
pub use directory::{MedicationService, PhysicianInput, PhysicianService};
pub use documents::{DocumentInput, DocumentService, FileUpload};
pub use error::AppError;
pub use grid::{GridQuery, Page, Pagination};
pub use ledger_items::{LedgerItemInput, LedgerItemService};
pub use ledgers::{rent_amount, ResidentLedgerService};
pub use rates::{BaseRateInput, BaseRateService};
pub use residents::{RentInput, ResidentInput, ResidentRentService, ResidentService};
pub use spaces::{SpaceInput, SpaceService};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::EntityKind;

/// How many `entity` rows reference the entity `id`; shown before a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub id: Uuid,
    pub entity: EntityKind,
    pub count: i64,
}

impl RelatedInfo {
    pub fn new(id: Uuid, entity: EntityKind, count: i64) -> Self {
        Self { id, entity, count }
    }
}
