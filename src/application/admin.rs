use std::sync::Arc;

use crate::config::Settings;
use crate::domain::{DailyProration, RentProration};
use crate::storage::{BlobStore, Database, FsBlobStore};

use super::{
    AppError, AssessmentService, BaseRateService, CategoryService, ContractService, DocumentService,
    FormService, LedgerItemService, MedicationService, PhysicianService, ResidentAdjustmentService,
    ResidentLedgerService, ResidentRentService, ResidentService, SpaceService,
};

/// Every service of the back office, sharing one database and blob store.
#[derive(Clone)]
pub struct FacilityAdmin {
    pub spaces: SpaceService,
    pub residents: ResidentService,
    pub rents: ResidentRentService,
    pub base_rates: BaseRateService,
    pub physicians: PhysicianService,
    pub medications: MedicationService,
    pub documents: DocumentService,
    pub contracts: ContractService,
    pub ledgers: ResidentLedgerService,
    pub ledger_items: LedgerItemService,
    pub adjustments: ResidentAdjustmentService,
    pub forms: FormService,
    pub categories: CategoryService,
    pub assessments: AssessmentService,
    db: Database,
}

impl FacilityAdmin {
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>, proration: Arc<dyn RentProration>) -> Self {
        Self {
            spaces: SpaceService::new(db.clone()),
            residents: ResidentService::new(db.clone()),
            rents: ResidentRentService::new(db.clone()),
            base_rates: BaseRateService::new(db.clone()),
            physicians: PhysicianService::new(db.clone()),
            medications: MedicationService::new(db.clone()),
            documents: DocumentService::new(db.clone(), blobs),
            contracts: ContractService::new(db.clone()),
            ledgers: ResidentLedgerService::new(db.clone(), proration),
            ledger_items: LedgerItemService::new(db.clone()),
            adjustments: ResidentAdjustmentService::new(db.clone()),
            forms: FormService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            assessments: AssessmentService::new(db.clone()),
            db,
        }
    }

    /// Open (creating and migrating if needed) the configured database and blob directory.
    pub async fn init(settings: &Settings) -> Result<Self, AppError> {
        let blobs = Arc::new(FsBlobStore::new(settings.blob_dir.clone()));
        Self::init_with(&settings.database_path(), blobs).await
    }

    /// Open the database at `path` with the given blob store and day-based proration.
    pub async fn init_with(path: &str, blobs: Arc<dyn BlobStore>) -> Result<Self, AppError> {
        let db = Database::init(path).await?;
        Ok(Self::new(db, blobs, Arc::new(DailyProration)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
