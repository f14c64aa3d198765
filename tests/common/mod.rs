// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use facility_admin::application::{FacilityAdmin, RentInput, ResidentInput, SpaceInput};
use facility_admin::domain::{Resident, TenantContext};
use facility_admin::storage::MemoryBlobStore;
use tempfile::TempDir;

/// Helper to create the services over a temporary database and an in-memory blob store
pub async fn test_admin() -> Result<(FacilityAdmin, TempDir, Arc<MemoryBlobStore>)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let blobs = Arc::new(MemoryBlobStore::new());
    let admin = FacilityAdmin::init_with(db_path.to_str().unwrap(), blobs.clone()).await?;
    Ok((admin, temp_dir, blobs))
}

/// Helper to parse a date string
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Helper to parse a date string into midnight UTC
pub fn at(date_str: &str) -> DateTime<Utc> {
    date(date_str).and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Create a space and return a full-access context for it
pub async fn space(admin: &FacilityAdmin, name: &str) -> Result<TenantContext> {
    let bootstrap = TenantContext::full_access(uuid::Uuid::nil());
    let space = admin
        .spaces
        .add(&bootstrap, SpaceInput { name: name.to_string() })
        .await?;
    Ok(TenantContext::full_access(space.id))
}

/// Test fixture: residents with a monthly rent
pub struct Residents;

impl Residents {
    /// Resident admitted on `admitted` without rents
    pub async fn admit(
        admin: &FacilityAdmin,
        ctx: &TenantContext,
        last_name: &str,
        admitted: &str,
    ) -> Result<Resident> {
        let resident = admin
            .residents
            .add(ctx, ResidentInput::new("Jane", last_name, date(admitted)))
            .await?;
        Ok(resident)
    }

    /// Resident admitted on `admitted` paying `monthly` cents from the same day
    pub async fn with_rent(
        admin: &FacilityAdmin,
        ctx: &TenantContext,
        last_name: &str,
        admitted: &str,
        monthly: i64,
    ) -> Result<Resident> {
        let resident = Self::admit(admin, ctx, last_name, admitted).await?;
        admin
            .rents
            .add(ctx, resident.id, RentInput::monthly(monthly, date(admitted)))
            .await?;
        Ok(resident)
    }
}
