mod database;
mod rows;

pub mod adjustments;
pub mod assessments;
pub mod blob;
pub mod contracts;
pub mod directory;
pub mod documents;
pub mod ledgers;
pub mod rates;
pub mod residents;
pub mod spaces;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use database::*;

/// SQL migration for spaces, residents and the directory tables
pub const MIGRATION_001_TENANCY: &str = include_str!("migrations/001_tenancy.sql");

/// SQL migration for ledgers, ledger items and adjustments
pub const MIGRATION_002_LEDGERS: &str = include_str!("migrations/002_ledgers.sql");

/// SQL migration for assessment forms and scores
pub const MIGRATION_003_ASSESSMENTS: &str = include_str!("migrations/003_assessments.sql");
