use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Document, DocumentId, EntityKind, TenantContext, Validate};
use crate::storage::{documents, BlobStore, Database};

use super::scope::nothing_found;
use super::{AppError, GridQuery, Page};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInput {
    pub title: String,
    pub description: Option<String>,
}

/// File body attached to a document.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct DocumentService {
    db: Database,
    blobs: Arc<dyn BlobStore>,
}

fn blob_error(err: anyhow::Error) -> AppError {
    AppError::Blob(format!("{:#}", err))
}

impl DocumentService {
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Document>, AppError> {
        let mut conn = self.db.acquire().await?;
        let all = documents::list(&mut conn, ctx.space_id).await?;
        Ok(all
            .into_iter()
            .filter(|doc| ctx.allows(EntityKind::Document, doc.id))
            .collect())
    }

    pub async fn grid_select(
        &self,
        ctx: &TenantContext,
        query: &GridQuery,
    ) -> Result<Page<Document>, AppError> {
        let (limit, offset) = query.pagination.limit_offset();
        let grant = ctx.grant_filter(EntityKind::Document);
        let mut conn = self.db.acquire().await?;
        let (items, total) = documents::grid(
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

    pub async fn get(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, AppError> {
        let not_found = AppError::not_found(EntityKind::Document, id);
        if !ctx.allows(EntityKind::Document, id) {
            return Err(not_found);
        }
        let mut conn = self.db.acquire().await?;
        documents::get(&mut conn, ctx.space_id, id).await?.ok_or(not_found)
    }

    /// Create a document, uploading its file when one is given. A failed upload rolls
    /// the insert back.
    pub async fn add(
        &self,
        ctx: &TenantContext,
        input: DocumentInput,
        file: Option<FileUpload>,
    ) -> Result<Document, AppError> {
        let space_id = ctx.space_id;
        let blobs = Arc::clone(&self.blobs);
        let document = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut document = Document::new(space_id, input.title.trim());
                    document.description = input.description;
                    document.validate()?;
                    if let Some(file) = &file {
                        document.file_key = Some(document.blob_key());
                        document.mime_type = Some(file.mime_type.clone());
                    }
                    documents::insert(conn, &document).await?;
                    if let (Some(file), Some(key)) = (file, &document.file_key) {
                        blobs.upload(key, file.bytes).await.map_err(blob_error)?;
                    }
                    Ok::<_, AppError>(document)
                })
            })
            .await?;

        info!(
            document_id = %document.id,
            has_file = document.file_key.is_some(),
            "document created"
        );
        Ok(document)
    }

    /// Replace the document's fields; a given file replaces the stored one.
    pub async fn edit(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        input: DocumentInput,
        file: Option<FileUpload>,
    ) -> Result<Document, AppError> {
        let ctx = ctx.clone();
        let blobs = Arc::clone(&self.blobs);
        let document = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut document = load(conn, &ctx, id).await?;
                    document.title = input.title.trim().to_string();
                    document.description = input.description;
                    document.validate()?;
                    if let Some(file) = file {
                        let key = document.blob_key();
                        document.file_key = Some(key.clone());
                        document.mime_type = Some(file.mime_type);
                        documents::update(conn, &document).await?;
                        blobs.upload(&key, file.bytes).await.map_err(blob_error)?;
                    } else {
                        documents::update(conn, &document).await?;
                    }
                    Ok::<_, AppError>(document)
                })
            })
            .await?;

        info!(document_id = %document.id, "document updated");
        Ok(document)
    }

    /// Detach and delete the document's file, keeping the document. The file is removed
    /// once the detached row is committed.
    pub async fn remove_file(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
    ) -> Result<Document, AppError> {
        let ctx = ctx.clone();
        let (document, key) = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut document = load(conn, &ctx, id).await?;
                    let key = document.file_key.take();
                    if key.is_some() {
                        document.mime_type = None;
                        documents::update(conn, &document).await?;
                    }
                    Ok::<_, AppError>((document, key))
                })
            })
            .await?;

        if let Some(key) = key {
            self.discard_blobs(&[key]).await;
        }
        Ok(document)
    }

    /// The document with its file body.
    pub async fn download(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
    ) -> Result<(Document, Vec<u8>), AppError> {
        let document = self.get(ctx, id).await?;
        let Some(key) = document.file_key.as_deref() else {
            return Err(AppError::Blob(format!("document {} has no file", id)));
        };
        let bytes = self.blobs.download(key).await.map_err(blob_error)?;
        Ok((document, bytes))
    }

    pub async fn remove(&self, ctx: &TenantContext, id: DocumentId) -> Result<(), AppError> {
        self.remove_bulk(ctx, vec![id]).await
    }

    /// Remove documents and their files. Every file must be reachable before any row is
    /// deleted; the files themselves go once the deletes are committed.
    pub async fn remove_bulk(
        &self,
        ctx: &TenantContext,
        ids: Vec<DocumentId>,
    ) -> Result<(), AppError> {
        let ctx = ctx.clone();
        let blobs = Arc::clone(&self.blobs);
        let (removed, keys) = self
            .db
            .transaction(move |conn| {
                Box::pin(async move {
                    let allowed: Vec<_> = ids
                        .iter()
                        .copied()
                        .filter(|id| ctx.allows(EntityKind::Document, *id))
                        .collect();
                    let found = documents::get_many(conn, ctx.space_id, &allowed).await?;
                    if found.is_empty() {
                        return Err(nothing_found(EntityKind::Document, &ids));
                    }
                    let keys: Vec<String> =
                        found.iter().filter_map(|doc| doc.file_key.clone()).collect();
                    for key in &keys {
                        blobs.exists(key).await.map_err(blob_error)?;
                    }
                    for document in &found {
                        documents::delete(conn, document.id).await?;
                    }
                    Ok::<_, AppError>((found.len(), keys))
                })
            })
            .await?;

        self.discard_blobs(&keys).await;
        info!(count = removed, "documents removed");
        Ok(())
    }

    async fn discard_blobs(&self, keys: &[String]) {
        for key in keys {
            if let Err(err) = self.blobs.remove(key).await {
                warn!(key = %key, error = %err, "orphaned document file");
            }
        }
    }
}

async fn load(
    conn: &mut sqlx::SqliteConnection,
    ctx: &TenantContext,
    id: DocumentId,
) -> Result<Document, AppError> {
    let not_found = AppError::not_found(EntityKind::Document, id);
    if !ctx.allows(EntityKind::Document, id) {
        return Err(not_found);
    }
    documents::get(conn, ctx.space_id, id).await?.ok_or(not_found)
}
