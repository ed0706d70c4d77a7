//! Media upload pipeline
//!
//! Each upload moves through validate, transfer, then record; a failure at
//! any gate stops the request before the next side effect. The pipeline never
//! records an image the media host does not hold, and never deletes a
//! record while the remote object might still need it.

use bytes::Bytes;
use futures::future::join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::media_host::MediaHost;
use crate::media_host::StoredMedia;
use crate::models::image::{
    Category, ImageRecord, NewImage, Orientation, UploadMetadata, UploadMethod,
};
use crate::validation::{self, MAX_BATCH_FILES};

/// Persistence contract the pipeline holds against the image table
pub trait ImageStore: Send + Sync {
    async fn insert(&self, image: NewImage) -> anyhow::Result<ImageRecord>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ImageRecord>>;

    /// Returns false when no record matched
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// One file received from a multipart request
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// A single failed item within a batch, attributed by input position
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub message: String,
}

/// Outcome of a batch upload
///
/// `images` holds the successful records in input order; `failed` attributes
/// every failure to its zero-based input index. Partial failure is an
/// ordinary outcome, not an error.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub images: Vec<ImageRecord>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn all_failed(&self) -> bool {
        self.images.is_empty() && !self.failed.is_empty()
    }
}

/// Upload flow shared by every entry point
#[derive(Clone)]
pub struct UploadPipeline<H, S> {
    host: H,
    store: S,
}

impl<H: MediaHost + Clone, S: ImageStore + Clone> UploadPipeline<H, S> {
    pub fn new(host: H, store: S) -> Self {
        Self { host, store }
    }

    /// Upload a single file and record its metadata
    pub async fn upload_file(
        &self,
        file: UploadFile,
        meta: UploadMetadata,
    ) -> Result<ImageRecord, ApiError> {
        validation::validate_image_file(&file.file_name, &file.content_type, file.bytes.len())
            .map_err(ApiError::Validation)?;

        let extension = file
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let stored = self
            .host
            .store_bytes(file.bytes, &file.content_type, &extension)
            .await?;

        self.record(stored, meta, UploadMethod::File).await
    }

    /// Upload up to [`MAX_BATCH_FILES`] files concurrently
    ///
    /// Every file is attempted independently; one failure does not abort the
    /// others. The outcome keeps a stable association between each input
    /// position and its result.
    pub async fn upload_many(
        &self,
        files: Vec<UploadFile>,
        category: Category,
        orientation: Orientation,
    ) -> Result<BatchOutcome, ApiError> {
        if files.is_empty() {
            return Err(ApiError::Validation("No files uploaded".to_string()));
        }

        if files.len() > MAX_BATCH_FILES {
            return Err(ApiError::Validation(format!(
                "At most {} files may be uploaded at once",
                MAX_BATCH_FILES
            )));
        }

        let uploads = files.into_iter().enumerate().map(|(index, file)| {
            let meta = UploadMetadata {
                title: format!("Image {}", index + 1),
                description: String::new(),
                category,
                orientation,
            };
            async move { (index, self.upload_file(file, meta).await) }
        });

        let mut images = Vec::new();
        let mut failed = Vec::new();

        for (index, result) in join_all(uploads).await {
            match result {
                Ok(record) => images.push(record),
                Err(err) => {
                    warn!("batch item {} failed: {}", index, err);
                    failed.push(BatchFailure {
                        index,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            "batch upload finished: {} succeeded, {} failed",
            images.len(),
            failed.len()
        );

        Ok(BatchOutcome { images, failed })
    }

    /// Upload by handing a source URL to the media host
    pub async fn upload_from_url(
        &self,
        source_url: &str,
        meta: UploadMetadata,
    ) -> Result<ImageRecord, ApiError> {
        validation::validate_image_url(source_url).map_err(ApiError::Validation)?;

        let stored = self.host.store_from_url(source_url).await?;

        self.record(stored, meta, UploadMethod::Url).await
    }

    /// Delete a gallery image: remote object first, then the record
    pub async fn delete_image(&self, id: Uuid) -> Result<(), ApiError> {
        let record = self
            .store
            .get(id)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ApiError::NotFound("Image"))?;

        self.host.delete(&record.media_id).await?;

        match self.store.delete(id).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // The remote object is gone but the record remains; surface
                // the divergence instead of pretending the delete worked.
                error!(
                    "record {} still references deleted object {}: {:#}",
                    id, record.media_id, err
                );
                Err(ApiError::Persistence(format!(
                    "image {} deleted remotely but its record could not be removed",
                    id
                )))
            }
        }
    }

    async fn record(
        &self,
        stored: StoredMedia,
        meta: UploadMetadata,
        method: UploadMethod,
    ) -> Result<ImageRecord, ApiError> {
        let new_image = NewImage {
            title: meta.title,
            description: meta.description,
            image_url: stored.url.clone(),
            media_id: stored.media_id.clone(),
            category: meta.category,
            orientation: meta.orientation,
            upload_method: method,
        };

        match self.store.insert(new_image).await {
            Ok(record) => Ok(record),
            Err(err) => {
                error!(
                    "object {} uploaded but could not be recorded: {:#}",
                    stored.media_id, err
                );

                // Best-effort cleanup of the orphan; if this also fails the
                // object must be reconciled by hand.
                if let Err(cleanup) = self.host.delete(&stored.media_id).await {
                    error!(
                        "orphaned object {} could not be cleaned up: {}",
                        stored.media_id, cleanup
                    );
                }

                Err(ApiError::Persistence(format!(
                    "upload {} was not recorded",
                    stored.media_id
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_host::{MediaHostError, StoredMedia};
    use crate::validation::MAX_UPLOAD_BYTES;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory media host that can be told to fail specific payloads
    #[derive(Clone, Default)]
    struct MockHost {
        upload_calls: Arc<AtomicUsize>,
        deletes: Arc<Mutex<Vec<String>>>,
        fail_payload: Option<Bytes>,
        fail_all_uploads: bool,
        fail_deletes: bool,
    }

    impl MockHost {
        fn upload_calls(&self) -> usize {
            self.upload_calls.load(Ordering::SeqCst)
        }

        fn deleted(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    impl MediaHost for MockHost {
        async fn store_bytes(
            &self,
            bytes: Bytes,
            _content_type: &str,
            extension: &str,
        ) -> Result<StoredMedia, MediaHostError> {
            let call = self.upload_calls.fetch_add(1, Ordering::SeqCst);

            if self.fail_all_uploads
                || self.fail_payload.as_ref().is_some_and(|p| *p == bytes)
            {
                return Err(MediaHostError::Upload("simulated outage".to_string()));
            }

            let media_id = format!("portfolio/mock-{}.{}", call, extension);
            Ok(StoredMedia {
                url: format!("https://cdn.test/{}", media_id),
                media_id,
            })
        }

        async fn store_from_url(&self, _source_url: &str) -> Result<StoredMedia, MediaHostError> {
            self.store_bytes(Bytes::from_static(b"fetched"), "image/jpeg", "jpg")
                .await
        }

        async fn delete(&self, media_id: &str) -> Result<(), MediaHostError> {
            self.deletes.lock().unwrap().push(media_id.to_string());

            if self.fail_deletes {
                return Err(MediaHostError::Delete("simulated outage".to_string()));
            }

            Ok(())
        }
    }

    /// In-memory image store
    #[derive(Clone, Default)]
    struct MockStore {
        records: Arc<Mutex<Vec<ImageRecord>>>,
        fail_inserts: bool,
    }

    impl MockStore {
        fn records(&self) -> Vec<ImageRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl ImageStore for MockStore {
        async fn insert(&self, image: NewImage) -> anyhow::Result<ImageRecord> {
            if self.fail_inserts {
                anyhow::bail!("insert refused");
            }

            let record = ImageRecord {
                id: Uuid::new_v4(),
                title: image.title,
                description: image.description,
                image_url: image.image_url,
                media_id: image.media_id,
                category: image.category,
                orientation: image.orientation,
                upload_method: image.upload_method,
                uploaded_at: Utc::now(),
                updated_at: Utc::now(),
            };

            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn get(&self, id: Uuid) -> anyhow::Result<Option<ImageRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() < before)
        }
    }

    fn pipeline(
        host: &MockHost,
        store: &MockStore,
    ) -> UploadPipeline<MockHost, MockStore> {
        UploadPipeline::new(host.clone(), store.clone())
    }

    fn jpeg(name: &str, payload: &[u8]) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: Bytes::copy_from_slice(payload),
        }
    }

    fn wedding_portrait(title: &str) -> UploadMetadata {
        UploadMetadata {
            title: title.to_string(),
            description: String::new(),
            category: Category::Wedding,
            orientation: Orientation::Portrait,
        }
    }

    #[tokio::test]
    async fn upload_at_exact_size_ceiling_succeeds() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let record = pipeline(&host, &store)
            .upload_file(
                jpeg("ceremony.jpg", &vec![0u8; MAX_UPLOAD_BYTES]),
                wedding_portrait("Ceremony"),
            )
            .await
            .unwrap();

        assert_eq!(host.upload_calls(), 1);
        assert_eq!(record.category, Category::Wedding);
        assert_eq!(record.upload_method, UploadMethod::File);
        assert!(record.image_url.contains(&record.media_id));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn oversize_upload_never_reaches_the_host() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let err = pipeline(&host, &store)
            .upload_file(
                jpeg("ceremony.jpg", &vec![0u8; MAX_UPLOAD_BYTES + 1]),
                wedding_portrait("Ceremony"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(host.upload_calls(), 0);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn non_image_upload_never_reaches_the_host() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let err = pipeline(&host, &store)
            .upload_file(
                UploadFile {
                    file_name: "contract.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    bytes: Bytes::from_static(b"%PDF"),
                },
                wedding_portrait("Contract"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(host.upload_calls(), 0);
    }

    #[tokio::test]
    async fn host_failure_creates_no_record() {
        let host = MockHost {
            fail_all_uploads: true,
            ..MockHost::default()
        };
        let store = MockStore::default();

        let err = pipeline(&host, &store)
            .upload_file(jpeg("ceremony.jpg", b"bytes"), wedding_portrait("Ceremony"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Upload(_)));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_anomaly_and_cleans_up() {
        let host = MockHost::default();
        let store = MockStore {
            fail_inserts: true,
            ..MockStore::default()
        };

        let err = pipeline(&host, &store)
            .upload_file(jpeg("ceremony.jpg", b"bytes"), wedding_portrait("Ceremony"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Persistence(_)));
        // The orphaned remote object was deleted again on the way out.
        assert_eq!(host.deleted().len(), 1);
    }

    #[tokio::test]
    async fn batch_partial_failure_attributes_the_failing_index() {
        let host = MockHost {
            fail_payload: Some(Bytes::from_static(b"corrupt")),
            ..MockHost::default()
        };
        let store = MockStore::default();

        let files = vec![
            jpeg("a.jpg", b"one"),
            jpeg("b.jpg", b"two"),
            jpeg("c.jpg", b"corrupt"),
            jpeg("d.jpg", b"four"),
            jpeg("e.jpg", b"five"),
        ];

        let outcome = pipeline(&host, &store)
            .upload_many(files, Category::Candid, Orientation::Landscape)
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 4);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 2);
        assert!(!outcome.all_failed());

        // Successes keep their input-order titles and are all persisted.
        let titles: Vec<_> = outcome.images.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Image 1", "Image 2", "Image 4", "Image 5"]);
        assert_eq!(store.records().len(), 4);
    }

    #[tokio::test]
    async fn batch_where_everything_fails_is_distinguishable() {
        let host = MockHost {
            fail_all_uploads: true,
            ..MockHost::default()
        };
        let store = MockStore::default();

        let outcome = pipeline(&host, &store)
            .upload_many(
                vec![jpeg("a.jpg", b"one"), jpeg("b.jpg", b"two")],
                Category::Baby,
                Orientation::Square,
            )
            .await
            .unwrap();

        assert!(outcome.all_failed());
        assert_eq!(outcome.failed.len(), 2);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn batch_over_the_cap_is_rejected_upfront() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let files = (0..=MAX_BATCH_FILES)
            .map(|i| jpeg(&format!("{}.jpg", i), b"x"))
            .collect();

        let err = pipeline(&host, &store)
            .upload_many(files, Category::Event, Orientation::Portrait)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(host.upload_calls(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let err = pipeline(&host, &store)
            .upload_many(Vec::new(), Category::Event, Orientation::Portrait)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn url_upload_records_the_url_method() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let record = pipeline(&host, &store)
            .upload_from_url(
                "https://example.com/shoot/golden-hour.jpg",
                wedding_portrait("Golden hour"),
            )
            .await
            .unwrap();

        assert_eq!(record.upload_method, UploadMethod::Url);
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn non_http_url_is_rejected_before_any_fetch() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let err = pipeline(&host, &store)
            .upload_from_url("file:///etc/passwd", wedding_portrait("Nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(host.upload_calls(), 0);
    }

    #[tokio::test]
    async fn deleting_a_missing_id_makes_no_remote_call() {
        let (host, store) = (MockHost::default(), MockStore::default());

        let err = pipeline(&host, &store)
            .delete_image(Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(host.deleted().is_empty());
    }

    #[tokio::test]
    async fn deleting_removes_remote_object_then_record() {
        let (host, store) = (MockHost::default(), MockStore::default());
        let pipeline = pipeline(&host, &store);

        let record = pipeline
            .upload_file(jpeg("ceremony.jpg", b"bytes"), wedding_portrait("Ceremony"))
            .await
            .unwrap();

        pipeline.delete_image(record.id).await.unwrap();

        assert_eq!(host.deleted(), vec![record.media_id]);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn failed_remote_delete_keeps_the_record_for_retry() {
        let host = MockHost {
            fail_deletes: true,
            ..MockHost::default()
        };
        let store = MockStore::default();
        let pipeline = pipeline(&host, &store);

        let record = pipeline
            .upload_file(jpeg("ceremony.jpg", b"bytes"), wedding_portrait("Ceremony"))
            .await
            .unwrap();

        let err = pipeline.delete_image(record.id).await.unwrap_err();

        assert!(matches!(err, ApiError::Deletion(_)));
        assert_eq!(store.records().len(), 1);
    }
}
