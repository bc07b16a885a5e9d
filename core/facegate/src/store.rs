//! Record and blob storage seen by the compositor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::StoreError;
use crate::records::{BlobId, Photo, PhotoId};

/// Synchronized store for photo records and image payloads.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// The record for `id`, or `NotFound`.
    async fn load_photo(&self, id: PhotoId) -> Result<Photo, StoreError>;

    /// Insert or replace a record and notify subscribers.
    async fn save_photo(&self, photo: Photo) -> Result<(), StoreError>;

    /// Encoded bytes for `id`, or `NotFound`.
    async fn load_blob(&self, id: BlobId) -> Result<Arc<[u8]>, StoreError>;

    /// Store bytes under `id`, replacing any previous payload.
    async fn save_blob(&self, id: BlobId, data: Vec<u8>) -> Result<(), StoreError>;

    /// Current state of a photo followed by every later update.
    ///
    /// Each call starts a fresh sequence. The stream is empty if the photo is
    /// unknown and nothing is saved under its id afterwards.
    fn subscribe(&self, id: PhotoId) -> BoxStream<'static, Photo>;
}

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Store kept entirely in memory. Cloning shares the underlying data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    photos: RwLock<HashMap<PhotoId, Photo>>,
    blobs: RwLock<HashMap<BlobId, Arc<[u8]>>>,
    updates: broadcast::Sender<Photo>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                photos: RwLock::new(HashMap::new()),
                blobs: RwLock::new(HashMap::new()),
                updates,
            }),
        }
    }

    /// Drop a payload, e.g. to simulate content that never synced.
    pub fn remove_blob(&self, id: BlobId) -> bool {
        self.inner.blobs.write().remove(&id).is_some()
    }

    /// Every stored record, in no particular order.
    pub fn photos(&self) -> Vec<Photo> {
        self.inner.photos.read().values().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn load_photo(&self, id: PhotoId) -> Result<Photo, StoreError> {
        self.inner
            .photos
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("photo {id}")))
    }

    async fn save_photo(&self, photo: Photo) -> Result<(), StoreError> {
        self.inner.photos.write().insert(photo.id, photo.clone());
        // no subscribers is fine
        let _ = self.inner.updates.send(photo);
        Ok(())
    }

    async fn load_blob(&self, id: BlobId) -> Result<Arc<[u8]>, StoreError> {
        self.inner
            .blobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("blob {id}")))
    }

    async fn save_blob(&self, id: BlobId, data: Vec<u8>) -> Result<(), StoreError> {
        self.inner.blobs.write().insert(id, data.into());
        Ok(())
    }

    fn subscribe(&self, id: PhotoId) -> BoxStream<'static, Photo> {
        // subscribe before reading the snapshot so no update slips between them
        let receiver = self.inner.updates.subscribe();
        let current = self.inner.photos.read().get(&id).cloned();

        let updates = BroadcastStream::new(receiver).filter_map(move |update| {
            // lagged receivers skip ahead; the next update carries the full record
            let photo = update.ok().filter(|photo| photo.id == id);
            futures::future::ready(photo)
        });

        stream::iter(current).chain(updates).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{ImageVariant, ResolutionLadder};
    use crate::records::AccountId;
    use chrono::Utc;

    fn photo(widths: &[u32]) -> Photo {
        Photo {
            id: PhotoId::new(),
            base: ResolutionLadder::new(
                widths
                    .iter()
                    .map(|&w| ImageVariant::new(w, w, BlobId::new(), 1))
                    .collect(),
            )
            .unwrap(),
            face_slices: vec![],
            uploader: AccountId::new(),
            created_at: Utc::now(),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_photo(PhotoId::new()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.load_blob(BlobId::new()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blobs_round_trip() {
        let store = MemoryStore::new();
        let id = BlobId::new();
        store.save_blob(id, vec![1, 2, 3]).await.unwrap();
        assert_eq!(&*store.load_blob(id).await.unwrap(), &[1, 2, 3]);
        assert!(store.remove_blob(id));
        assert!(store.load_blob(id).await.is_err());
    }

    #[tokio::test]
    async fn subscribe_yields_current_then_updates() {
        let store = MemoryStore::new();
        let mut first = photo(&[320]);
        store.save_photo(first.clone()).await.unwrap();

        let mut updates = store.subscribe(first.id);
        assert_eq!(updates.next().await.unwrap().base.widths(), vec![320]);

        // unrelated photos are filtered out
        store.save_photo(photo(&[64])).await.unwrap();

        first.base = ResolutionLadder::new(vec![
            ImageVariant::new(320, 320, BlobId::new(), 1),
            ImageVariant::new(1024, 1024, BlobId::new(), 1),
        ])
        .unwrap();
        store.save_photo(first.clone()).await.unwrap();
        assert_eq!(updates.next().await.unwrap().base.widths(), vec![320, 1024]);
    }

    #[tokio::test]
    async fn saving_replaces_the_record() {
        let store = MemoryStore::new();
        let mut p = photo(&[100]);
        store.save_photo(p.clone()).await.unwrap();
        p.soft_delete();
        store.save_photo(p.clone()).await.unwrap();
        store.save_photo(photo(&[200])).await.unwrap();

        let photos = store.photos();
        assert_eq!(photos.len(), 2);
        assert!(photos.iter().any(|stored| stored == &p));
    }

    #[tokio::test]
    async fn subscriptions_restart_from_current_state() {
        let store = MemoryStore::new();
        let p = photo(&[100]);
        store.save_photo(p.clone()).await.unwrap();

        let a = store.subscribe(p.id).next().await.unwrap();
        let b = store.subscribe(p.id).next().await.unwrap();
        assert_eq!(a, b);
    }
}
