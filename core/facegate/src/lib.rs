//! Permission-gated photo compositing.
//!
//! Photos are stored with every face already pixelated. Each face is also
//! stored separately, sharp, as a face slice that belongs to a permission
//! group. Rendering draws the obscured base and then puts back the sharp faces
//! the viewer is allowed to see, so a viewer without access receives exactly
//! the pixels the base already contains.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use facegate::{AccountId, Compositor, GroupRegistry, MemoryStore, PhotoIngestor};
//!
//! # async fn run() -> facegate::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let groups = Arc::new(GroupRegistry::new());
//! let uploader = AccountId::new();
//!
//! let raw_bytes = std::fs::read("party.jpg").unwrap();
//! let photo = PhotoIngestor::new(&raw_bytes)?
//!     .ingest(uploader)?
//!     .persist(store.as_ref(), &groups)
//!     .await?;
//!
//! let compositor = Compositor::new(store, groups);
//! let rendered = compositor.render(&photo, uploader, 800).await?;
//! println!("{}x{}", rendered.image.width(), rendered.image.height());
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

/// Account records and first-run setup.
pub mod account;
/// Image decoding, encoding and resampling.
pub mod codec;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
/// Listings over photos and people.
pub mod feed;
mod ingest;
/// Resolution ladders and the selection rules over them.
pub mod ladder;
/// Permission groups and the authorization gate.
pub mod permission;
mod pixelate;
/// Streams that follow a photo's ladder as it syncs.
pub mod progressive;
/// Persisted records.
pub mod records;
/// Normalized and pixel rectangles.
pub mod region;
mod render;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
/// Storage collaborator and the in-memory implementation.
pub mod store;

pub use account::{ensure_initialized, Account, AccountRoot};
pub use codec::ResizeFilter;
pub use error::{DetectorError, FaceGateError, Result, StoreError};
pub use face_detector::{FaceBounds, FaceDetector};
pub use ingest::{DetectionOutcome, DetectorPolicy, IngestOptions, Ingested, PhotoIngestor};
pub use ladder::{ImageVariant, ResolutionLadder};
pub use permission::{AuthorizationGate, GroupRegistry, PermissionGroup, Role};
pub use pixelate::{pixelate, PIXELATE_WIDTH};
pub use records::{
    AccountId, BlobId, Community, CommunityId, FaceSlice, FaceSliceId, GroupId, Person, PersonId,
    Photo, PhotoId,
};
pub use region::{NormalizedRect, PixelRect};
pub use render::{Compositor, RenderOptions, RenderedPhoto};
#[cfg(feature = "rustface")]
/// Built-in detector that loads a SeetaFace model.
pub use rustface_backend::RustfaceDetector;
pub use store::{MemoryStore, PhotoStore};
