//! Ingest a photo and render it for its uploader and for a stranger.
//!
//! Usage:
//!   cargo run --example composite_demo [--features rustface] -- [photo.jpg] [model.bin]
//!
//! Without a photo a synthetic scene is used. With the `rustface` feature and
//! a SeetaFace model path, faces are detected; otherwise the middle of the
//! image is treated as a face. Output goes to the system temp directory.

use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use tracing_subscriber::EnvFilter;

use facegate::{
    AccountId, Compositor, DetectorError, FaceBounds, FaceDetector, GroupRegistry, MemoryStore,
    PhotoIngestor,
};

/// Reports one face covering the middle third of the image.
struct CenterFace;

impl FaceDetector for CenterFace {
    fn detect(
        &self,
        _gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBounds>, DetectorError> {
        Ok(vec![FaceBounds {
            x: f64::from(width) / 3.0,
            y: f64::from(height) / 3.0,
            width: f64::from(width) / 3.0,
            height: f64::from(height) / 3.0,
            confidence: 1.0,
        }])
    }
}

fn synthetic_scene() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(1200, 900, |x, y| {
        Rgb([(x * 255 / 1200) as u8, (y * 255 / 900) as u8, ((x ^ y) & 0xff) as u8])
    }))
}

fn detector(_model: Option<&str>) -> Box<dyn FaceDetector> {
    #[cfg(feature = "rustface")]
    {
        if let Some(path) = _model {
            match facegate::RustfaceDetector::from_path(path) {
                Ok(detector) => return Box::new(detector),
                Err(e) => tracing::warn!(error = %e, "falling back to the fixed center face"),
            }
        }
    }
    Box::new(CenterFace)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "facegate=debug".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let source = match args.first() {
        Some(path) => image::open(path)?,
        None => synthetic_scene(),
    };

    let store = Arc::new(MemoryStore::new());
    let groups = Arc::new(GroupRegistry::new());
    let uploader = AccountId::new();

    let ingested = PhotoIngestor::from_image(&source)?
        .face_detector(detector(args.get(1).map(String::as_str)))
        .ingest(uploader)?;
    println!("detection: {:?}", ingested.detection);
    let photo = ingested.persist(store.as_ref(), &groups).await?;
    println!(
        "base widths {:?}, {} face slice(s)",
        photo.base.widths(),
        photo.face_slices.len()
    );

    let compositor = Compositor::new(store, groups);
    let output_dir = std::env::temp_dir();
    for (name, viewer) in [("uploader", uploader), ("stranger", AccountId::new())] {
        let rendered = compositor.render(&photo, viewer, 800).await?;
        let path = output_dir.join(format!("facegate_{name}.png"));
        rendered.image.save(&path)?;
        println!(
            "  {name}: {} ({}x{}, base variant {}px)",
            path.display(),
            rendered.image.width(),
            rendered.image.height(),
            rendered.base_variant.width
        );
    }

    Ok(())
}
