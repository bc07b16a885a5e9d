//! Progressive display on top of store subscriptions.
//!
//! Rendering only ever needs the ladder as it is right now. These streams are
//! for callers that want to re-render when a better rung for their viewport
//! shows up.

use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::ladder::{ImageVariant, ResolutionLadder};
use crate::records::PhotoId;
use crate::store::PhotoStore;

/// Map a sequence of ladder states to the variant selected for
/// `target_width`, emitting only when the selected width changes.
pub fn resolution_changes<S>(ladders: S, target_width: u32) -> impl Stream<Item = ImageVariant>
where
    S: Stream<Item = ResolutionLadder>,
{
    let mut current: Option<u32> = None;
    ladders.filter_map(move |ladder| {
        let variant = ladder.select_for_viewport(target_width);
        let changed = current != Some(variant.width);
        if changed {
            current = Some(variant.width);
        }
        future::ready(changed.then(|| variant.clone()))
    })
}

/// Base-photo variants for `target_width`, starting with the one available now.
pub fn base_variant_changes(
    store: &dyn PhotoStore,
    photo: PhotoId,
    target_width: u32,
) -> BoxStream<'static, ImageVariant> {
    let ladders = store.subscribe(photo).map(|photo| photo.base);
    resolution_changes(ladders, target_width).boxed()
}
