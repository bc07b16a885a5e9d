//! Listings over photo and person records. Deleted records never appear.

use crate::permission::{GroupRegistry, Role};
use crate::records::{AccountId, Community, Person, PersonId, Photo};

/// Live photos, newest first.
pub fn sorted_photos<'a>(photos: impl IntoIterator<Item = &'a Photo>) -> Vec<&'a Photo> {
    let mut live: Vec<&Photo> = photos.into_iter().filter(|p| !p.is_deleted).collect();
    live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    live
}

/// Live photos with a live face slice tagged as `person`, newest first.
pub fn photos_of_person<'a>(
    photos: impl IntoIterator<Item = &'a Photo>,
    person: PersonId,
) -> Vec<&'a Photo> {
    sorted_photos(photos)
        .into_iter()
        .filter(|photo| photo.shows_person(person))
        .collect()
}

/// Live photos uploaded by `uploader`, newest first. No uploader, no photos.
pub fn photos_by_uploader<'a>(
    photos: impl IntoIterator<Item = &'a Photo>,
    uploader: Option<AccountId>,
) -> Vec<&'a Photo> {
    let Some(uploader) = uploader else {
        return Vec::new();
    };
    sorted_photos(photos)
        .into_iter()
        .filter(|photo| photo.uploader == uploader)
        .collect()
}

/// Live people ordered by name.
pub fn sorted_people<'a>(people: impl IntoIterator<Item = &'a Person>) -> Vec<&'a Person> {
    let mut live: Vec<&Person> = people.into_iter().filter(|p| !p.is_deleted).collect();
    live.sort_by(|a, b| a.name.cmp(&b.name));
    live
}

/// An account's contacts resolved against `people`, ordered by name.
///
/// Ids with no matching live person are skipped.
pub fn sorted_contacts<'a>(
    contacts: &[PersonId],
    people: impl IntoIterator<Item = &'a Person>,
) -> Vec<&'a Person> {
    sorted_people(people)
        .into_iter()
        .filter(|person| contacts.contains(&person.id))
        .collect()
}

/// Live communities ordered by name.
pub fn sorted_communities<'a>(
    communities: impl IntoIterator<Item = &'a Community>,
) -> Vec<&'a Community> {
    let mut live: Vec<&Community> = communities.into_iter().filter(|c| !c.is_deleted).collect();
    live.sort_by(|a, b| a.name.cmp(&b.name));
    live
}

/// People `viewer` administers through their owning group, ordered by name.
///
/// The viewer's own profile is left out.
pub fn managed_people<'a>(
    people: impl IntoIterator<Item = &'a Person>,
    groups: &GroupRegistry,
    viewer: AccountId,
) -> Vec<&'a Person> {
    sorted_people(people)
        .into_iter()
        .filter(|person| person.account != Some(viewer))
        .filter(|person| groups.role_of(person.owner_group, viewer) == Some(Role::Admin))
        .collect()
}
