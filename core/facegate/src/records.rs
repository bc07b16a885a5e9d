//! Persisted records: photos, face slices, people and communities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ladder::ResolutionLadder;
use crate::region::NormalizedRect;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_type!(
    /// Identity of an account, used both for uploaders and viewers.
    AccountId
);
id_type!(
    /// Identifies a photo record.
    PhotoId
);
id_type!(
    /// Identifies a face slice record.
    FaceSliceId
);
id_type!(
    /// Identifies a person/profile record.
    PersonId
);
id_type!(
    /// Identifies a stored binary payload.
    BlobId
);
id_type!(
    /// Identifies a permission group.
    GroupId
);
id_type!(
    /// Identifies a community.
    CommunityId
);

/// A shared photo. The base ladder is always stored pre-obscured: every
/// detected face was pixelated before the first variant was encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Stable id of the photo.
    pub id: PhotoId,
    /// Obscured renditions; safe for any viewer.
    pub base: ResolutionLadder,
    /// Sharp faces in detection order.
    #[serde(default)]
    pub face_slices: Vec<FaceSlice>,
    /// Account that uploaded the photo.
    pub uploader: AccountId,
    /// Upload time; feeds sort on it.
    pub created_at: DateTime<Utc>,
    /// Hidden from feeds when set.
    #[serde(default)]
    pub is_deleted: bool,
}

impl Photo {
    /// Face slices that have not been soft-deleted.
    pub fn live_slices(&self) -> impl Iterator<Item = &FaceSlice> {
        self.face_slices.iter().filter(|slice| !slice.is_deleted)
    }

    /// The slice with `id`, deleted or not.
    pub fn face_slice_mut(&mut self, id: FaceSliceId) -> Option<&mut FaceSlice> {
        self.face_slices.iter_mut().find(|slice| slice.id == id)
    }

    /// True if any live slice is tagged with `person`.
    pub fn shows_person(&self, person: PersonId) -> bool {
        self.live_slices().any(|slice| slice.person == Some(person))
    }

    /// Hide the photo from feeds. Nothing is removed from the store.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }
}

/// One detected face region with its own sharp ladder.
///
/// `owner_group` is fixed at creation and is the only authority for who may
/// load the sharp variants. Being tagged as the person in the slice grants
/// nothing by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSlice {
    /// Stable id of the slice.
    pub id: FaceSliceId,
    /// Where the face sits in the photo.
    pub rect: NormalizedRect,
    /// Sharp renditions of the face.
    pub ladder: ResolutionLadder,
    /// Who may load the sharp renditions.
    pub owner_group: GroupId,
    /// Who the face was tagged as.
    #[serde(default)]
    pub person: Option<PersonId>,
    /// Deleted slices are never overlaid.
    #[serde(default)]
    pub is_deleted: bool,
}

impl FaceSlice {
    /// Tag the face. Grants nothing to that person.
    pub fn assign_person(&mut self, person: PersonId) {
        self.person = Some(person);
    }

    /// Remove the tag.
    pub fn clear_person(&mut self) {
        self.person = None;
    }

    /// Stop overlaying this face. Its region stays obscured.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }
}

/// A person a face slice can be tagged with. Not needed for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable id of the person.
    pub id: PersonId,
    /// Display name; people listings sort on it.
    pub name: String,
    /// Group governing who may edit (admin) or see the profile.
    pub owner_group: GroupId,
    /// Profile picture renditions.
    #[serde(default)]
    pub avatar: Option<ResolutionLadder>,
    /// Account this profile belongs to, when it is someone's own profile.
    #[serde(default)]
    pub account: Option<AccountId>,
    /// Hidden from people listings when set.
    #[serde(default)]
    pub is_deleted: bool,
}

impl Person {
    /// A live person with no avatar and no account.
    pub fn new(name: impl Into<String>, owner_group: GroupId) -> Self {
        Self {
            id: PersonId::new(),
            name: name.into(),
            owner_group,
            avatar: None,
            account: None,
            is_deleted: false,
        }
    }
}

/// A named group of people with its own permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Stable id of the community.
    pub id: CommunityId,
    /// Display name.
    pub name: String,
    /// Free text shown under the name.
    pub description: String,
    /// Who may edit or see the community.
    pub owner_group: GroupId,
    /// Cover picture renditions.
    #[serde(default)]
    pub image: Option<ResolutionLadder>,
    /// Hidden from listings when set.
    #[serde(default)]
    pub is_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::ImageVariant;

    fn ladder() -> ResolutionLadder {
        ResolutionLadder::new(vec![ImageVariant::new(10, 10, BlobId::new(), 100)]).unwrap()
    }

    fn slice() -> FaceSlice {
        FaceSlice {
            id: FaceSliceId::new(),
            rect: NormalizedRect::new(0.1, 0.1, 0.2, 0.2),
            ladder: ladder(),
            owner_group: GroupId::new(),
            person: None,
            is_deleted: false,
        }
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(PhotoId::new(), PhotoId::new());
    }

    #[test]
    fn id_serializes_as_plain_uuid() {
        let id = BlobId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn tagging_and_soft_delete() {
        let person = PersonId::new();
        let mut photo = Photo {
            id: PhotoId::new(),
            base: ladder(),
            face_slices: vec![slice(), slice()],
            uploader: AccountId::new(),
            created_at: Utc::now(),
            is_deleted: false,
        };
        let first = photo.face_slices[0].id;
        photo.face_slice_mut(first).unwrap().assign_person(person);
        assert!(photo.shows_person(person));

        photo.face_slice_mut(first).unwrap().clear_person();
        assert!(!photo.shows_person(person));

        photo.face_slice_mut(first).unwrap().assign_person(person);
        photo.face_slice_mut(first).unwrap().soft_delete();
        assert!(!photo.shows_person(person));
        assert_eq!(photo.live_slices().count(), 1);
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let group = GroupId::new();
        let json = format!(
            r#"{{"id":"{}","name":"Ada","owner_group":"{}"}}"#,
            PersonId::new().0,
            group.0
        );
        let person: Person = serde_json::from_str(&json).unwrap();
        assert_eq!(person.avatar, None);
        assert_eq!(person.account, None);
        assert!(!person.is_deleted);
    }
}
