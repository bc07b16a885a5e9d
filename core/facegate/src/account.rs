//! Per-account records and their first-run repair.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::permission::{GroupRegistry, PermissionGroup, Role};
use crate::records::{AccountId, Community, CommunityId, Person, PersonId};

/// Name given to the community created for a new account.
pub const DEFAULT_COMMUNITY_NAME: &str = "My Community";
/// Description of that community.
pub const DEFAULT_COMMUNITY_DESCRIPTION: &str = "This is my community";

/// Private lists attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountRoot {
    /// People this account keeps in touch with.
    pub contacts: Option<Vec<PersonId>>,
    /// Communities the account created.
    pub communities: Option<Vec<Community>>,
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Identity used as the viewer when rendering.
    pub id: AccountId,
    /// Display name, copied into the profile when it is created.
    pub name: String,
    /// The account's own person record.
    #[serde(default)]
    pub profile: Option<Person>,
    /// Private lists, created on first initialization.
    #[serde(default)]
    pub root: Option<AccountRoot>,
}

impl Account {
    /// A fresh account with nothing set up yet. See [`ensure_initialized`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            profile: None,
            root: None,
        }
    }
}

/// Fill in whatever an account is missing: a profile everyone may read, a
/// root with an empty contact list, and one community if it has none.
///
/// Returns `true` if anything was created. A second call on the same account
/// returns `false` and changes nothing.
pub fn ensure_initialized(account: &mut Account, groups: &GroupRegistry) -> bool {
    let mut changed = false;

    if account.profile.is_none() {
        let mut group = PermissionGroup::owned_by(account.id);
        group.add_everyone(Role::Reader);
        let mut profile = Person::new(account.name.clone(), groups.insert(group));
        profile.account = Some(account.id);
        info!(account = %account.id, profile = %profile.id, "created profile");
        account.profile = Some(profile);
        changed = true;
    }

    let root = account.root.get_or_insert_with(|| {
        changed = true;
        AccountRoot::default()
    });

    if root.contacts.is_none() {
        root.contacts = Some(Vec::new());
        changed = true;
    }

    let communities = root.communities.get_or_insert_with(Vec::new);
    if communities.is_empty() {
        let community = Community {
            id: CommunityId::new(),
            name: DEFAULT_COMMUNITY_NAME.to_owned(),
            description: DEFAULT_COMMUNITY_DESCRIPTION.to_owned(),
            owner_group: groups.create_group(account.id),
            image: None,
            is_deleted: false,
        };
        info!(account = %account.id, community = %community.id, "created default community");
        communities.push(community);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::AuthorizationGate;

    #[tokio::test]
    async fn fresh_account_is_set_up() {
        let groups = GroupRegistry::new();
        let mut account = Account::new("Ada");
        assert!(ensure_initialized(&mut account, &groups));

        let profile = account.profile.as_ref().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.account, Some(account.id));
        // anyone may read the profile, only the owner administers it
        assert!(groups.can_read(profile.owner_group, AccountId::new()).await);
        assert_eq!(groups.role_of(profile.owner_group, account.id), Some(Role::Admin));

        let root = account.root.as_ref().unwrap();
        assert_eq!(root.contacts, Some(vec![]));
        let communities = root.communities.as_ref().unwrap();
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].name, DEFAULT_COMMUNITY_NAME);
        assert_eq!(communities[0].description, DEFAULT_COMMUNITY_DESCRIPTION);
        assert!(!groups.can_read(communities[0].owner_group, AccountId::new()).await);
    }

    #[test]
    fn second_call_is_a_no_op() {
        let groups = GroupRegistry::new();
        let mut account = Account::new("Ada");
        ensure_initialized(&mut account, &groups);
        let snapshot = account.clone();

        assert!(!ensure_initialized(&mut account, &groups));
        assert_eq!(account, snapshot);
    }

    #[test]
    fn repairs_only_what_is_missing() {
        let groups = GroupRegistry::new();
        let mut account = Account::new("Ada");
        ensure_initialized(&mut account, &groups);
        let profile = account.profile.clone();

        account.root.as_mut().unwrap().contacts = None;
        assert!(ensure_initialized(&mut account, &groups));
        assert_eq!(account.profile, profile);
        assert_eq!(account.root.as_ref().unwrap().contacts, Some(vec![]));
        assert_eq!(account.root.as_ref().unwrap().communities.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn existing_communities_are_kept() {
        let groups = GroupRegistry::new();
        let mut account = Account::new("Ada");
        let community = Community {
            id: CommunityId::new(),
            name: "Chess club".into(),
            description: String::new(),
            owner_group: groups.create_group(account.id),
            image: None,
            is_deleted: false,
        };
        account.root = Some(AccountRoot {
            contacts: None,
            communities: Some(vec![community.clone()]),
        });

        assert!(ensure_initialized(&mut account, &groups));
        assert_eq!(account.root.unwrap().communities.unwrap(), vec![community]);
    }
}
