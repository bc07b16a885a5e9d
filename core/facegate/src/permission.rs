//! Permission groups and the authorization gate consulted before loading
//! sharp face variants.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{FaceGateError, Result};
use crate::records::{AccountId, GroupId};

/// Capability a member holds in a group. Any role grants read access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// May view.
    Reader,
    /// May view and edit.
    Writer,
    /// May also change membership.
    Admin,
}

/// A set of accounts (and optionally "everyone") with roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Id that face slices and people refer to.
    pub id: GroupId,
    members: HashMap<AccountId, Role>,
    everyone: Option<Role>,
}

impl PermissionGroup {
    /// A new group in which only `owner` (as admin) has any access.
    pub fn owned_by(owner: AccountId) -> Self {
        let mut members = HashMap::new();
        members.insert(owner, Role::Admin);
        Self {
            id: GroupId::new(),
            members,
            everyone: None,
        }
    }

    /// Give `account` a role, replacing any it had.
    pub fn add_member(&mut self, account: AccountId, role: Role) {
        self.members.insert(account, role);
    }

    /// Drop `account`'s direct role.
    pub fn remove_member(&mut self, account: AccountId) {
        self.members.remove(&account);
    }

    /// Grant `role` to every account, including ones not listed as members.
    pub fn add_everyone(&mut self, role: Role) {
        self.everyone = Some(role);
    }

    /// Withdraw the role granted to every account.
    pub fn remove_everyone(&mut self) {
        self.everyone = None;
    }

    /// Highest role `account` holds, directly or through "everyone".
    pub fn role_of(&self, account: AccountId) -> Option<Role> {
        match (self.members.get(&account).copied(), self.everyone) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// True for any role.
    pub fn can_read(&self, account: AccountId) -> bool {
        self.role_of(account).is_some()
    }
}

/// Decides whether a viewer may load sharp content owned by a group.
///
/// The compositor only sees a boolean; how membership is represented is up
/// to the implementation.
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// Whether `viewer` may load content owned by `group`. Unknown groups deny.
    async fn can_read(&self, group: GroupId, viewer: AccountId) -> bool;
}

/// In-memory group table.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<GroupId, PermissionGroup>>,
}

impl GroupRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `group`, replacing any group with the same id.
    pub fn insert(&self, group: PermissionGroup) -> GroupId {
        let id = group.id;
        self.groups.write().insert(id, group);
        id
    }

    /// Create and store a group where `owner` is the only member.
    pub fn create_group(&self, owner: AccountId) -> GroupId {
        self.insert(PermissionGroup::owned_by(owner))
    }

    /// A snapshot of group `id`.
    pub fn get(&self, id: GroupId) -> Option<PermissionGroup> {
        self.groups.read().get(&id).cloned()
    }

    /// Role `account` holds in group `id`, if the group exists.
    pub fn role_of(&self, id: GroupId, account: AccountId) -> Option<Role> {
        self.groups.read().get(&id).and_then(|g| g.role_of(account))
    }

    /// Give `viewer` a role in group `id`.
    pub fn share(&self, id: GroupId, viewer: AccountId, role: Role) -> Result<()> {
        self.update(id, |group| group.add_member(viewer, role))
    }

    /// Give every account a role in group `id`.
    pub fn share_with_everyone(&self, id: GroupId, role: Role) -> Result<()> {
        self.update(id, |group| group.add_everyone(role))
    }

    /// Remove `viewer`'s direct membership. A role granted to everyone stays.
    pub fn revoke(&self, id: GroupId, viewer: AccountId) -> Result<()> {
        self.update(id, |group| group.remove_member(viewer))
    }

    /// Withdraw a role granted to everyone.
    pub fn revoke_everyone(&self, id: GroupId) -> Result<()> {
        self.update(id, |group| group.remove_everyone())
    }

    fn update(&self, id: GroupId, f: impl FnOnce(&mut PermissionGroup)) -> Result<()> {
        let mut groups = self.groups.write();
        let group = groups.get_mut(&id).ok_or(FaceGateError::UnknownGroup(id))?;
        f(group);
        Ok(())
    }
}

#[async_trait]
impl AuthorizationGate for GroupRegistry {
    async fn can_read(&self, group: GroupId, viewer: AccountId) -> bool {
        self.groups
            .read()
            .get(&group)
            .is_some_and(|g| g.can_read(viewer))
    }
}
