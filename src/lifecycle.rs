//! Asset state machine.
//!
//! | from                      | action           | to         |
//! |---------------------------|------------------|------------|
//! | idle                      | acquire          | acquired   |
//! | acquired                  | cancel           | idle       |
//! | idle, acquired            | assign maintainer| maintained |
//! | idle, acquired, maintained| expire           | expired    |
//! | any                       | transfer         | unchanged  |
//!
//! Bulk operations authorize every listed asset first, then apply the table
//! to all of them inside one store transaction. One failing asset fails the
//! whole call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::scope::ScopeDirectory;
use crate::store::Store;
use crate::types::{ActorClaims, Asset, AssetState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Acquire,
    Cancel,
    AssignMaintainer,
    Expire,
    Transfer,
}

/// Returns the state an asset moves to, or [`Error::AssetListInvalid`] when
/// the table has no such edge.
pub fn next_state(from: AssetState, action: Action) -> Result<AssetState> {
    use AssetState::*;

    match (from, action) {
        (Idle, Action::Acquire) => Ok(Acquired),
        (Acquired, Action::Cancel) => Ok(Idle),
        (Idle | Acquired, Action::AssignMaintainer) => Ok(Maintained),
        (Idle | Acquired | Maintained, Action::Expire) => Ok(Expired),
        (state, Action::Transfer) => Ok(state),
        _ => Err(Error::AssetListInvalid),
    }
}

/// Rejects deleting an asset another user currently holds.
pub fn deletion_guard(actor_id: i64) -> impl Fn(&Asset) -> Result<()> {
    move |asset| {
        let holders = [asset.owner_id, asset.maintainer_id];
        let held_by_other = holders.iter().flatten().any(|&id| id != actor_id);
        if asset.state.admits_holder() && held_by_other {
            return Err(Error::AssetInUse);
        }
        Ok(())
    }
}

/// Snapshot taken while authorizing, compared again inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seen {
    department_id: i64,
    owner_id: Option<i64>,
}

pub struct AssetLifecycle {
    store: Arc<dyn Store>,
    scopes: ScopeDirectory,
}

impl AssetLifecycle {
    pub fn new(store: Arc<dyn Store>, scopes: ScopeDirectory) -> Self {
        Self { store, scopes }
    }

    /// Moves idle assets of the actor's own department to `acquired`, held by
    /// the actor.
    pub fn acquire(&self, actor: &ActorClaims, ids: &[i64]) -> Result<Vec<Asset>> {
        let seen = self.authorize(ids, |asset| {
            if actor.department_id != Some(asset.department_id) {
                return Err(Error::AssetNotInDepartment);
            }
            Ok(())
        })?;

        let assets = self.apply(ids, &seen, false, &mut |asset| {
            asset.state = next_state(asset.state, Action::Acquire)?;
            asset.owner_id = Some(actor.user_id);
            Ok(())
        })?;
        tracing::info!(actor = actor.user_id, count = assets.len(), "assets acquired");
        Ok(assets)
    }

    /// Returns acquired assets to `idle`. The holder or anyone with write
    /// authority over the asset's department may cancel.
    pub fn cancel(&self, actor: &ActorClaims, ids: &[i64]) -> Result<Vec<Asset>> {
        let seen = self.authorize(ids, |asset| {
            let target = self.scopes.asset_target(asset)?;
            permission::require(actor, &target, Operation::Write)
        })?;

        let assets = self.apply(ids, &seen, false, &mut |asset| {
            asset.state = next_state(asset.state, Action::Cancel)?;
            asset.owner_id = None;
            Ok(())
        })?;
        tracing::info!(actor = actor.user_id, count = assets.len(), "asset holds cancelled");
        Ok(assets)
    }

    /// Hands assets to a maintainer who must hold authority in each asset's
    /// department.
    pub fn assign_maintainer(
        &self,
        actor: &ActorClaims,
        ids: &[i64],
        maintainer_id: i64,
    ) -> Result<Vec<Asset>> {
        let maintainer = self
            .store
            .get_user(maintainer_id)?
            .ok_or(Error::TargetUserNotFound)?;
        let maintainer = ActorClaims::from(&maintainer);

        let seen = self.authorize(ids, |asset| {
            let target = self.department_target(asset)?;
            permission::require(actor, &target, Operation::Write)?;
            permission::require(&maintainer, &target, Operation::Write)
                .map_err(|_| Error::TargetNotDepartmentSuper)
        })?;

        let assets = self.apply(ids, &seen, false, &mut |asset| {
            asset.state = next_state(asset.state, Action::AssignMaintainer)?;
            asset.maintainer_id = Some(maintainer_id);
            Ok(())
        })?;
        tracing::info!(
            actor = actor.user_id,
            maintainer = maintainer_id,
            count = assets.len(),
            "assets sent to maintenance"
        );
        Ok(assets)
    }

    /// Retires assets. Expired assets keep their rows but drop their holders.
    pub fn expire(&self, actor: &ActorClaims, ids: &[i64]) -> Result<Vec<Asset>> {
        let seen = self.authorize(ids, |asset| {
            let target = self.department_target(asset)?;
            permission::require(actor, &target, Operation::Write)
        })?;

        let assets = self.apply(ids, &seen, false, &mut |asset| {
            asset.state = next_state(asset.state, Action::Expire)?;
            asset.owner_id = None;
            asset.maintainer_id = None;
            Ok(())
        })?;
        tracing::info!(actor = actor.user_id, count = assets.len(), "assets expired");
        Ok(assets)
    }

    /// Moves assets to another department and hands them to `target_user`.
    ///
    /// States are kept. A maintained asset is maintained by the receiver from
    /// then on, since the old maintainer has no authority in the destination.
    /// Every descendant of a moved asset is detached first
    /// and the moved assets become roots, so no subtree spans two
    /// departments.
    pub fn transfer(
        &self,
        actor: &ActorClaims,
        ids: &[i64],
        target_user: Option<i64>,
        department_id: i64,
    ) -> Result<Vec<Asset>> {
        let target_user = target_user.ok_or(Error::TargetEmpty)?;
        if ids.is_empty() {
            return Err(Error::AssetListInvalid);
        }

        let destination = self.scopes.department_target(department_id)?;
        let receiver = self
            .store
            .get_user(target_user)?
            .ok_or(Error::TargetUserNotFound)?;
        if receiver.entity_id != destination.entity_id {
            return Err(Error::NotInSameEntity);
        }
        if receiver.department_id != Some(department_id) {
            return Err(Error::UserNotInDepartment);
        }
        permission::require(&ActorClaims::from(&receiver), &destination, Operation::Write)
            .map_err(|_| Error::TargetNotDepartmentSuper)?;

        let seen = self.authorize(ids, |asset| {
            let source = self.department_target(asset)?;
            if source.entity_id != destination.entity_id {
                return Err(Error::NotInSameEntity);
            }
            permission::require(actor, &source, Operation::Write)
        })?;

        let assets = self.apply(ids, &seen, true, &mut |asset| {
            asset.state = next_state(asset.state, Action::Transfer)?;
            asset.owner_id = asset.state.admits_holder().then_some(target_user);
            asset.maintainer_id = (asset.state == AssetState::Maintained).then_some(target_user);
            asset.department_id = department_id;
            asset.parent_id = None;
            Ok(())
        })?;
        tracing::info!(
            actor = actor.user_id,
            to_user = target_user,
            to_department = department_id,
            count = assets.len(),
            "assets transferred"
        );
        Ok(assets)
    }

    /// Deletes one leaf asset unless another user holds it.
    pub fn delete(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        let asset = self.store.get_asset(id)?.ok_or(Error::AssetNotFound)?;
        let target = self.department_target(&asset)?;
        permission::require(actor, &target, Operation::Write)?;
        self.store.delete_asset(id, &deletion_guard(actor.user_id))
    }

    fn department_target(&self, asset: &Asset) -> Result<TargetScope> {
        self.scopes.department_target(asset.department_id)
    }

    /// Loads each listed asset and runs `check` on it before anything is
    /// written.
    fn authorize(
        &self,
        ids: &[i64],
        check: impl Fn(&Asset) -> Result<()>,
    ) -> Result<HashMap<i64, Seen>> {
        if ids.is_empty() {
            return Err(Error::AssetListInvalid);
        }

        let mut seen = HashMap::with_capacity(ids.len());
        for &id in ids {
            let asset = self.store.get_asset(id)?.ok_or(Error::AssetNotFound)?;
            check(&asset)?;
            seen.insert(
                id,
                Seen {
                    department_id: asset.department_id,
                    owner_id: asset.owner_id,
                },
            );
        }
        Ok(seen)
    }

    fn apply(
        &self,
        ids: &[i64],
        seen: &HashMap<i64, Seen>,
        detach_descendants: bool,
        change: &mut dyn FnMut(&mut Asset) -> Result<()>,
    ) -> Result<Vec<Asset>> {
        self.store
            .transition_assets(ids, detach_descendants, &mut |asset| {
                let current = Seen {
                    department_id: asset.department_id,
                    owner_id: asset.owner_id,
                };
                if seen.get(&asset.id) != Some(&current) {
                    tracing::debug!(asset_id = asset.id, "asset changed since authorization");
                    return Err(Error::AssetListInvalid);
                }
                change(asset)
            })
            .inspect_err(|e| tracing::debug!(error = %e, "asset transition rejected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{ClassType, NewAsset, NewUser, RoleFlags};

    const STATES: [AssetState; 4] = [
        AssetState::Idle,
        AssetState::Acquired,
        AssetState::Maintained,
        AssetState::Expired,
    ];
    const ACTIONS: [Action; 5] = [
        Action::Acquire,
        Action::Cancel,
        Action::AssignMaintainer,
        Action::Expire,
        Action::Transfer,
    ];

    #[test]
    fn test_only_table_edges_are_allowed() {
        let allowed = [
            (AssetState::Idle, Action::Acquire, AssetState::Acquired),
            (AssetState::Acquired, Action::Cancel, AssetState::Idle),
            (AssetState::Idle, Action::AssignMaintainer, AssetState::Maintained),
            (AssetState::Acquired, Action::AssignMaintainer, AssetState::Maintained),
            (AssetState::Idle, Action::Expire, AssetState::Expired),
            (AssetState::Acquired, Action::Expire, AssetState::Expired),
            (AssetState::Maintained, Action::Expire, AssetState::Expired),
        ];

        for from in STATES {
            for action in ACTIONS {
                let got = next_state(from, action);
                if action == Action::Transfer {
                    assert_eq!(got.unwrap(), from);
                    continue;
                }
                match allowed.iter().find(|(f, a, _)| *f == from && *a == action) {
                    Some((_, _, to)) => assert_eq!(got.unwrap(), *to),
                    None => assert!(
                        matches!(got, Err(Error::AssetListInvalid)),
                        "{from:?} --{action:?}--> should be rejected"
                    ),
                }
            }
        }
    }

    #[test]
    fn test_deletion_guard() {
        let now = chrono::Utc::now();
        let mut asset = Asset {
            id: 1,
            name: "laptop".to_string(),
            class_id: 1,
            parent_id: None,
            department_id: 1,
            owner_id: Some(7),
            maintainer_id: None,
            state: AssetState::Acquired,
            price: 0.0,
            number: 1,
            position: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        let guard = deletion_guard(8);
        assert!(matches!(guard(&asset), Err(Error::AssetInUse)));
        assert!(deletion_guard(7)(&asset).is_ok());

        asset.state = AssetState::Idle;
        asset.owner_id = None;
        assert!(guard(&asset).is_ok());
    }

    struct Fixture {
        store: Arc<dyn Store>,
        lifecycle: AssetLifecycle,
        member: ActorClaims,
        other: ActorClaims,
        assets: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);

        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let class = store
            .create_asset_class("laptops", d.id, None, ClassType::Item)
            .unwrap();
        let mk = |name: &str| NewUser {
            username: name.to_string(),
            password_hash: String::new(),
            entity_id: Some(e.id),
            department_id: Some(d.id),
            roles: RoleFlags::NONE,
        };
        let member = ActorClaims::from(&store.create_user(&mk("five")).unwrap());
        let other = ActorClaims::from(&store.create_user(&mk("six")).unwrap());

        let leaf = |name: &str| NewAsset {
            name: name.to_string(),
            class_id: class.id,
            price: 100.0,
            number: 1,
            position: None,
            description: None,
            children: Vec::new(),
        };
        let assets = store
            .create_assets(d.id, None, &[leaf("a1"), leaf("a2")])
            .unwrap();

        let scopes = ScopeDirectory::new(store.clone());
        Fixture {
            lifecycle: AssetLifecycle::new(store.clone(), scopes),
            store,
            member,
            other,
            assets,
        }
    }

    #[test]
    fn test_second_acquire_is_rejected_without_mutation() {
        let f = fixture();
        let a1 = f.assets[0];

        let acquired = f.lifecycle.acquire(&f.member, &[a1]).unwrap();
        assert_eq!(acquired[0].state, AssetState::Acquired);
        assert_eq!(acquired[0].owner_id, Some(f.member.user_id));

        let err = f.lifecycle.acquire(&f.other, &[a1]).unwrap_err();
        assert!(matches!(err, Error::AssetListInvalid));
        let stored = f.store.get_asset(a1).unwrap().unwrap();
        assert_eq!(stored.state, AssetState::Acquired);
        assert_eq!(stored.owner_id, Some(f.member.user_id));
    }

    #[test]
    fn test_bulk_acquire_is_all_or_nothing() {
        let f = fixture();
        f.lifecycle.acquire(&f.member, &[f.assets[1]]).unwrap();

        assert!(f.lifecycle.acquire(&f.other, &f.assets).is_err());
        let first = f.store.get_asset(f.assets[0]).unwrap().unwrap();
        assert_eq!(first.state, AssetState::Idle);
        assert!(first.owner_id.is_none());
    }

    #[test]
    fn test_cancel_by_holder_only() {
        let f = fixture();
        let a1 = f.assets[0];
        f.lifecycle.acquire(&f.member, &[a1]).unwrap();

        assert!(matches!(
            f.lifecycle.cancel(&f.other, &[a1]),
            Err(Error::PermissionDenied)
        ));
        let idle = f.lifecycle.cancel(&f.member, &[a1]).unwrap();
        assert_eq!(idle[0].state, AssetState::Idle);
        assert!(idle[0].owner_id.is_none());
    }

    #[test]
    fn test_delete_held_asset_is_refused() {
        let f = fixture();
        let a1 = f.assets[0];
        f.lifecycle.acquire(&f.member, &[a1]).unwrap();

        // Plain members have no write authority over the department.
        assert!(matches!(
            f.lifecycle.delete(&f.other, a1),
            Err(Error::PermissionDenied)
        ));
    }
}
