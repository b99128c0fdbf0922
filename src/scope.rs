//! Membership and role lookups over entities, departments and users.
//!
//! Nothing here decides policy; see [`crate::permission`] for that.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::permission::TargetScope;
use crate::store::Store;
use crate::types::{Asset, RoleFlags};

/// Where a user sits and which super tiers it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserScope {
    pub user_id: i64,
    pub entity_id: Option<i64>,
    pub department_id: Option<i64>,
    pub roles: RoleFlags,
}

impl UserScope {
    /// The user as the target of an operation.
    #[must_use]
    pub fn as_target(&self) -> TargetScope {
        TargetScope {
            entity_id: self.entity_id,
            department_id: self.department_id,
            owner_id: Some(self.user_id),
        }
    }
}

#[derive(Clone)]
pub struct ScopeDirectory {
    store: Arc<dyn Store>,
}

impl ScopeDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn user_scope(&self, user_id: i64) -> Result<UserScope> {
        let user = self.store.get_user(user_id)?.ok_or(Error::UserNotFound)?;
        Ok(UserScope {
            user_id: user.id,
            entity_id: user.entity_id,
            department_id: user.department_id,
            roles: user.roles,
        })
    }

    pub fn department_entity(&self, department_id: i64) -> Result<i64> {
        self.store
            .get_department(department_id)?
            .map(|d| d.entity_id)
            .ok_or(Error::DepartmentNotFound)
    }

    /// True when both users belong to the same entity. Users without an
    /// entity never match.
    pub fn is_same_entity(&self, a: i64, b: i64) -> Result<bool> {
        let (a, b) = (self.user_scope(a)?, self.user_scope(b)?);
        Ok(a.entity_id.is_some() && a.entity_id == b.entity_id)
    }

    /// True when both users belong to the same department.
    pub fn is_same_department(&self, a: i64, b: i64) -> Result<bool> {
        let (a, b) = (self.user_scope(a)?, self.user_scope(b)?);
        Ok(a.department_id.is_some() && a.department_id == b.department_id)
    }

    /// Scope of a department as a permission target.
    pub fn department_target(&self, department_id: i64) -> Result<TargetScope> {
        let entity_id = self.department_entity(department_id)?;
        Ok(TargetScope::department(entity_id, department_id))
    }

    /// Scope of an asset as a permission target; the holder counts as owner.
    pub fn asset_target(&self, asset: &Asset) -> Result<TargetScope> {
        let entity_id = self.department_entity(asset.department_id)?;
        Ok(TargetScope {
            entity_id: Some(entity_id),
            department_id: Some(asset.department_id),
            owner_id: asset.owner_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::NewUser;

    fn directory() -> (ScopeDirectory, Arc<dyn Store>) {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        (ScopeDirectory::new(store.clone()), store)
    }

    fn add_user(store: &Arc<dyn Store>, name: &str, entity: Option<i64>, dept: Option<i64>) -> i64 {
        store
            .create_user(&NewUser {
                username: name.to_string(),
                password_hash: String::new(),
                entity_id: entity,
                department_id: dept,
                roles: RoleFlags::DEPARTMENT_SUPER,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_membership_queries() {
        let (dir, store) = directory();
        let e1 = store.create_entity("e1").unwrap();
        let e2 = store.create_entity("e2").unwrap();
        let a = store.create_department("a", e1.id, None).unwrap();
        let b = store.create_department("b", e1.id, None).unwrap();
        let c = store.create_department("c", e2.id, None).unwrap();

        let u1 = add_user(&store, "u1", Some(e1.id), Some(a.id));
        let u2 = add_user(&store, "u2", Some(e1.id), Some(b.id));
        let u3 = add_user(&store, "u3", Some(e2.id), Some(c.id));
        let loose = add_user(&store, "loose", None, None);

        assert!(dir.is_same_entity(u1, u2).unwrap());
        assert!(!dir.is_same_entity(u1, u3).unwrap());
        assert!(!dir.is_same_department(u1, u2).unwrap());
        assert!(dir.is_same_department(u1, u1).unwrap());
        assert!(!dir.is_same_entity(loose, loose).unwrap());

        assert_eq!(dir.department_entity(c.id).unwrap(), e2.id);
        assert!(matches!(
            dir.department_entity(999),
            Err(Error::DepartmentNotFound)
        ));

        let scope = dir.user_scope(u1).unwrap();
        assert_eq!(scope.department_id, Some(a.id));
        assert!(scope.roles.department_super());
        assert!(matches!(dir.user_scope(999), Err(Error::UserNotFound)));
    }
}
