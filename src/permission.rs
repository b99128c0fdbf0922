//! Grant or deny an operation from the actor's role flags and scope.
//!
//! Rules are checked in a fixed order and the first match wins:
//!
//! 1. `system_super` grants everything.
//! 2. `entity_super` grants targets inside the actor's entity.
//! 3. `department_super` grants targets inside the actor's department.
//! 4. The owner of the target may read and write it.
//!
//! Anything else is denied with [`Error::PermissionDenied`]. Each flag is
//! evaluated against its own scope; holding a higher flag does not widen a
//! lower one.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{ActorClaims, RoleFlags, User};

/// Class of operation requested on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    /// Operations only super users may perform, even on their own rows.
    Admin,
}

/// Scope of the resource an operation acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetScope {
    pub entity_id: Option<i64>,
    pub department_id: Option<i64>,
    pub owner_id: Option<i64>,
}

impl TargetScope {
    /// A target that only system supers reach.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            entity_id: None,
            department_id: None,
            owner_id: None,
        }
    }

    #[must_use]
    pub const fn entity(entity_id: i64) -> Self {
        Self {
            entity_id: Some(entity_id),
            department_id: None,
            owner_id: None,
        }
    }

    #[must_use]
    pub const fn department(entity_id: i64, department_id: i64) -> Self {
        Self {
            entity_id: Some(entity_id),
            department_id: Some(department_id),
            owner_id: None,
        }
    }

    #[must_use]
    pub fn user(user: &User) -> Self {
        Self {
            entity_id: user.entity_id,
            department_id: user.department_id,
            owner_id: Some(user.id),
        }
    }
}

/// The rule that granted an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    SystemSuper,
    EntitySuper,
    DepartmentSuper,
    Owner,
}

/// Evaluates `op` by `actor` against `target`.
pub fn evaluate(actor: &ActorClaims, target: &TargetScope, op: Operation) -> Result<Grant> {
    let roles = actor.roles;

    if roles.system_super() {
        return Ok(Grant::SystemSuper);
    }
    if roles.entity_super() && actor.entity_id.is_some() && actor.entity_id == target.entity_id {
        return Ok(Grant::EntitySuper);
    }
    if roles.department_super()
        && actor.department_id.is_some()
        && actor.department_id == target.department_id
    {
        return Ok(Grant::DepartmentSuper);
    }
    if op != Operation::Admin && target.owner_id == Some(actor.user_id) {
        return Ok(Grant::Owner);
    }

    tracing::debug!(
        actor = actor.user_id,
        ?op,
        entity_id = ?target.entity_id,
        department_id = ?target.department_id,
        "permission denied"
    );
    Err(Error::PermissionDenied)
}

/// Refuses a destructive operation on the actor's own user.
pub fn forbid_self(actor: &ActorClaims, target_user_id: i64) -> Result<()> {
    if actor.user_id == target_user_id {
        return Err(Error::DeleteSelf);
    }
    Ok(())
}

/// Evaluates a destructive operation on a user such as delete or ban.
/// Self-removal is rejected before the general rules run, and the actor must
/// be able to grant every tier the target holds.
pub fn evaluate_destructive(actor: &ActorClaims, target: &User) -> Result<Grant> {
    forbid_self(actor, target.id)?;
    let scope = TargetScope::user(target);
    let grant = evaluate(actor, &scope, Operation::Admin)?;
    if !grantable_roles(actor, &scope).has(target.roles) {
        tracing::debug!(
            actor = actor.user_id,
            target = target.id,
            "target holds a higher tier than the actor"
        );
        return Err(Error::PermissionDenied);
    }
    Ok(grant)
}

/// Shorthand for [`evaluate`] when the granting rule does not matter.
pub fn require(actor: &ActorClaims, target: &TargetScope, op: Operation) -> Result<()> {
    evaluate(actor, target, op).map(|_| ())
}

/// Role flags `actor` may grant or revoke on a user in `target`: every tier
/// the actor holds over that scope and the tiers below it.
#[must_use]
pub fn grantable_roles(actor: &ActorClaims, target: &TargetScope) -> RoleFlags {
    let roles = actor.roles;
    let mut grantable = RoleFlags::NONE;

    if roles.system_super() {
        grantable = grantable
            .union(RoleFlags::SYSTEM_SUPER)
            .union(RoleFlags::ENTITY_SUPER)
            .union(RoleFlags::DEPARTMENT_SUPER);
    }
    if roles.entity_super() && actor.entity_id.is_some() && actor.entity_id == target.entity_id {
        grantable = grantable
            .union(RoleFlags::ENTITY_SUPER)
            .union(RoleFlags::DEPARTMENT_SUPER);
    }
    if roles.department_super()
        && actor.department_id.is_some()
        && actor.department_id == target.department_id
    {
        grantable = grantable.union(RoleFlags::DEPARTMENT_SUPER);
    }
    grantable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(roles: RoleFlags, entity: Option<i64>, dept: Option<i64>) -> ActorClaims {
        ActorClaims {
            user_id: 1,
            username: "actor".to_string(),
            roles,
            entity_id: entity,
            department_id: dept,
        }
    }

    // Entity 1 holds departments 10 and 11, entity 2 holds department 20.
    const TARGETS: [(i64, i64); 3] = [(1, 10), (1, 11), (2, 20)];

    #[test]
    fn test_system_super_reaches_everything() {
        let a = actor(RoleFlags::SYSTEM_SUPER, None, None);
        for (e, d) in TARGETS {
            for op in [Operation::Read, Operation::Write, Operation::Admin] {
                assert_eq!(
                    evaluate(&a, &TargetScope::department(e, d), op).unwrap(),
                    Grant::SystemSuper
                );
            }
        }
        assert!(evaluate(&a, &TargetScope::system(), Operation::Admin).is_ok());
    }

    #[test]
    fn test_entity_super_is_bounded_by_entity() {
        let a = actor(RoleFlags::ENTITY_SUPER, Some(1), Some(10));
        for (e, d) in TARGETS {
            let result = evaluate(&a, &TargetScope::department(e, d), Operation::Admin);
            if e == 1 {
                assert_eq!(result.unwrap(), Grant::EntitySuper);
            } else {
                assert!(matches!(result, Err(Error::PermissionDenied)));
            }
        }
        assert!(evaluate(&a, &TargetScope::system(), Operation::Read).is_err());
    }

    #[test]
    fn test_department_super_is_bounded_by_department() {
        let a = actor(RoleFlags::DEPARTMENT_SUPER, Some(1), Some(10));
        for (e, d) in TARGETS {
            let result = evaluate(&a, &TargetScope::department(e, d), Operation::Write);
            if d == 10 {
                assert_eq!(result.unwrap(), Grant::DepartmentSuper);
            } else {
                assert!(matches!(result, Err(Error::PermissionDenied)));
            }
        }
        // Department authority does not reach the entity itself.
        assert!(evaluate(&a, &TargetScope::entity(1), Operation::Write).is_err());
    }

    #[test]
    fn test_flags_are_independent() {
        // Entity super of entity 1 but department super of a department in
        // entity 2: each flag only reaches its own scope.
        let a = actor(
            RoleFlags::ENTITY_SUPER.union(RoleFlags::DEPARTMENT_SUPER),
            Some(1),
            Some(20),
        );
        assert_eq!(
            evaluate(&a, &TargetScope::department(1, 11), Operation::Write).unwrap(),
            Grant::EntitySuper
        );
        assert_eq!(
            evaluate(&a, &TargetScope::department(2, 20), Operation::Write).unwrap(),
            Grant::DepartmentSuper
        );
    }

    #[test]
    fn test_first_matching_rule_is_reported() {
        let a = actor(
            RoleFlags::ENTITY_SUPER.union(RoleFlags::DEPARTMENT_SUPER),
            Some(1),
            Some(10),
        );
        assert_eq!(
            evaluate(&a, &TargetScope::department(1, 10), Operation::Write).unwrap(),
            Grant::EntitySuper
        );
    }

    #[test]
    fn test_owner_reads_and_writes_but_never_admins() {
        let a = actor(RoleFlags::NONE, Some(1), Some(10));
        let own = TargetScope {
            owner_id: Some(1),
            ..TargetScope::department(1, 10)
        };
        assert_eq!(evaluate(&a, &own, Operation::Read).unwrap(), Grant::Owner);
        assert_eq!(evaluate(&a, &own, Operation::Write).unwrap(), Grant::Owner);
        assert!(matches!(
            evaluate(&a, &own, Operation::Admin),
            Err(Error::PermissionDenied)
        ));

        let other = TargetScope {
            owner_id: Some(2),
            ..TargetScope::department(1, 10)
        };
        assert!(evaluate(&a, &other, Operation::Read).is_err());
    }

    #[test]
    fn test_self_removal_is_always_refused() {
        let now = chrono::Utc::now();
        for roles in [
            RoleFlags::SYSTEM_SUPER,
            RoleFlags::ENTITY_SUPER,
            RoleFlags::DEPARTMENT_SUPER,
        ] {
            let a = actor(roles, Some(1), Some(10));
            let me = User {
                id: 1,
                username: "actor".to_string(),
                password_hash: String::new(),
                banned: false,
                entity_id: Some(1),
                department_id: Some(10),
                roles,
                created_at: now,
                updated_at: now,
            };
            assert!(matches!(
                evaluate_destructive(&a, &me),
                Err(Error::DeleteSelf)
            ));

            let peer = User { id: 2, ..me };
            assert!(evaluate_destructive(&a, &peer).is_ok());
        }
    }

    #[test]
    fn test_lower_tier_cannot_remove_higher_tier() {
        let now = chrono::Utc::now();
        let dept = actor(RoleFlags::DEPARTMENT_SUPER, Some(1), Some(10));
        let boss = User {
            id: 2,
            username: "boss".to_string(),
            password_hash: String::new(),
            banned: false,
            entity_id: Some(1),
            department_id: Some(10),
            roles: RoleFlags::ENTITY_SUPER,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            evaluate_destructive(&dept, &boss),
            Err(Error::PermissionDenied)
        ));

        let root = User {
            roles: RoleFlags::SYSTEM_SUPER,
            ..boss.clone()
        };
        let entity = actor(RoleFlags::ENTITY_SUPER, Some(1), Some(11));
        assert!(evaluate_destructive(&entity, &boss).is_ok());
        assert!(matches!(
            evaluate_destructive(&entity, &root),
            Err(Error::PermissionDenied)
        ));

        let plain = User {
            roles: RoleFlags::NONE,
            ..boss
        };
        assert!(evaluate_destructive(&dept, &plain).is_ok());
    }

    #[test]
    fn test_grantable_roles_follow_tier() {
        let entity = actor(RoleFlags::ENTITY_SUPER, Some(1), Some(10));
        let granted = grantable_roles(&entity, &TargetScope::department(1, 11));
        assert!(granted.entity_super() && granted.department_super());
        assert!(!granted.system_super());
        assert!(grantable_roles(&entity, &TargetScope::department(2, 20)).is_empty());

        let dept = actor(RoleFlags::DEPARTMENT_SUPER, Some(1), Some(10));
        assert_eq!(
            grantable_roles(&dept, &TargetScope::department(1, 10)),
            RoleFlags::DEPARTMENT_SUPER
        );
        assert!(grantable_roles(&dept, &TargetScope::department(1, 11)).is_empty());

        let root = actor(RoleFlags::SYSTEM_SUPER, None, None);
        assert_eq!(grantable_roles(&root, &TargetScope::system()).bits(), 7);
    }

    #[test]
    fn test_actor_without_scope_matches_nothing() {
        let a = actor(
            RoleFlags::ENTITY_SUPER.union(RoleFlags::DEPARTMENT_SUPER),
            None,
            None,
        );
        assert!(evaluate(&a, &TargetScope::system(), Operation::Read).is_err());
        assert!(evaluate(&a, &TargetScope::default(), Operation::Read).is_err());
    }
}
