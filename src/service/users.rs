use chrono::{DateTime, Utc};

use super::Services;
use super::validation::{validate_password, validate_username};
use crate::auth::{generate_password, hash_password, issue_token, verify_password};
use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::store::UserFilter;
use crate::types::{ActorClaims, NewUser, RoleFlags, User, UserWithScope};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub token_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

/// A user to create. Without a password one is generated and returned.
#[derive(Debug, Clone, Default)]
pub struct NewUserRequest {
    pub username: String,
    pub password: Option<String>,
    pub entity_id: Option<i64>,
    pub department_id: Option<i64>,
    pub roles: RoleFlags,
}

/// Old and new password of a password change. The old password is only
/// checked when users change their own.
#[derive(Debug, Clone, Copy)]
pub struct PasswordChange<'a> {
    pub old_password: Option<&'a str>,
    pub new_password: &'a str,
}

fn ensure_grantable(actor: &ActorClaims, target: &TargetScope, roles: RoleFlags) -> Result<()> {
    let grantable = permission::grantable_roles(actor, target);
    if !roles.difference(grantable).is_empty() {
        tracing::debug!(
            actor = actor.user_id,
            requested = %roles,
            grantable = %grantable,
            "role change exceeds actor's tier"
        );
        return Err(Error::PermissionDenied);
    }
    Ok(())
}

impl Services {
    pub fn login(&self, username: &str, password: &str) -> Result<Login> {
        let user = self
            .store
            .get_user_by_username(username)?
            .ok_or(Error::UserNotFound)?;
        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(username, "login rejected: wrong password");
            return Err(Error::UserNotFound);
        }
        if user.banned {
            return Err(Error::PermissionDenied);
        }

        let (token, raw_token) = issue_token(self.store.as_ref(), user.id, self.token_ttl)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(Login {
            token: raw_token,
            token_id: token.id,
            expires_at: token.expires_at,
            user,
        })
    }

    pub fn logout(&self, token_id: &str) -> Result<()> {
        self.store.delete_token(token_id)?;
        Ok(())
    }

    /// Creates the first system super user. Used by `admin init`, outside
    /// any request.
    pub fn bootstrap_admin(
        &self,
        username: &str,
        password: Option<String>,
    ) -> Result<(User, Option<String>)> {
        validate_username(username)?;
        if let Some(password) = &password {
            validate_password(password)?;
        }
        self.insert_user(NewUserRequest {
            username: username.to_string(),
            password,
            entity_id: None,
            department_id: None,
            roles: RoleFlags::SYSTEM_SUPER,
        })
    }

    /// Creates a user placed in an entity and optionally a department.
    /// Returns the generated password when none was given.
    pub fn create_user(
        &self,
        actor: &ActorClaims,
        request: NewUserRequest,
    ) -> Result<(User, Option<String>)> {
        validate_username(&request.username)?;
        if let Some(password) = &request.password {
            validate_password(password)?;
        }

        let target = self.placement(request.entity_id, request.department_id)?;
        permission::require(actor, &target, Operation::Admin)?;
        ensure_grantable(actor, &target, request.roles)?;

        self.insert_user(NewUserRequest {
            entity_id: target.entity_id,
            department_id: target.department_id,
            ..request
        })
    }

    pub fn get_user(&self, actor: &ActorClaims, id: i64) -> Result<UserWithScope> {
        let user = self
            .store
            .get_user_with_department_and_entity(id)?
            .ok_or(Error::UserNotFound)?;
        permission::require(actor, &TargetScope::user(&user.user), Operation::Read)?;
        Ok(user)
    }

    /// Users after `cursor` in id order, at most `limit` of them.
    pub fn list_users(
        &self,
        actor: &ActorClaims,
        filter: UserFilter,
        cursor: i64,
        limit: i64,
    ) -> Result<Vec<User>> {
        match filter {
            UserFilter::All => {
                permission::require(actor, &TargetScope::system(), Operation::Read)?;
            }
            UserFilter::Entity(entity_id) => {
                self.store
                    .get_entity(entity_id)?
                    .ok_or(Error::EntityNotFound)?;
                permission::require(actor, &TargetScope::entity(entity_id), Operation::Read)?;
            }
            UserFilter::Department(department_id) => {
                self.require_department_read(actor, department_id)?;
            }
        }
        self.store.list_users(filter, cursor, limit)
    }

    /// Replaces a user's role flags.
    ///
    /// Every flag that changes must be within the actor's tier over the
    /// user's scope, and nobody may strip flags from themselves.
    pub fn set_roles(&self, actor: &ActorClaims, id: i64, roles: RoleFlags) -> Result<User> {
        let user = self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        let target = TargetScope::user(&user);
        permission::require(actor, &target, Operation::Admin)?;

        if actor.user_id == id && !user.roles.difference(roles).is_empty() {
            return Err(Error::DeleteSelf);
        }
        let changed = user
            .roles
            .difference(roles)
            .union(roles.difference(user.roles));
        ensure_grantable(actor, &target, changed)?;

        self.store.set_user_roles(id, roles)?;
        tracing::info!(actor = actor.user_id, user_id = id, roles = %roles, "roles changed");
        self.store.get_user(id)?.ok_or(Error::UserNotFound)
    }

    pub fn change_password(
        &self,
        actor: &ActorClaims,
        id: i64,
        change: PasswordChange<'_>,
    ) -> Result<()> {
        validate_password(change.new_password)?;
        let user = self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        permission::require(actor, &TargetScope::user(&user), Operation::Write)?;

        if actor.user_id == id {
            let old = change.old_password.ok_or(Error::PermissionDenied)?;
            if !verify_password(old, &user.password_hash)? {
                return Err(Error::PermissionDenied);
            }
        }

        self.store
            .set_user_password(id, &hash_password(change.new_password)?)?;
        tracing::info!(actor = actor.user_id, user_id = id, "password changed");
        Ok(())
    }

    /// Locks or unlocks a user. Nobody can lock themselves.
    pub fn set_banned(&self, actor: &ActorClaims, id: i64, banned: bool) -> Result<()> {
        let user = self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        permission::evaluate_destructive(actor, &user)?;
        self.store.set_user_banned(id, banned)?;
        tracing::info!(actor = actor.user_id, user_id = id, banned, "user lock changed");
        Ok(())
    }

    pub fn delete_user(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        let user = self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        permission::evaluate_destructive(actor, &user)?;
        if !self.store.delete_user(id)? {
            return Err(Error::UserNotFound);
        }
        tracing::info!(actor = actor.user_id, user_id = id, "user deleted");
        Ok(())
    }

    /// Moves a user to another entity and clears the department. System
    /// super only.
    pub fn change_user_entity(&self, actor: &ActorClaims, id: i64, entity_id: i64) -> Result<()> {
        permission::require(actor, &TargetScope::system(), Operation::Admin)?;
        self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        self.store
            .get_entity(entity_id)?
            .ok_or(Error::EntityNotFound)?;

        self.store.set_user_scope(id, Some(entity_id), None)?;
        tracing::info!(actor = actor.user_id, user_id = id, entity_id, "user moved to entity");
        Ok(())
    }

    /// Moves a user to another department of the same entity, authorized
    /// against the user's current scope.
    pub fn change_user_department(
        &self,
        actor: &ActorClaims,
        id: i64,
        department_id: i64,
    ) -> Result<()> {
        let user = self.store.get_user(id)?.ok_or(Error::UserNotFound)?;
        permission::require(actor, &TargetScope::user(&user), Operation::Admin)?;

        let entity_id = user.entity_id.ok_or(Error::UserNotInEntity)?;
        let department = self
            .store
            .get_department(department_id)?
            .ok_or(Error::DepartmentNotFound)?;
        if department.entity_id != entity_id {
            return Err(Error::DepartmentNotInEntity);
        }

        self.store
            .set_user_scope(id, Some(entity_id), Some(department_id))?;
        tracing::info!(
            actor = actor.user_id,
            user_id = id,
            department_id,
            "user moved to department"
        );
        Ok(())
    }

    /// Resolves where a new user lands. A department alone implies its
    /// entity.
    fn placement(&self, entity_id: Option<i64>, department_id: Option<i64>) -> Result<TargetScope> {
        if let Some(department_id) = department_id {
            let department = self
                .store
                .get_department(department_id)?
                .ok_or(Error::DepartmentNotFound)?;
            if entity_id.is_some_and(|e| e != department.entity_id) {
                return Err(Error::DepartmentNotInEntity);
            }
            return Ok(TargetScope::department(department.entity_id, department_id));
        }

        match entity_id {
            Some(entity_id) => {
                self.store
                    .get_entity(entity_id)?
                    .ok_or(Error::EntityNotFound)?;
                Ok(TargetScope::entity(entity_id))
            }
            None => Ok(TargetScope::system()),
        }
    }

    fn insert_user(&self, request: NewUserRequest) -> Result<(User, Option<String>)> {
        let (password, generated) = match request.password {
            Some(password) => (password, None),
            None => {
                let password = generate_password();
                (password.clone(), Some(password))
            }
        };

        let user = self.store.create_user(&NewUser {
            username: request.username,
            password_hash: hash_password(&password)?,
            entity_id: request.entity_id,
            department_id: request.department_id,
            roles: request.roles,
        })?;
        tracing::info!(user_id = user.id, username = %user.username, "user created");
        Ok((user, generated))
    }
}

impl UserFilter {
    /// Picks the narrowest filter the actor can see by default.
    #[must_use]
    pub fn default_for(actor: &ActorClaims) -> Self {
        if actor.roles.system_super() {
            return UserFilter::All;
        }
        match (actor.roles.entity_super(), actor.entity_id, actor.department_id) {
            (true, Some(entity_id), _) => UserFilter::Entity(entity_id),
            (_, _, Some(department_id)) => UserFilter::Department(department_id),
            (_, Some(entity_id), None) => UserFilter::Entity(entity_id),
            _ => UserFilter::All,
        }
    }
}
