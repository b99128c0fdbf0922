use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Token, User};

const MAX_RETRIES: usize = 3;

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str> {
    let header = header.map(str::trim_start).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(Error::TokenEmpty);
    };

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(Error::TokenInvalid)?
        .trim();
    if token.is_empty() {
        return Err(Error::TokenEmpty);
    }
    Ok(token)
}

/// Issues a token for `user_id`, retrying on lookup collisions.
/// Returns the stored row and the raw token handed to the client.
pub fn issue_token(
    store: &dyn Store,
    user_id: i64,
    ttl: Option<Duration>,
) -> Result<(Token, String)> {
    let generator = TokenGenerator::new();

    for _ in 0..MAX_RETRIES {
        let minted = generator.mint()?;
        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: minted.hash,
            token_lookup: minted.lookup,
            user_id,
            created_at: now,
            expires_at: ttl.map(|d| now + d),
            last_used_at: None,
        };

        match store.create_token(&token) {
            Ok(()) => return Ok((token, minted.raw)),
            Err(Error::TokenLookupCollision) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::Internal(
        "failed to create token after retries".to_string(),
    ))
}

/// Validates a raw token and loads the user behind it.
///
/// Unknown or mismatching tokens are `TokenInvalid`, stale ones
/// `TokenExpired`, and banned users are refused with `PermissionDenied`.
pub fn validate_token(store: &dyn Store, raw_token: &str) -> Result<(Token, User)> {
    let parts = parse_token(raw_token)?;

    let token = store
        .get_token_by_lookup(parts.lookup)?
        .ok_or(Error::TokenInvalid)?;

    if !TokenGenerator::new().verify(raw_token, &token.token_hash)? {
        return Err(Error::TokenInvalid);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(Error::TokenExpired);
        }
    }

    let user = store.get_user(token.user_id)?.ok_or(Error::TokenInvalid)?;
    if user.banned {
        return Err(Error::PermissionDenied);
    }

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok((token, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{NewUser, RoleFlags};

    fn store_with_user() -> (SqliteStore, User) {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        let user = store
            .create_user(&NewUser {
                username: "ada".to_string(),
                password_hash: String::new(),
                entity_id: None,
                department_id: None,
                roles: RoleFlags::NONE,
            })
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_extract_bearer() {
        assert!(matches!(extract_bearer(None), Err(Error::TokenEmpty)));
        assert!(matches!(extract_bearer(Some("  ")), Err(Error::TokenEmpty)));
        assert!(matches!(extract_bearer(Some("Bearer ")), Err(Error::TokenEmpty)));
        assert!(matches!(
            extract_bearer(Some("Basic abc")),
            Err(Error::TokenInvalid)
        ));
        assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_issue_and_validate() {
        let (store, user) = store_with_user();
        let (_, raw) = issue_token(&store, user.id, None).unwrap();

        let (_, found) = validate_token(&store, &raw).unwrap();
        assert_eq!(found.id, user.id);

        let forged = format!("{}zzzzz", &raw[..raw.len() - 5]);
        assert!(matches!(
            validate_token(&store, &forged),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn test_expired_and_banned() {
        let (store, user) = store_with_user();

        let (_, stale) = issue_token(&store, user.id, Some(Duration::seconds(-1))).unwrap();
        assert!(matches!(
            validate_token(&store, &stale),
            Err(Error::TokenExpired)
        ));

        let (_, fresh) = issue_token(&store, user.id, None).unwrap();
        store.set_user_banned(user.id, true).unwrap();
        assert!(matches!(
            validate_token(&store, &fresh),
            Err(Error::PermissionDenied)
        ));
    }
}
