use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use uuid::Uuid;

use super::password::{hash_with, verify_with};
use crate::error::{Error, Result};

// Tokens carry 96 random bits, so a light Argon2 setting is enough.
const TOKEN_MEMORY_KIB: u32 = 64 * 1024;
const TOKEN_PASSES: u32 = 1;
const TOKEN_LANES: u32 = 4;

const TOKEN_PREFIX: &str = "assetry";
const LOOKUP_LEN: usize = 8;
const SECRET_BYTES: usize = 12;

/// A freshly minted bearer token. `raw` goes to the client once; only
/// `hash` is persisted, found again through `lookup`.
#[derive(Debug)]
pub struct MintedToken {
    pub raw: String,
    pub lookup: String,
    pub hash: String,
}

/// Segments of a raw `assetry_<lookup>_<secret>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub lookup: &'a str,
    pub secret: &'a str,
}

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(TOKEN_MEMORY_KIB, TOKEN_PASSES, TOKEN_LANES, None)
            .unwrap_or_default();
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn mint(&self) -> Result<MintedToken> {
        let lookup = Uuid::new_v4().simple().to_string()[..LOOKUP_LEN].to_string();

        let mut secret = [0u8; SECRET_BYTES];
        rand::thread_rng().fill(&mut secret);
        let raw = format!("{TOKEN_PREFIX}_{lookup}_{}", hex::encode(secret));

        let hash = hash_with(&self.argon2, &raw)?;
        Ok(MintedToken { raw, lookup, hash })
    }

    pub fn verify(&self, raw: &str, hash: &str) -> Result<bool> {
        verify_with(&self.argon2, raw, hash)
    }
}

/// Splits a raw token. Anything not shaped like a minted token is
/// [`Error::TokenInvalid`].
pub fn parse_token(raw: &str) -> Result<TokenParts<'_>> {
    let (prefix, rest) = raw.split_once('_').ok_or(Error::TokenInvalid)?;
    let (lookup, secret) = rest.split_once('_').ok_or(Error::TokenInvalid)?;

    let well_formed = prefix == TOKEN_PREFIX
        && lookup.len() == LOOKUP_LEN
        && secret.len() == SECRET_BYTES * 2
        && secret.bytes().all(|b| b.is_ascii_hexdigit());
    if !well_formed {
        return Err(Error::TokenInvalid);
    }
    Ok(TokenParts { lookup, secret })
}
