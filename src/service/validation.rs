use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{AssetUpdate, NewAsset};

const MAX_NAME_LEN: usize = 128;
const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PRICE: f64 = 1e9;

fn is_valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Trims `name` and rejects it with `empty` when nothing is left.
pub fn validate_name(name: &str, empty: Error) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(empty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidParam(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::NameEmpty);
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(Error::InvalidParam(format!(
            "username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username.chars().all(is_valid_username_char) {
        return Err(Error::InvalidParam(
            "username can only contain alphanumeric characters, hyphens, underscores, and periods"
                .to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidParam(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || !(0.0..=MAX_PRICE).contains(&price) {
        return Err(Error::PriceOutOfRange);
    }
    Ok(())
}

pub fn validate_number(number: i64) -> Result<()> {
    if number < 1 {
        return Err(Error::InvalidParam("number must be at least 1".to_string()));
    }
    Ok(())
}

/// Checks every asset of a nested creation request and returns it with
/// trimmed names.
pub fn validate_new_assets(assets: &[NewAsset]) -> Result<Vec<NewAsset>> {
    if assets.is_empty() {
        return Err(Error::AssetListInvalid);
    }
    assets
        .iter()
        .map(|asset| {
            let name = validate_name(&asset.name, Error::NameEmpty)?;
            validate_price(asset.price)?;
            validate_number(asset.number)?;
            let children = if asset.children.is_empty() {
                Vec::new()
            } else {
                validate_new_assets(&asset.children)?
            };
            Ok(NewAsset {
                name,
                children,
                ..asset.clone()
            })
        })
        .collect()
}

pub fn validate_asset_update(update: &AssetUpdate) -> Result<AssetUpdate> {
    if update.is_empty() {
        return Err(Error::InvalidBody("no fields to update".to_string()));
    }
    let name = update
        .name
        .as_deref()
        .map(|name| validate_name(name, Error::NameEmpty))
        .transpose()?;
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    if let Some(number) = update.number {
        validate_number(number)?;
    }
    Ok(AssetUpdate {
        name,
        ..update.clone()
    })
}

/// Rejects empty id lists and lists naming an asset twice.
pub fn validate_ids(ids: &[i64]) -> Result<()> {
    let unique: HashSet<i64> = ids.iter().copied().collect();
    if ids.is_empty() || unique.len() != ids.len() {
        return Err(Error::AssetListInvalid);
    }
    Ok(())
}
