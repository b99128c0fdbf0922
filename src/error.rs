use serde::Serialize;
use thiserror::Error;

use crate::types::TreeKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("token lookup collision")]
    TokenLookupCollision,

    // Validation
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("name cannot be empty")]
    NameEmpty,

    #[error("entity name cannot be empty")]
    EntityNameEmpty,

    #[error("department name cannot be empty")]
    DepartmentNameEmpty,

    #[error("price out of range")]
    PriceOutOfRange,

    #[error("target user cannot be empty")]
    TargetEmpty,

    #[error("asset list invalid")]
    AssetListInvalid,

    #[error("invalid type of asset class")]
    InvalidTypeOfClass,

    // Authentication and authorization
    #[error("token missing from request")]
    TokenEmpty,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("permission denied")]
    PermissionDenied,

    #[error("cannot delete or ban yourself")]
    DeleteSelf,

    // Not found
    #[error("user not found")]
    UserNotFound,

    #[error("target user not found")]
    TargetUserNotFound,

    #[error("entity not found")]
    EntityNotFound,

    #[error("department not found")]
    DepartmentNotFound,

    #[error("asset class not found")]
    AssetClassNotFound,

    #[error("parent asset class not found")]
    ParentAssetClassNotFound,

    #[error("asset not found")]
    AssetNotFound,

    #[error("parent asset not found")]
    ParentAssetNotFound,

    #[error("task not found")]
    TaskNotFound,

    // Integrity and conflicts
    #[error("duplicated name")]
    DuplicatedName,

    #[error("user already exists")]
    UserHasExisted,

    #[error("user not in entity")]
    UserNotInEntity,

    #[error("department not in entity")]
    DepartmentNotInEntity,

    #[error("user not in department")]
    UserNotInDepartment,

    #[error("entity has users")]
    EntityHasUsers,

    #[error("department has users")]
    DepartmentHasUsers,

    #[error("cannot set parent to a successor")]
    ParentCannotBeSuccessor,

    #[error("{0} parent is outside the node's scope")]
    CrossScope(TreeKind),

    #[error("{0} has children")]
    HasChildren(TreeKind),

    #[error("{0} is still referenced")]
    HasReferences(TreeKind),

    #[error("asset is held by another user")]
    AssetInUse,

    #[error("asset not in department")]
    AssetNotInDepartment,

    #[error("not in the same entity")]
    NotInSameEntity,

    #[error("target user is not department super")]
    TargetNotDepartmentSuper,

    #[error("task not in department")]
    TaskNotInDepartment,

    #[error("task {0} already finished")]
    TaskFinished(i64),

    #[error("{kind} hierarchy corrupted at node {id}")]
    HierarchyCorrupted { kind: TreeKind, id: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric codes surfaced at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i32")]
#[repr(i32)]
pub enum ErrorCode {
    AssetReferenced = -8,
    AssetInUse = -7,
    AssetHasSubAsset = -6,
    DepartmentHasAssets = -5,
    DepartmentHasSubDepartment = -4,
    IntegrityViolation = -3,
    Internal = -2,
    InvalidBody = -1,
    Success = 0,
    UserNotFound = 1,
    PermissionDenied = 2,
    DuplicatedName = 3,
    TokenEmpty = 5,
    TokenInvalid = 6,
    TokenExpired = 7,
    InvalidParam = 8,
    EntityNotFound = 9,
    UserHasExisted = 10,
    UserNotInEntity = 11,
    NameCannotEmpty = 12,
    DepartmentNotFound = 13,
    DepartmentNotInEntity = 14,
    UserNotInDepartment = 15,
    EntityHasUsers = 16,
    DeleteSelf = 17,
    DepartmentHasUsers = 18,
    AssetClassNotFound = 19,
    ParentAssetClassNotFound = 20,
    InvalidTypeOfClass = 21,
    ParentCannotBeSuccessor = 22,
    ClassHasAsset = 23,
    AssetNotFound = 24,
    AssetNotInDepartment = 25,
    ParentAssetNotFound = 26,
    TargetUserNotFound = 27,
    NotInSameEntity = 28,
    TargetNotDepartmentSuper = 29,
    ClassHasSubClass = 30,
    PriceOutOfRange = 31,
    EntityNameCannotBeEmpty = 32,
    DepartmentNameCannotBeEmpty = 33,
    TargetEmpty = 34,
    AssetListInvalid = 35,
    TaskNotFound = 36,
    TaskNotInDepartment = 37,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

/// Coarse classification used to pick a transport status and log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Integrity,
    Internal,
}

impl Error {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::TokenLookupCollision => ErrorCode::Internal,
            Error::HierarchyCorrupted { .. } => ErrorCode::IntegrityViolation,
            Error::InvalidBody(_) => ErrorCode::InvalidBody,
            Error::InvalidParam(_) | Error::TaskFinished(_) => ErrorCode::InvalidParam,
            Error::NameEmpty => ErrorCode::NameCannotEmpty,
            Error::EntityNameEmpty => ErrorCode::EntityNameCannotBeEmpty,
            Error::DepartmentNameEmpty => ErrorCode::DepartmentNameCannotBeEmpty,
            Error::PriceOutOfRange => ErrorCode::PriceOutOfRange,
            Error::TargetEmpty => ErrorCode::TargetEmpty,
            Error::AssetListInvalid => ErrorCode::AssetListInvalid,
            Error::AssetInUse => ErrorCode::AssetInUse,
            Error::InvalidTypeOfClass => ErrorCode::InvalidTypeOfClass,
            Error::TokenEmpty => ErrorCode::TokenEmpty,
            Error::TokenInvalid => ErrorCode::TokenInvalid,
            Error::TokenExpired => ErrorCode::TokenExpired,
            Error::PermissionDenied => ErrorCode::PermissionDenied,
            Error::DeleteSelf => ErrorCode::DeleteSelf,
            Error::UserNotFound => ErrorCode::UserNotFound,
            Error::TargetUserNotFound => ErrorCode::TargetUserNotFound,
            Error::EntityNotFound => ErrorCode::EntityNotFound,
            Error::DepartmentNotFound => ErrorCode::DepartmentNotFound,
            Error::AssetClassNotFound => ErrorCode::AssetClassNotFound,
            Error::ParentAssetClassNotFound => ErrorCode::ParentAssetClassNotFound,
            Error::AssetNotFound => ErrorCode::AssetNotFound,
            Error::ParentAssetNotFound => ErrorCode::ParentAssetNotFound,
            Error::TaskNotFound => ErrorCode::TaskNotFound,
            Error::DuplicatedName => ErrorCode::DuplicatedName,
            Error::UserHasExisted => ErrorCode::UserHasExisted,
            Error::UserNotInEntity => ErrorCode::UserNotInEntity,
            Error::DepartmentNotInEntity => ErrorCode::DepartmentNotInEntity,
            Error::UserNotInDepartment => ErrorCode::UserNotInDepartment,
            Error::EntityHasUsers => ErrorCode::EntityHasUsers,
            Error::DepartmentHasUsers => ErrorCode::DepartmentHasUsers,
            Error::ParentCannotBeSuccessor => ErrorCode::ParentCannotBeSuccessor,
            Error::CrossScope(kind) => match kind {
                TreeKind::Department => ErrorCode::DepartmentNotInEntity,
                TreeKind::AssetClass => ErrorCode::ParentAssetClassNotFound,
                TreeKind::Asset => ErrorCode::AssetNotInDepartment,
            },
            Error::HasChildren(kind) => match kind {
                TreeKind::AssetClass => ErrorCode::ClassHasSubClass,
                TreeKind::Department => ErrorCode::DepartmentHasSubDepartment,
                TreeKind::Asset => ErrorCode::AssetHasSubAsset,
            },
            Error::HasReferences(kind) => match kind {
                TreeKind::AssetClass => ErrorCode::ClassHasAsset,
                TreeKind::Department => ErrorCode::DepartmentHasAssets,
                TreeKind::Asset => ErrorCode::AssetReferenced,
            },
            Error::AssetNotInDepartment => ErrorCode::AssetNotInDepartment,
            Error::NotInSameEntity => ErrorCode::NotInSameEntity,
            Error::TargetNotDepartmentSuper => ErrorCode::TargetNotDepartmentSuper,
            Error::TaskNotInDepartment => ErrorCode::TaskNotInDepartment,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::TokenLookupCollision => ErrorClass::Internal,
            Error::InvalidBody(_)
            | Error::InvalidParam(_)
            | Error::NameEmpty
            | Error::EntityNameEmpty
            | Error::DepartmentNameEmpty
            | Error::PriceOutOfRange
            | Error::TargetEmpty
            | Error::AssetListInvalid
            | Error::InvalidTypeOfClass => ErrorClass::Validation,
            Error::TokenEmpty | Error::TokenInvalid | Error::TokenExpired => {
                ErrorClass::Authentication
            }
            Error::PermissionDenied | Error::DeleteSelf => ErrorClass::Authorization,
            Error::UserNotFound
            | Error::TargetUserNotFound
            | Error::EntityNotFound
            | Error::DepartmentNotFound
            | Error::AssetClassNotFound
            | Error::ParentAssetClassNotFound
            | Error::AssetNotFound
            | Error::ParentAssetNotFound
            | Error::TaskNotFound => ErrorClass::NotFound,
            _ => ErrorClass::Integrity,
        }
    }

    /// Not-found error for a node of the given tree.
    #[must_use]
    pub fn node_not_found(kind: TreeKind) -> Self {
        match kind {
            TreeKind::Department => Error::DepartmentNotFound,
            TreeKind::AssetClass => Error::AssetClassNotFound,
            TreeKind::Asset => Error::AssetNotFound,
        }
    }

    /// Not-found error for a requested parent in the given tree.
    #[must_use]
    pub fn parent_not_found(kind: TreeKind) -> Self {
        match kind {
            TreeKind::Department => Error::DepartmentNotFound,
            TreeKind::AssetClass => Error::ParentAssetClassNotFound,
            TreeKind::Asset => Error::ParentAssetNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(i32::from(Error::InvalidBody("x".into()).code()), -1);
        assert_eq!(i32::from(Error::PermissionDenied.code()), 2);
        assert_eq!(i32::from(Error::ParentCannotBeSuccessor.code()), 22);
        assert_eq!(i32::from(Error::TaskNotInDepartment.code()), 37);
        assert_eq!(
            Error::HasChildren(TreeKind::AssetClass).code(),
            ErrorCode::ClassHasSubClass
        );
        assert_eq!(
            Error::HasReferences(TreeKind::AssetClass).code(),
            ErrorCode::ClassHasAsset
        );
    }

    #[test]
    fn test_delete_guards_have_distinct_codes() {
        let errors = [
            Error::DepartmentHasUsers,
            Error::HasChildren(TreeKind::Department),
            Error::HasReferences(TreeKind::Department),
            Error::HasChildren(TreeKind::AssetClass),
            Error::HasReferences(TreeKind::AssetClass),
            Error::HasChildren(TreeKind::Asset),
            Error::HasReferences(TreeKind::Asset),
            Error::AssetInUse,
            Error::AssetListInvalid,
            Error::InvalidParam("x".into()),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| i32::from(e.code())).collect();
        for (i, code) in codes.iter().enumerate() {
            assert!(!codes[i + 1..].contains(code), "{:?} shares code {code}", errors[i]);
        }
        assert_eq!(i32::from(Error::HasReferences(TreeKind::Department).code()), -5);
        assert_eq!(i32::from(Error::AssetInUse.code()), -7);
    }

    #[test]
    fn test_classes() {
        assert_eq!(Error::DeleteSelf.class(), ErrorClass::Authorization);
        assert_eq!(Error::TokenExpired.class(), ErrorClass::Authentication);
        assert_eq!(Error::AssetNotFound.class(), ErrorClass::NotFound);
        assert_eq!(Error::CrossScope(TreeKind::Asset).class(), ErrorClass::Integrity);
        assert_eq!(
            Error::HierarchyCorrupted {
                kind: TreeKind::Asset,
                id: 1
            }
            .class(),
            ErrorClass::Integrity
        );
        assert_eq!(Error::PriceOutOfRange.class(), ErrorClass::Validation);
    }
}
