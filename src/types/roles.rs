use std::fmt;

use serde::{Deserialize, Serialize};

/// RoleFlags is a bitmask of the super-user tiers a user holds.
///
/// Flags are additive: a user may hold any combination, and every tier is
/// evaluated against its own scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFlags(u32);

impl RoleFlags {
    pub const NONE: RoleFlags = RoleFlags(0);
    pub const DEPARTMENT_SUPER: RoleFlags = RoleFlags(1 << 0); // 1
    pub const ENTITY_SUPER: RoleFlags = RoleFlags(1 << 1); // 2
    pub const SYSTEM_SUPER: RoleFlags = RoleFlags(1 << 2); // 4

    const ALL: u32 = Self::DEPARTMENT_SUPER.0 | Self::ENTITY_SUPER.0 | Self::SYSTEM_SUPER.0;

    pub const fn new(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every flag in `required` is set.
    #[must_use]
    pub const fn has(self, required: RoleFlags) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: RoleFlags) -> RoleFlags {
        RoleFlags(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: RoleFlags) -> RoleFlags {
        RoleFlags(self.0 & !other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn system_super(self) -> bool {
        self.has(Self::SYSTEM_SUPER)
    }

    #[must_use]
    pub const fn entity_super(self) -> bool {
        self.has(Self::ENTITY_SUPER)
    }

    #[must_use]
    pub const fn department_super(self) -> bool {
        self.has(Self::DEPARTMENT_SUPER)
    }

    /// Builds flags from the three independent booleans used on the wire.
    #[must_use]
    pub fn from_parts(system_super: bool, entity_super: bool, department_super: bool) -> Self {
        let mut flags = Self::NONE;
        if system_super {
            flags = flags.union(Self::SYSTEM_SUPER);
        }
        if entity_super {
            flags = flags.union(Self::ENTITY_SUPER);
        }
        if department_super {
            flags = flags.union(Self::DEPARTMENT_SUPER);
        }
        flags
    }

    pub fn parse(s: &str) -> Option<RoleFlags> {
        match s {
            "department_super" => Some(Self::DEPARTMENT_SUPER),
            "entity_super" => Some(Self::ENTITY_SUPER),
            "system_super" => Some(Self::SYSTEM_SUPER),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut roles = Vec::new();
        if self.system_super() {
            roles.push("system_super");
        }
        if self.entity_super() {
            roles.push("entity_super");
        }
        if self.department_super() {
            roles.push("department_super");
        }
        roles
    }
}

impl fmt::Display for RoleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for RoleFlags {
    fn from(bits: i64) -> Self {
        Self::new(bits as u32)
    }
}

impl From<RoleFlags> for i64 {
    fn from(r: RoleFlags) -> Self {
        i64::from(r.0)
    }
}
