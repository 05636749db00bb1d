use std::fmt::{Display, Formatter};
use std::str::FromStr;

use orgaccess_core::AppError;
use serde::{Deserialize, Serialize};

/// Roles that can be stored on a membership row.
///
/// The synthetic reporter role is deliberately absent: it only exists as an
/// [`AccessRole`] derived from delegations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// Full control of the organization and its subtree.
    Owner,
    /// Administrative access to the organization and its subtree.
    Admin,
    /// Day-to-day management without administrative settings.
    Manager,
    /// Regular member access.
    Member,
    /// Read-only access.
    Viewer,
}

impl MembershipRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Returns all storable roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[MembershipRole] = &[
            MembershipRole::Owner,
            MembershipRole::Admin,
            MembershipRole::Manager,
            MembershipRole::Member,
            MembershipRole::Viewer,
        ];

        ALL
    }
}

impl FromStr for MembershipRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            "reporter" => Err(AppError::Validation(
                "role 'reporter' is derived from delegations and cannot be stored".to_owned(),
            )),
            _ => Err(AppError::Validation(format!(
                "unknown membership role '{value}'"
            ))),
        }
    }
}

/// Effective role a user holds at one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRole {
    /// Inherited or direct owner membership.
    Owner,
    /// Inherited or direct admin membership, or the global admin override.
    Admin,
    /// Inherited or direct manager membership.
    Manager,
    /// Inherited or direct member membership.
    Member,
    /// Inherited or direct viewer membership.
    Viewer,
    /// Synthetic role for access derived purely from a delegation.
    Reporter,
}

impl AccessRole {
    /// Returns a stable transport value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
            Self::Viewer => "viewer",
            Self::Reporter => "reporter",
        }
    }

    /// Returns the rank of this role; higher ranks include lower ones.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Owner => 5,
            Self::Admin => 4,
            Self::Manager => 3,
            Self::Member => 2,
            Self::Viewer => 1,
            Self::Reporter => 0,
        }
    }

    /// Returns whether this role is at least as strong as `minimum`.
    #[must_use]
    pub fn satisfies(&self, minimum: AccessRole) -> bool {
        self.precedence() >= minimum.precedence()
    }

    /// Returns whether this role was derived from a delegation.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Reporter)
    }
}

impl From<MembershipRole> for AccessRole {
    fn from(value: MembershipRole) -> Self {
        match value {
            MembershipRole::Owner => Self::Owner,
            MembershipRole::Admin => Self::Admin,
            MembershipRole::Manager => Self::Manager,
            MembershipRole::Member => Self::Member,
            MembershipRole::Viewer => Self::Viewer,
        }
    }
}

impl FromStr for AccessRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "reporter" {
            return Ok(Self::Reporter);
        }

        MembershipRole::from_str(value)
            .map(Self::from)
            .map_err(|_| AppError::Validation(format!("unknown access role '{value}'")))
    }
}

impl Display for AccessRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AccessRole, MembershipRole};

    #[test]
    fn membership_role_roundtrip_storage_value() {
        for role in MembershipRole::all() {
            let restored = MembershipRole::from_str(role.as_str());
            assert_eq!(restored.ok(), Some(*role));
        }
    }

    #[test]
    fn reporter_cannot_be_stored_on_membership() {
        assert!(MembershipRole::from_str("reporter").is_err());
        assert_eq!(
            AccessRole::from_str("reporter").ok(),
            Some(AccessRole::Reporter)
        );
    }

    #[test]
    fn precedence_orders_owner_above_reporter() {
        assert!(AccessRole::Owner.satisfies(AccessRole::Admin));
        assert!(AccessRole::Admin.satisfies(AccessRole::Admin));
        assert!(!AccessRole::Viewer.satisfies(AccessRole::Manager));
        assert!(!AccessRole::Reporter.satisfies(AccessRole::Viewer));
        assert!(AccessRole::Reporter.satisfies(AccessRole::Reporter));
    }

    #[test]
    fn membership_roles_map_onto_access_roles() {
        for role in MembershipRole::all() {
            let access_role = AccessRole::from(*role);
            assert_eq!(access_role.as_str(), role.as_str());
            assert!(!access_role.is_synthetic());
        }
    }
}
