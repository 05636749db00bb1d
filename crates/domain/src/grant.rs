use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orgaccess_core::{AppError, GrantId, NonEmptyString, OrganizationId, UserId};
use serde::{Deserialize, Serialize};

use crate::{AccessRole, MembershipRole};

/// Lifecycle status of a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Membership participates in access resolution.
    Active,
    /// Invitation not yet accepted.
    Pending,
    /// Membership was removed.
    Removed,
}

impl MembershipStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Removed => "removed",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "removed" => Ok(Self::Removed),
            _ => Err(AppError::Validation(format!(
                "unknown membership status '{value}'"
            ))),
        }
    }
}

/// Role directly assigned to a user at one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipGrant {
    /// Stable grant id.
    pub id: GrantId,
    /// Organization the role was assigned at.
    pub organization_id: OrganizationId,
    /// Member user.
    pub user_id: UserId,
    /// Assigned role.
    pub role: MembershipRole,
    /// Lifecycle status.
    pub status: MembershipStatus,
}

/// Time-bounded, scope-limited access granted at one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationGrant {
    /// Stable grant id.
    pub id: GrantId,
    /// Organization the delegation was recorded at.
    pub organization_id: OrganizationId,
    /// User receiving the delegation.
    pub delegate_user_id: UserId,
    /// Scope tag, for example `reporting`.
    pub scope: NonEmptyString,
    /// Revocation timestamp, when revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Expiry timestamp, when time-bounded.
    pub expires_at: Option<DateTime<Utc>>,
}

impl DelegationGrant {
    /// Returns whether the grant is neither revoked nor expired at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Channel an effective grant was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessSource {
    /// Platform-wide administrator override.
    GlobalAdmin,
    /// Membership recorded at `origin`, inherited down to the resolved organization.
    Membership {
        /// Organization holding the membership.
        origin: OrganizationId,
    },
    /// Delegation recorded at `origin`, inherited down to the resolved organization.
    Delegation {
        /// Organization holding the delegation.
        origin: OrganizationId,
    },
}

/// Effective access for one organization. Computed, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Resolved organization.
    pub organization_id: OrganizationId,
    /// Effective role.
    pub role: AccessRole,
    /// Live delegation scopes; only populated at the delegation origin itself.
    pub delegated_scopes: BTreeSet<String>,
    /// Provenance of the grant.
    pub source: AccessSource,
}

impl AccessGrant {
    /// Builds the grant returned for global administrators.
    #[must_use]
    pub fn global_admin(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            role: AccessRole::Admin,
            delegated_scopes: BTreeSet::new(),
            source: AccessSource::GlobalAdmin,
        }
    }

    /// Builds a membership-derived grant.
    #[must_use]
    pub fn from_membership(
        organization_id: OrganizationId,
        role: MembershipRole,
        origin: OrganizationId,
    ) -> Self {
        Self {
            organization_id,
            role: role.into(),
            delegated_scopes: BTreeSet::new(),
            source: AccessSource::Membership { origin },
        }
    }

    /// Builds a delegation-derived reporter grant.
    ///
    /// `origin_scopes` are kept only when the resolved organization is the origin.
    #[must_use]
    pub fn from_delegation(
        organization_id: OrganizationId,
        origin: OrganizationId,
        origin_scopes: &BTreeSet<String>,
    ) -> Self {
        let delegated_scopes = if organization_id == origin {
            origin_scopes.clone()
        } else {
            BTreeSet::new()
        };

        Self {
            organization_id,
            role: AccessRole::Reporter,
            delegated_scopes,
            source: AccessSource::Delegation { origin },
        }
    }

    /// Returns whether the grant includes the given delegated scope.
    #[must_use]
    pub fn has_delegated_scope(&self, scope: &str) -> bool {
        self.delegated_scopes.contains(scope)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, TimeZone, Utc};
    use orgaccess_core::{GrantId, NonEmptyString, OrganizationId, UserId};

    use super::{AccessGrant, AccessSource, DelegationGrant};
    use crate::AccessRole;

    fn org(value: &str) -> OrganizationId {
        OrganizationId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn delegation() -> DelegationGrant {
        DelegationGrant {
            id: GrantId::new(),
            organization_id: org("org-root"),
            delegate_user_id: UserId::new("user-1").unwrap_or_else(|_| unreachable!()),
            scope: NonEmptyString::new("reporting").unwrap_or_else(|_| unreachable!()),
            revoked_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn delegation_without_bounds_is_live() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        assert!(delegation().is_live_at(now));
    }

    #[test]
    fn delegation_expiring_exactly_now_is_not_live() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let mut grant = delegation();
        grant.expires_at = Some(now);
        assert!(!grant.is_live_at(now));

        grant.expires_at = Some(now + Duration::seconds(1));
        assert!(grant.is_live_at(now));
    }

    #[test]
    fn revoked_delegation_is_not_live_even_before_expiry() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let mut grant = delegation();
        grant.revoked_at = Some(now - Duration::days(1));
        grant.expires_at = Some(now + Duration::days(30));
        assert!(!grant.is_live_at(now));
    }

    #[test]
    fn delegation_scopes_only_kept_at_origin() {
        let scopes = BTreeSet::from(["reporting".to_owned()]);

        let at_origin = AccessGrant::from_delegation(org("org-root"), org("org-root"), &scopes);
        assert!(at_origin.has_delegated_scope("reporting"));
        assert_eq!(at_origin.role, AccessRole::Reporter);

        let inherited = AccessGrant::from_delegation(org("org-child"), org("org-root"), &scopes);
        assert!(inherited.delegated_scopes.is_empty());
        assert_eq!(
            inherited.source,
            AccessSource::Delegation {
                origin: org("org-root")
            }
        );
    }

    #[test]
    fn access_grant_serializes_source_with_kind_tag() {
        let grant = AccessGrant::global_admin(org("org-1"));
        let json = serde_json::to_value(&grant).unwrap_or_default();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["source"]["kind"], "global_admin");
        assert_eq!(json["organization_id"], "org-1");
    }
}
