use std::path::Path;

use chrono::{DateTime, Utc};
use orgaccess_core::{AppError, AppResult, GrantId, NonEmptyString, OrganizationId, UserId};
use orgaccess_domain::{
    DelegationGrant, MembershipGrant, MembershipRole, MembershipStatus, Organization,
    OrganizationStatus, OrganizationType,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{InMemoryAccessRepository, StaticGlobalAdminCheck};

/// Offline access snapshot loaded from JSON.
///
/// Grant rows without an `id` get a deterministic id from their position, so
/// later rows win duplicate ties exactly as they would with increasing ids.
/// Within one grant list either every row carries an `id` or none does.
#[derive(Debug, Clone, Default)]
pub struct AccessFixture {
    organizations: Vec<Organization>,
    memberships: Vec<MembershipGrant>,
    delegations: Vec<DelegationGrant>,
    global_admin_user_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureDocument {
    #[serde(default)]
    organizations: Vec<FixtureOrganization>,
    #[serde(default)]
    memberships: Vec<FixtureMembership>,
    #[serde(default)]
    delegations: Vec<FixtureDelegation>,
    #[serde(default)]
    global_admin_user_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
struct FixtureOrganization {
    id: OrganizationId,
    #[serde(default)]
    parent_organization_id: Option<OrganizationId>,
    #[serde(default = "default_organization_status")]
    status: OrganizationStatus,
    organization_type: OrganizationType,
}

#[derive(Debug, Deserialize)]
struct FixtureMembership {
    #[serde(default)]
    id: Option<Uuid>,
    organization_id: OrganizationId,
    user_id: UserId,
    role: MembershipRole,
    #[serde(default = "default_membership_status")]
    status: MembershipStatus,
}

#[derive(Debug, Deserialize)]
struct FixtureDelegation {
    #[serde(default)]
    id: Option<Uuid>,
    organization_id: OrganizationId,
    delegate_user_id: UserId,
    scope: NonEmptyString,
    #[serde(default)]
    revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

fn default_organization_status() -> OrganizationStatus {
    OrganizationStatus::Active
}

fn default_membership_status() -> MembershipStatus {
    MembershipStatus::Active
}

fn positional_grant_id(id: Option<Uuid>, position: usize) -> GrantId {
    GrantId::from_uuid(id.unwrap_or_else(|| Uuid::from_u128(position as u128 + 1)))
}

fn ensure_consistent_ids(list: &str, ids: impl IntoIterator<Item = Option<Uuid>>) -> AppResult<()> {
    let (with_id, without_id) = ids
        .into_iter()
        .fold((0_usize, 0_usize), |(with_id, without_id), id| match id {
            Some(_) => (with_id + 1, without_id),
            None => (with_id, without_id + 1),
        });

    if with_id > 0 && without_id > 0 {
        return Err(AppError::Validation(format!(
            "invalid access fixture: {list} mix rows with and without an id"
        )));
    }

    Ok(())
}

impl AccessFixture {
    /// Parses a fixture document.
    pub fn from_json(value: &str) -> AppResult<Self> {
        let document = serde_json::from_str::<FixtureDocument>(value)
            .map_err(|error| AppError::Validation(format!("invalid access fixture: {error}")))?;
        ensure_consistent_ids(
            "memberships",
            document.memberships.iter().map(|record| record.id),
        )?;
        ensure_consistent_ids(
            "delegations",
            document.delegations.iter().map(|record| record.id),
        )?;

        let organizations = document
            .organizations
            .into_iter()
            .map(|record| {
                Organization::new(
                    record.id,
                    record.parent_organization_id,
                    record.status,
                    record.organization_type,
                )
            })
            .collect();
        let memberships = document
            .memberships
            .into_iter()
            .enumerate()
            .map(|(position, record)| MembershipGrant {
                id: positional_grant_id(record.id, position),
                organization_id: record.organization_id,
                user_id: record.user_id,
                role: record.role,
                status: record.status,
            })
            .collect();
        let delegations = document
            .delegations
            .into_iter()
            .enumerate()
            .map(|(position, record)| DelegationGrant {
                id: positional_grant_id(record.id, position),
                organization_id: record.organization_id,
                delegate_user_id: record.delegate_user_id,
                scope: record.scope,
                revoked_at: record.revoked_at,
                expires_at: record.expires_at,
            })
            .collect();

        Ok(Self {
            organizations,
            memberships,
            delegations,
            global_admin_user_ids: document.global_admin_user_ids,
        })
    }

    /// Reads and parses a fixture file.
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to read access fixture '{}': {error}",
                path.display()
            ))
        })?;

        let fixture = Self::from_json(contents.as_str())?;
        debug!(
            path = %path.display(),
            organization_count = fixture.organizations.len(),
            membership_count = fixture.memberships.len(),
            delegation_count = fixture.delegations.len(),
            "loaded access fixture"
        );

        Ok(fixture)
    }

    /// Returns the global admin allow-list declared by the fixture.
    #[must_use]
    pub fn global_admin_check(&self) -> StaticGlobalAdminCheck {
        StaticGlobalAdminCheck::new(self.global_admin_user_ids.iter().cloned())
    }

    /// Moves the snapshot into an in-memory repository.
    #[must_use]
    pub fn into_repository(self) -> InMemoryAccessRepository {
        InMemoryAccessRepository::with_snapshot(
            self.organizations,
            self.memberships,
            self.delegations,
        )
    }
}

#[cfg(test)]
mod tests {
    use orgaccess_application::{
        DelegationRepository, GlobalAdminCheck, MembershipRepository, OrganizationRepository,
    };
    use orgaccess_core::{AppError, GrantId, UserId};
    use orgaccess_domain::{MembershipRole, MembershipStatus, OrganizationStatus};
    use uuid::Uuid;

    use super::AccessFixture;

    const FIXTURE: &str = r#"{
        "organizations": [
            {"id": "federation", "organization_type": "governing_body"},
            {"id": "north", "parent_organization_id": "federation", "organization_type": "region", "status": "inactive"}
        ],
        "memberships": [
            {"organization_id": "north", "user_id": "alice", "role": "manager"},
            {"organization_id": "north", "user_id": "alice", "role": "viewer", "status": "pending"}
        ],
        "delegations": [
            {"organization_id": "federation", "delegate_user_id": "alice", "scope": "reporting",
             "expires_at": "2026-12-31T00:00:00Z"}
        ],
        "global_admin_user_ids": ["root"]
    }"#;

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn parses_snapshot_with_defaults_and_positional_ids() {
        let fixture = AccessFixture::from_json(FIXTURE);
        assert!(fixture.is_ok());
        let fixture = fixture.unwrap_or_default();

        let admin_check = fixture.global_admin_check();
        assert!(matches!(admin_check.is_global_admin(&user("root")).await, Ok(true)));

        let repository = fixture.into_repository();
        let organizations = repository.list_organizations().await.unwrap_or_default();
        assert_eq!(organizations.len(), 2);
        assert_eq!(organizations[0].status(), OrganizationStatus::Active);
        assert_eq!(organizations[1].status(), OrganizationStatus::Inactive);

        let memberships = repository
            .list_memberships_for_user(&user("alice"))
            .await
            .unwrap_or_default();
        assert_eq!(memberships.len(), 2);
        assert_eq!(memberships[0].id, GrantId::from_uuid(Uuid::from_u128(1)));
        assert_eq!(memberships[0].role, MembershipRole::Manager);
        assert_eq!(memberships[0].status, MembershipStatus::Active);
        assert_eq!(memberships[1].status, MembershipStatus::Pending);
        assert!(memberships[0].id < memberships[1].id);

        let delegations = repository
            .list_delegations_for_user(&user("alice"))
            .await
            .unwrap_or_default();
        assert_eq!(delegations.len(), 1);
        assert!(delegations[0].expires_at.is_some());
    }

    #[test]
    fn stored_reporter_role_is_rejected() {
        let fixture = AccessFixture::from_json(
            r#"{"memberships": [{"organization_id": "a", "user_id": "u", "role": "reporter"}]}"#,
        );

        assert!(matches!(fixture, Err(AppError::Validation(_))));
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let fixture = AccessFixture::from_json(
            r#"{"organizations": [{"id": "", "organization_type": "club"}]}"#,
        );

        assert!(matches!(fixture, Err(AppError::Validation(_))));
    }

    #[test]
    fn grant_lists_mixing_explicit_and_positional_ids_are_rejected() {
        let fixture = AccessFixture::from_json(
            r#"{"memberships": [
                {"id": "6f1c1d2e-8a4b-4c1d-9f00-2b7e5a9c0d11", "organization_id": "a", "user_id": "u", "role": "owner"},
                {"organization_id": "a", "user_id": "u", "role": "viewer"}
            ]}"#,
        );
        assert!(matches!(fixture, Err(AppError::Validation(message)) if message.contains("memberships")));

        let explicit_only = AccessFixture::from_json(
            r#"{"delegations": [
                {"id": "00000000-0000-0000-0000-000000000002", "organization_id": "a", "delegate_user_id": "u", "scope": "reporting"},
                {"id": "00000000-0000-0000-0000-000000000001", "organization_id": "a", "delegate_user_id": "u", "scope": "finance"}
            ]}"#,
        );
        assert!(explicit_only.is_ok());
    }

    #[tokio::test]
    async fn missing_file_surfaces_internal_error() {
        let fixture = AccessFixture::load("/nonexistent/access-fixture.json").await;

        assert!(matches!(fixture, Err(AppError::Internal(_))));
    }
}
