use async_trait::async_trait;
use orgaccess_application::{DelegationRepository, MembershipRepository, OrganizationRepository};
use orgaccess_core::{AppError, AppResult, GrantId, UserId};
use orgaccess_domain::{DelegationGrant, MembershipGrant, Organization};
use tokio::sync::RwLock;

/// In-memory organization, membership and delegation store.
///
/// Rows are returned in insertion order. Seeding never validates the tree, so
/// tests can reproduce the inconsistent snapshots a real store may hand back.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    organizations: RwLock<Vec<Organization>>,
    memberships: RwLock<Vec<MembershipGrant>>,
    delegations: RwLock<Vec<DelegationGrant>>,
}

impl InMemoryAccessRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository seeded with a full snapshot.
    #[must_use]
    pub fn with_snapshot(
        organizations: Vec<Organization>,
        memberships: Vec<MembershipGrant>,
        delegations: Vec<DelegationGrant>,
    ) -> Self {
        Self {
            organizations: RwLock::new(organizations),
            memberships: RwLock::new(memberships),
            delegations: RwLock::new(delegations),
        }
    }

    /// Appends an organization record.
    pub async fn insert_organization(&self, organization: Organization) {
        self.organizations.write().await.push(organization);
    }

    /// Appends a membership row. Grant ids must be unique.
    pub async fn insert_membership(&self, grant: MembershipGrant) -> AppResult<()> {
        let mut memberships = self.memberships.write().await;
        if memberships.iter().any(|existing| existing.id == grant.id) {
            return Err(AppError::Conflict(format!(
                "membership grant '{}' already exists",
                grant.id
            )));
        }

        memberships.push(grant);
        Ok(())
    }

    /// Appends a delegation row. Grant ids must be unique.
    pub async fn insert_delegation(&self, grant: DelegationGrant) -> AppResult<()> {
        let mut delegations = self.delegations.write().await;
        if delegations.iter().any(|existing| existing.id == grant.id) {
            return Err(AppError::Conflict(format!(
                "delegation grant '{}' already exists",
                grant.id
            )));
        }

        delegations.push(grant);
        Ok(())
    }

    /// Deletes a membership row and returns its owner.
    pub async fn remove_membership(&self, grant_id: GrantId) -> AppResult<UserId> {
        let mut memberships = self.memberships.write().await;
        let position = memberships
            .iter()
            .position(|grant| grant.id == grant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("membership grant '{grant_id}' not found"))
            })?;

        Ok(memberships.remove(position).user_id)
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryAccessRepository {
    async fn list_organizations(&self) -> AppResult<Vec<Organization>> {
        Ok(self.organizations.read().await.clone())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryAccessRepository {
    async fn list_memberships_for_user(&self, user_id: &UserId) -> AppResult<Vec<MembershipGrant>> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .filter(|grant| &grant.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DelegationRepository for InMemoryAccessRepository {
    async fn list_delegations_for_user(&self, user_id: &UserId) -> AppResult<Vec<DelegationGrant>> {
        Ok(self
            .delegations
            .read()
            .await
            .iter()
            .filter(|grant| &grant.delegate_user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use orgaccess_application::{DelegationRepository, MembershipRepository, OrganizationRepository};
    use orgaccess_core::{AppError, GrantId, NonEmptyString, OrganizationId, UserId};
    use orgaccess_domain::{
        DelegationGrant, MembershipGrant, MembershipRole, MembershipStatus, Organization,
        OrganizationStatus, OrganizationType,
    };

    use super::InMemoryAccessRepository;

    fn org_id(value: &str) -> OrganizationId {
        OrganizationId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn membership(user_id: &str, organization: &str) -> MembershipGrant {
        MembershipGrant {
            id: GrantId::new(),
            organization_id: org_id(organization),
            user_id: user(user_id),
            role: MembershipRole::Member,
            status: MembershipStatus::Active,
        }
    }

    #[tokio::test]
    async fn grant_reads_are_scoped_to_the_requested_user() {
        let repository = InMemoryAccessRepository::new();
        assert!(repository.insert_membership(membership("alice", "north")).await.is_ok());
        assert!(repository.insert_membership(membership("bob", "south")).await.is_ok());
        let delegation = DelegationGrant {
            id: GrantId::new(),
            organization_id: org_id("south"),
            delegate_user_id: user("alice"),
            scope: NonEmptyString::new("reporting").unwrap_or_else(|_| unreachable!()),
            revoked_at: None,
            expires_at: None,
        };
        assert!(repository.insert_delegation(delegation).await.is_ok());

        let memberships = repository.list_memberships_for_user(&user("alice")).await;
        assert_eq!(
            memberships
                .unwrap_or_default()
                .into_iter()
                .map(|grant| grant.organization_id)
                .collect::<Vec<_>>(),
            vec![org_id("north")]
        );

        let delegations = repository.list_delegations_for_user(&user("bob")).await;
        assert!(delegations.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn duplicate_grant_ids_conflict() {
        let repository = InMemoryAccessRepository::new();
        let grant = membership("alice", "north");

        assert!(repository.insert_membership(grant.clone()).await.is_ok());
        let duplicate = repository.insert_membership(grant).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn remove_membership_returns_owner() {
        let repository = InMemoryAccessRepository::new();
        let grant = membership("alice", "north");
        let grant_id = grant.id;
        assert!(repository.insert_membership(grant).await.is_ok());

        let removed = repository.remove_membership(grant_id).await;
        assert_eq!(removed.ok(), Some(user("alice")));

        let missing = repository.remove_membership(grant_id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn organizations_keep_insertion_order() {
        let repository = InMemoryAccessRepository::new();
        for (id, parent) in [("root", None), ("b", Some("root")), ("a", Some("root"))] {
            repository
                .insert_organization(Organization::new(
                    org_id(id),
                    parent.map(org_id),
                    OrganizationStatus::Active,
                    OrganizationType::Region,
                ))
                .await;
        }

        let listed = repository.list_organizations().await.unwrap_or_default();
        let ids: Vec<&str> = listed.iter().map(|organization| organization.id().as_str()).collect();
        assert_eq!(ids, vec!["root", "b", "a"]);
    }
}
