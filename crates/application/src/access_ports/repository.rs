use async_trait::async_trait;
use orgaccess_core::{AppResult, UserId};
use orgaccess_domain::{DelegationGrant, MembershipGrant, Organization};

/// Read port for the organization tree.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Lists every organization visible to access resolution.
    async fn list_organizations(&self) -> AppResult<Vec<Organization>>;
}

/// Read port for direct memberships.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Lists membership rows of a user in any status.
    async fn list_memberships_for_user(&self, user_id: &UserId) -> AppResult<Vec<MembershipGrant>>;
}

/// Read port for delegated grants.
#[async_trait]
pub trait DelegationRepository: Send + Sync {
    /// Lists delegation rows of a user, including revoked and expired ones.
    ///
    /// Liveness is evaluated by the caller against an explicit evaluation time.
    async fn list_delegations_for_user(&self, user_id: &UserId) -> AppResult<Vec<DelegationGrant>>;
}
