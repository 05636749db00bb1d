use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orgaccess_application::{DelegationRepository, MembershipRepository};
use orgaccess_core::{AppError, AppResult, GrantId, NonEmptyString, OrganizationId, UserId};
use orgaccess_domain::{DelegationGrant, MembershipGrant, MembershipRole, MembershipStatus};

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

mod delegations;
mod memberships;

/// PostgreSQL-backed reader for membership and delegation rows.
#[derive(Clone)]
pub struct PostgresAccessGrantRepository {
    pool: PgPool,
}

impl PostgresAccessGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: Uuid,
    organization_id: String,
    user_id: String,
    role: String,
    status: String,
}

#[derive(Debug, FromRow)]
struct DelegationRow {
    id: Uuid,
    organization_id: String,
    delegate_user_id: String,
    scope: String,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

fn decode_error(grant_id: Uuid, field: &str, error: AppError) -> AppError {
    AppError::Internal(format!(
        "failed to decode {field} of access grant '{grant_id}': {error}"
    ))
}

#[async_trait]
impl MembershipRepository for PostgresAccessGrantRepository {
    async fn list_memberships_for_user(&self, user_id: &UserId) -> AppResult<Vec<MembershipGrant>> {
        self.list_memberships_for_user_impl(user_id).await
    }
}

#[async_trait]
impl DelegationRepository for PostgresAccessGrantRepository {
    async fn list_delegations_for_user(&self, user_id: &UserId) -> AppResult<Vec<DelegationGrant>> {
        self.list_delegations_for_user_impl(user_id).await
    }
}
