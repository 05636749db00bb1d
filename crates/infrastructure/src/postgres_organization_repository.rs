use std::str::FromStr;

use async_trait::async_trait;

use orgaccess_application::OrganizationRepository;
use orgaccess_core::{AppError, AppResult, OrganizationId};
use orgaccess_domain::{Organization, OrganizationStatus, OrganizationType};

use sqlx::{FromRow, PgPool};
use tracing::warn;

/// PostgreSQL-backed reader for the organization tree.
#[derive(Clone)]
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrganizationRow {
    id: String,
    parent_organization_id: Option<String>,
    status: String,
    organization_type: String,
}

impl OrganizationRow {
    fn into_organization(self) -> AppResult<Organization> {
        let decode = |field: &str, value: &str, error: AppError| {
            AppError::Internal(format!(
                "failed to decode {field} '{value}' for organization '{}': {error}",
                self.id
            ))
        };

        let status = OrganizationStatus::from_str(self.status.as_str())
            .map_err(|error| decode("status", self.status.as_str(), error))?;
        let organization_type = OrganizationType::from_str(self.organization_type.as_str())
            .map_err(|error| decode("organization type", self.organization_type.as_str(), error))?;
        let parent_organization_id = self
            .parent_organization_id
            .as_deref()
            .map(OrganizationId::new)
            .transpose()
            .map_err(|error| decode("parent id", "", error))?;
        let id = OrganizationId::new(self.id.as_str())
            .map_err(|error| decode("id", self.id.as_str(), error))?;

        Ok(Organization::new(
            id,
            parent_organization_id,
            status,
            organization_type,
        ))
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn list_organizations(&self) -> AppResult<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, parent_organization_id, status, organization_type
            FROM organizations
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load organizations: {error}")))?;

        Ok(decode_organizations(rows))
    }
}

/// Undecodable rows are logged and skipped; the rest of the tree still resolves.
fn decode_organizations(rows: Vec<OrganizationRow>) -> Vec<Organization> {
    rows.into_iter()
        .filter_map(|row| {
            let organization_id = row.id.clone();
            row.into_organization()
                .map_err(|error| {
                    warn!(
                        organization_id = %organization_id,
                        error = %error,
                        "skipping undecodable organization row"
                    );
                })
                .ok()
        })
        .collect()
}
