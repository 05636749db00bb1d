use std::collections::HashSet;

use orgaccess_core::AppError;
use orgaccess_domain::AccessRole;

use super::*;

impl AccessService {
    /// Ensures the user holds at least `minimum` at the organization.
    ///
    /// Unknown organizations fail with the same error as forbidden ones so the
    /// response does not reveal which organizations exist.
    pub async fn require_organization_role(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        minimum: AccessRole,
        now: DateTime<Utc>,
    ) -> AppResult<AccessGrant> {
        match self
            .resolve_organization_access(user_id, organization_id, now)
            .await?
        {
            Some(grant) if grant.role.satisfies(minimum) => Ok(grant),
            _ => Err(AppError::Forbidden(format!(
                "user '{user_id}' lacks role '{}' in organization '{organization_id}'",
                minimum.as_str()
            ))),
        }
    }

    /// Returns whether the user can access the organization at all.
    pub async fn has_organization_access(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self
            .resolve_organization_access(user_id, organization_id, now)
            .await?
            .is_some())
    }

    /// Keeps the candidate organizations the user can access, preserving input order.
    ///
    /// Used to filter navigation entries and to restrict report exports.
    pub async fn filter_accessible_organization_ids(
        &self,
        user_id: &UserId,
        candidates: &[OrganizationId],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<OrganizationId>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let (global_admin, grants) = match self.cached_access(user_id, now).await? {
            Some(access) => (access.global_admin, access.grants),
            None => {
                let snapshot = self.load_snapshot(user_id, now).await?;
                let grants = snapshot.resolver().list_accessible_organizations();
                (snapshot.global_admin, grants)
            }
        };

        if global_admin {
            return Ok(candidates.to_vec());
        }

        let accessible: HashSet<&OrganizationId> =
            grants.iter().map(|grant| &grant.organization_id).collect();

        Ok(candidates
            .iter()
            .filter(|candidate| accessible.contains(candidate))
            .cloned()
            .collect())
    }
}
