use super::*;

impl AccessService {
    /// Resolves effective access for one organization.
    ///
    /// Unknown and unreachable organizations both return `Ok(None)`.
    pub async fn resolve_organization_access(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AccessGrant>> {
        if let Some(access) = self.cached_access(user_id, now).await? {
            return Ok(lookup_cached_grant(&access, organization_id));
        }

        let snapshot = self.load_snapshot(user_id, now).await?;
        let grant = snapshot
            .resolver()
            .resolve_organization_access(organization_id);

        debug!(
            user_id = %user_id,
            organization_id = %organization_id,
            role = grant.as_ref().map_or("none", |grant| grant.role.as_str()),
            "resolved organization access"
        );

        Ok(grant)
    }

    /// Lists every organization the user can access with the effective role.
    ///
    /// Ordering is unspecified.
    pub async fn list_accessible_organizations_for_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessGrant>> {
        if let Some(access) = self.cached_access(user_id, now).await? {
            return Ok(access.grants);
        }

        let snapshot = self.load_snapshot(user_id, now).await?;
        let grants = snapshot.resolver().list_accessible_organizations();

        debug!(
            user_id = %user_id,
            accessible_count = grants.len(),
            global_admin = snapshot.global_admin,
            "listed accessible organizations"
        );

        Ok(grants)
    }
}
