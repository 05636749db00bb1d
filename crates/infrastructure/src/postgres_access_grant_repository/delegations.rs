use super::*;

impl PostgresAccessGrantRepository {
    /// Revoked and expired rows are returned too; liveness is decided at resolution time.
    pub(super) async fn list_delegations_for_user_impl(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<DelegationGrant>> {
        let rows = sqlx::query_as::<_, DelegationRow>(
            r#"
            SELECT id, organization_id, delegate_user_id, scope, revoked_at, expires_at
            FROM organization_delegations
            WHERE delegate_user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load delegations for user '{user_id}': {error}"
            ))
        })?;

        rows.into_iter().map(DelegationRow::into_grant).collect()
    }
}

impl DelegationRow {
    pub(super) fn into_grant(self) -> AppResult<DelegationGrant> {
        let grant_id = self.id;

        Ok(DelegationGrant {
            id: GrantId::from_uuid(grant_id),
            organization_id: OrganizationId::new(self.organization_id)
                .map_err(|error| decode_error(grant_id, "organization id", error))?,
            delegate_user_id: UserId::new(self.delegate_user_id)
                .map_err(|error| decode_error(grant_id, "delegate user id", error))?,
            scope: NonEmptyString::new(self.scope)
                .map_err(|error| decode_error(grant_id, "scope", error))?,
            revoked_at: self.revoked_at,
            expires_at: self.expires_at,
        })
    }
}
