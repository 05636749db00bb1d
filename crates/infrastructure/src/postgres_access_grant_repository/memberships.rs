use super::*;

impl PostgresAccessGrantRepository {
    pub(super) async fn list_memberships_for_user_impl(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<MembershipGrant>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, organization_id, user_id, role, status
            FROM organization_memberships
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load memberships for user '{user_id}': {error}"
            ))
        })?;

        rows.into_iter().map(MembershipRow::into_grant).collect()
    }
}

impl MembershipRow {
    pub(super) fn into_grant(self) -> AppResult<MembershipGrant> {
        let grant_id = self.id;

        Ok(MembershipGrant {
            id: GrantId::from_uuid(grant_id),
            organization_id: OrganizationId::new(self.organization_id)
                .map_err(|error| decode_error(grant_id, "organization id", error))?,
            user_id: UserId::new(self.user_id)
                .map_err(|error| decode_error(grant_id, "user id", error))?,
            role: MembershipRole::from_str(self.role.as_str())
                .map_err(|error| decode_error(grant_id, "role", error))?,
            status: MembershipStatus::from_str(self.status.as_str())
                .map_err(|error| decode_error(grant_id, "status", error))?,
        })
    }
}
