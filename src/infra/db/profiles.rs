use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{NewProfileParams, ProfilesRepo, RepoError, UpdateProfileParams},
    domain::{entities::ProfileRecord, types::TeeShirtSize},
};

use super::{PostgresRepositories, map_sqlx_error};

const PROFILE_COLUMNS: &str =
    "user_id, display_name, email, tee_shirt_size, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    display_name: String,
    email: String,
    tee_shirt_size: TeeShirtSize,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            display_name: row.display_name,
            email: row.email,
            tee_shirt_size: row.tee_shirt_size,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ProfilesRepo for PostgresRepositories {
    async fn find_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn insert_profile(&self, params: NewProfileParams) -> Result<ProfileRecord, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (user_id, display_name, email, tee_shirt_size)
             VALUES ($1, $2, $3, $4)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&params.user_id)
        .bind(&params.display_name)
        .bind(&params.email)
        .bind(params.tee_shirt_size)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_profile(
        &self,
        params: UpdateProfileParams,
    ) -> Result<ProfileRecord, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles
                SET display_name = COALESCE($2, display_name),
                    tee_shirt_size = COALESCE($3, tee_shirt_size),
                    updated_at = now()
              WHERE user_id = $1
              RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&params.user_id)
        .bind(params.display_name.as_deref())
        .bind(params.tee_shirt_size)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
