//! Profile read/update on top of the profiles repository.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    NewProfileParams, ProfilesRepo, RepoError, UpdateProfileParams,
};
use crate::domain::entities::ProfileRecord;
use crate::domain::types::TeeShirtSize;
use crate::infra::http::auth::CurrentUser;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SaveProfileCommand {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

pub struct ProfileService {
    profiles: Arc<dyn ProfilesRepo>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfilesRepo>) -> Self {
        Self { profiles }
    }

    /// Fetch the caller's profile, creating it from identity-provider
    /// attributes on first access.
    pub async fn get_or_create(&self, user: &CurrentUser) -> Result<ProfileRecord, ProfileError> {
        if let Some(profile) = self.profiles.find_profile(&user.user_id).await? {
            return Ok(profile);
        }

        let created = self
            .profiles
            .insert_profile(NewProfileParams {
                user_id: user.user_id.clone(),
                display_name: user.display_name.clone(),
                email: user.email.clone(),
                tee_shirt_size: TeeShirtSize::NotSpecified,
            })
            .await;

        match created {
            Ok(profile) => {
                info!(
                    target = "application::profile",
                    user_id = %user.user_id,
                    "profile created on first access"
                );
                Ok(profile)
            }
            // Lost a create race with a concurrent first request; the
            // winner's row is authoritative.
            Err(RepoError::Duplicate { .. }) => {
                let profile = self
                    .profiles
                    .find_profile(&user.user_id)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                Ok(profile)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save(
        &self,
        user: &CurrentUser,
        command: SaveProfileCommand,
    ) -> Result<ProfileRecord, ProfileError> {
        self.get_or_create(user).await?;

        let profile = self
            .profiles
            .update_profile(UpdateProfileParams {
                user_id: user.user_id.clone(),
                display_name: command.display_name,
                tee_shirt_size: command.tee_shirt_size,
            })
            .await?;

        Ok(profile)
    }
}
