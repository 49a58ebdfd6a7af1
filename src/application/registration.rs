//! Registration and wishlist commands on top of the transactional repo.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::repos::{RegistrationError, RegistrationsRepo};
use crate::infra::http::auth::CurrentUser;

pub struct RegistrationService {
    registrations: Arc<dyn RegistrationsRepo>,
}

impl RegistrationService {
    pub fn new(registrations: Arc<dyn RegistrationsRepo>) -> Self {
        Self { registrations }
    }

    /// Register the caller for a conference, consuming one seat. The
    /// seat decrement and the membership insert commit together or not
    /// at all.
    pub async fn register(
        &self,
        user: &CurrentUser,
        conference_id: Uuid,
    ) -> Result<(), RegistrationError> {
        self.registrations
            .register(&user.user_id, conference_id)
            .await?;

        metrics::counter!("confero_registration_total").increment(1);
        info!(
            target = "application::registration",
            user_id = %user.user_id,
            conference_id = %conference_id,
            "registered for conference"
        );
        Ok(())
    }

    /// Cancel a registration, returning the seat. Returns `false` when
    /// the caller was not registered; that is not an error.
    pub async fn unregister(
        &self,
        user: &CurrentUser,
        conference_id: Uuid,
    ) -> Result<bool, RegistrationError> {
        let removed = self
            .registrations
            .unregister(&user.user_id, conference_id)
            .await?;

        if removed {
            info!(
                target = "application::registration",
                user_id = %user.user_id,
                conference_id = %conference_id,
                "registration cancelled"
            );
        }
        Ok(removed)
    }

    pub async fn wishlist_add(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        self.registrations
            .wishlist_add(&user.user_id, session_id)
            .await
    }

    /// Removing a session that is not wishlisted is a conflict, unlike
    /// [`Self::unregister`].
    pub async fn wishlist_remove(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        self.registrations
            .wishlist_remove(&user.user_id, session_id)
            .await
    }
}
