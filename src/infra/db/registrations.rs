use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RegistrationError, RegistrationsRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

const SEATS_CHECK: &str = "conferences_seats_non_negative";
const WISHLIST_SESSION_FK: &str = "wishlist_items_session_id_fkey";

fn map_tx_error(err: sqlx::Error) -> RegistrationError {
    RegistrationError::Repo(map_sqlx_error(err))
}

/// A check violation on the seat counter means the conference filled up
/// despite the in-transaction precondition read.
fn classify_seat_decrement(err: RepoError) -> RegistrationError {
    match err {
        RepoError::Integrity { ref message } if message.contains(SEATS_CHECK) => {
            RegistrationError::NoSeatsAvailable
        }
        other => RegistrationError::Repo(other),
    }
}

/// Wishlist inserts rely on the table constraints instead of a prior
/// existence read, so a session deleted mid-request surfaces as its
/// foreign key rather than a stale check result.
fn classify_wishlist_insert(err: RepoError) -> RegistrationError {
    match err {
        RepoError::Duplicate { .. } => RegistrationError::AlreadyWishlisted,
        RepoError::ForeignKey { ref constraint } if constraint == WISHLIST_SESSION_FK => {
            RegistrationError::SessionNotFound
        }
        other => RegistrationError::Repo(other),
    }
}

#[async_trait]
impl RegistrationsRepo for PostgresRepositories {
    async fn register(&self, user_id: &str, conference_id: Uuid) -> Result<(), RegistrationError> {
        let mut tx = self
            .begin()
            .await
            .map_err(|err| RegistrationError::Repo(RepoError::from_persistence(err)))?;

        // Lock the seat counter for the duration of the transaction so
        // two concurrent registrations cannot both observe the last seat.
        let seats: Option<i32> =
            sqlx::query_scalar("SELECT seats_available FROM conferences WHERE id = $1 FOR UPDATE")
                .bind(conference_id)
                .fetch_optional(tx.as_mut())
                .await
                .map_err(map_tx_error)?;

        let seats = seats.ok_or(RegistrationError::ConferenceNotFound)?;

        let already: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM registrations WHERE profile_id = $1 AND conference_id = $2",
        )
        .bind(user_id)
        .bind(conference_id)
        .fetch_optional(tx.as_mut())
        .await
        .map_err(map_tx_error)?;

        if already.is_some() {
            return Err(RegistrationError::AlreadyRegistered);
        }

        if seats <= 0 {
            return Err(RegistrationError::NoSeatsAvailable);
        }

        sqlx::query("INSERT INTO registrations (profile_id, conference_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(conference_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_tx_error)?;

        sqlx::query("UPDATE conferences SET seats_available = seats_available - 1 WHERE id = $1")
            .bind(conference_id)
            .execute(tx.as_mut())
            .await
            .map_err(|err| classify_seat_decrement(map_sqlx_error(err)))?;

        tx.commit()
            .await
            .map_err(|err| RegistrationError::Repo(RepoError::from_persistence(err)))?;

        Ok(())
    }

    async fn unregister(
        &self,
        user_id: &str,
        conference_id: Uuid,
    ) -> Result<bool, RegistrationError> {
        let mut tx = self
            .begin()
            .await
            .map_err(|err| RegistrationError::Repo(RepoError::from_persistence(err)))?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM conferences WHERE id = $1 FOR UPDATE")
                .bind(conference_id)
                .fetch_optional(tx.as_mut())
                .await
                .map_err(map_tx_error)?;

        if exists.is_none() {
            return Err(RegistrationError::ConferenceNotFound);
        }

        let deleted =
            sqlx::query("DELETE FROM registrations WHERE profile_id = $1 AND conference_id = $2")
                .bind(user_id)
                .bind(conference_id)
                .execute(tx.as_mut())
                .await
                .map_err(map_tx_error)?;

        if deleted.rows_affected() == 0 {
            // Not attending; nothing to undo.
            return Ok(false);
        }

        sqlx::query("UPDATE conferences SET seats_available = seats_available + 1 WHERE id = $1")
            .bind(conference_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_tx_error)?;

        tx.commit()
            .await
            .map_err(|err| RegistrationError::Repo(RepoError::from_persistence(err)))?;

        Ok(true)
    }

    async fn wishlist_add(
        &self,
        user_id: &str,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        sqlx::query("INSERT INTO wishlist_items (profile_id, session_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(session_id)
            .execute(self.pool())
            .await
            .map_err(|err| classify_wishlist_insert(map_sqlx_error(err)))?;

        Ok(())
    }

    async fn wishlist_remove(
        &self,
        user_id: &str,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        let deleted =
            sqlx::query("DELETE FROM wishlist_items WHERE profile_id = $1 AND session_id = $2")
                .bind(user_id)
                .bind(session_id)
                .execute(self.pool())
                .await
                .map_err(map_tx_error)?;

        if deleted.rows_affected() > 0 {
            return Ok(());
        }

        // Distinguish an unknown session from one simply not wishlisted.
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_tx_error)?;

        if exists.is_none() {
            return Err(RegistrationError::SessionNotFound);
        }

        Err(RegistrationError::NotWishlisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_check_violation_reads_as_no_seats() {
        let err = RepoError::Integrity {
            message: format!("new row violates check constraint \"{SEATS_CHECK}\""),
        };
        assert!(matches!(
            classify_seat_decrement(err),
            RegistrationError::NoSeatsAvailable
        ));
    }

    #[test]
    fn unrelated_integrity_errors_pass_through() {
        let err = RepoError::Integrity {
            message: "null value in column \"city\"".to_string(),
        };
        assert!(matches!(
            classify_seat_decrement(err),
            RegistrationError::Repo(RepoError::Integrity { .. })
        ));
    }

    #[test]
    fn duplicate_wishlist_insert_is_already_wishlisted() {
        let err = RepoError::Duplicate {
            constraint: "wishlist_items_pkey".to_string(),
        };
        assert!(matches!(
            classify_wishlist_insert(err),
            RegistrationError::AlreadyWishlisted
        ));
    }

    #[test]
    fn missing_session_foreign_key_is_session_not_found() {
        let err = RepoError::ForeignKey {
            constraint: WISHLIST_SESSION_FK.to_string(),
        };
        assert!(matches!(
            classify_wishlist_insert(err),
            RegistrationError::SessionNotFound
        ));
    }

    #[test]
    fn other_foreign_keys_pass_through() {
        let err = RepoError::ForeignKey {
            constraint: "wishlist_items_profile_id_fkey".to_string(),
        };
        assert!(matches!(
            classify_wishlist_insert(err),
            RegistrationError::Repo(RepoError::ForeignKey { .. })
        ));
    }
}
