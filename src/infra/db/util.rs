use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

// SQLSTATE classes the driver does not fold into an ErrorKind.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const QUERY_CANCELED: &str = "57014";

/// Classify a driver error into the repository taxonomy. Constraint
/// names (`profiles_pkey`, `speakers_name_key`,
/// `wishlist_items_session_id_fkey`, `conferences_seats_non_negative`,
/// ...) are carried through so callers can react to specific schema
/// rules.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            ErrorKind::ForeignKeyViolation => RepoError::ForeignKey {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => RepoError::Integrity {
                message: db.message().to_string(),
            },
            _ => match db.code().as_deref() {
                Some(INVALID_TEXT_REPRESENTATION) => RepoError::InvalidInput {
                    message: db.message().to_string(),
                },
                Some(QUERY_CANCELED) => RepoError::Timeout,
                _ => RepoError::from_persistence(db.message()),
            },
        },
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[derive(Debug)]
    struct FakeDbError {
        message: String,
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl FakeDbError {
        fn new(message: &str, code: Option<&'static str>, constraint: Option<&'static str>) -> Self {
            Self {
                message: message.to_string(),
                code,
                constraint,
            }
        }

        fn into_sqlx(self) -> sqlx::Error {
            sqlx::Error::Database(Box::new(self))
        }
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                Some("23505") => ErrorKind::UniqueViolation,
                Some("23503") => ErrorKind::ForeignKeyViolation,
                Some("23502") => ErrorKind::NotNullViolation,
                Some("23514") => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_carries_the_constraint_name() {
        let err = FakeDbError::new(
            "duplicate key value violates unique constraint \"speakers_name_key\"",
            Some("23505"),
            Some("speakers_name_key"),
        )
        .into_sqlx();

        match map_sqlx_error(err) {
            RepoError::Duplicate { constraint } => assert_eq!(constraint, "speakers_name_key"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn foreign_key_violation_carries_the_constraint_name() {
        let err = FakeDbError::new(
            "insert or update on table \"wishlist_items\" violates foreign key constraint \
             \"wishlist_items_session_id_fkey\"",
            Some("23503"),
            Some("wishlist_items_session_id_fkey"),
        )
        .into_sqlx();

        match map_sqlx_error(err) {
            RepoError::ForeignKey { constraint } => {
                assert_eq!(constraint, "wishlist_items_session_id_fkey");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn seat_check_violation_is_an_integrity_error() {
        let err = FakeDbError::new(
            "new row for relation \"conferences\" violates check constraint \
             \"conferences_seats_non_negative\"",
            Some("23514"),
            Some("conferences_seats_non_negative"),
        )
        .into_sqlx();

        match map_sqlx_error(err) {
            RepoError::Integrity { message } => {
                assert!(message.contains("conferences_seats_non_negative"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn invalid_text_representation_is_invalid_input() {
        let err = FakeDbError::new(
            "invalid input syntax for type uuid: \"nope\"",
            Some("22P02"),
            None,
        )
        .into_sqlx();

        assert!(matches!(
            map_sqlx_error(err),
            RepoError::InvalidInput { .. }
        ));
    }

    #[test]
    fn statement_cancellation_is_a_timeout() {
        let err = FakeDbError::new(
            "canceling statement due to user request",
            Some("57014"),
            None,
        )
        .into_sqlx();

        assert!(matches!(map_sqlx_error(err), RepoError::Timeout));
    }

    #[test]
    fn missing_row_is_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }
}
