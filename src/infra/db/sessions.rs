use async_trait::async_trait;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::{
    application::repos::{CreateSessionParams, RepoError, SessionsRepo},
    domain::entities::SessionRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

// Sessions are always read joined to their speaker so responses can
// show the speaker's name without a second lookup.
const SESSION_COLUMNS: &str = "se.id, se.conference_id, se.name, se.highlights, \
     se.speaker_id, sp.name AS speaker_name, se.duration_minutes, se.session_type, \
     se.date, se.start_time, se.created_at";

const SESSION_FROM: &str = "FROM sessions se LEFT JOIN speakers sp ON sp.id = se.speaker_id";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    conference_id: Uuid,
    name: String,
    highlights: Option<String>,
    speaker_id: Option<Uuid>,
    speaker_name: Option<String>,
    duration_minutes: Option<i32>,
    session_type: Option<String>,
    date: Option<Date>,
    start_time: Option<Time>,
    created_at: OffsetDateTime,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            conference_id: row.conference_id,
            name: row.name,
            highlights: row.highlights,
            speaker_id: row.speaker_id,
            speaker_name: row.speaker_name,
            duration_minutes: row.duration_minutes,
            session_type: row.session_type,
            date: row.date,
            start_time: row.start_time,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO sessions
                 (conference_id, name, highlights, speaker_id,
                  duration_minutes, session_type, date, start_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(params.conference_id)
        .bind(&params.name)
        .bind(params.highlights.as_deref())
        .bind(params.speaker_id)
        .bind(params.duration_minutes)
        .bind(params.session_type.as_deref())
        .bind(params.date)
        .bind(params.start_time)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_session(id)
            .await?
            .ok_or_else(|| RepoError::from_persistence("session vanished after insert"))
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM} WHERE se.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
              WHERE se.conference_id = $1
              ORDER BY se.date, se.start_time, se.name"
        ))
        .bind(conference_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_type(
        &self,
        conference_id: Uuid,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
              WHERE se.conference_id = $1 AND se.session_type = $2
              ORDER BY se.date, se.start_time, se.name"
        ))
        .bind(conference_id)
        .bind(session_type)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_speaker(&self, speaker_id: Uuid) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
              WHERE se.speaker_id = $1
              ORDER BY se.date, se.start_time, se.name"
        ))
        .bind(speaker_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_date_range(
        &self,
        conference_id: Uuid,
        start: Date,
        end: Date,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
              WHERE se.conference_id = $1 AND se.date BETWEEN $2 AND $3
              ORDER BY se.date, se.start_time, se.name"
        ))
        .bind(conference_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_speaker_in_conference(
        &self,
        conference_id: Uuid,
        speaker_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
              WHERE se.conference_id = $1 AND se.speaker_id = $2
              ORDER BY se.date, se.start_time, se.name"
        ))
        .bind(conference_id)
        .bind(speaker_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_wishlisted(
        &self,
        user_id: &str,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} {SESSION_FROM}
               JOIN wishlist_items w ON w.session_id = se.id
              WHERE w.profile_id = $1 AND se.conference_id = $2
              ORDER BY w.created_at"
        ))
        .bind(user_id)
        .bind(conference_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
