use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, SpeakersRepo},
    domain::entities::SpeakerRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SpeakerRow {
    id: Uuid,
    name: String,
    created_at: OffsetDateTime,
}

impl From<SpeakerRow> for SpeakerRecord {
    fn from(row: SpeakerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SpeakersRepo for PostgresRepositories {
    async fn find_or_create_speaker(&self, name: &str) -> Result<SpeakerRecord, RepoError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on
        // conflict, so lookup and create are a single statement.
        let row = sqlx::query_as::<_, SpeakerRow>(
            "INSERT INTO speakers (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError> {
        let row = sqlx::query_as::<_, SpeakerRow>(
            "SELECT id, name, created_at FROM speakers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_speakers(&self) -> Result<Vec<SpeakerRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SpeakerRow>(
            "SELECT id, name, created_at FROM speakers ORDER BY name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SpeakerRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SpeakerRow>(
            "SELECT DISTINCT s.id, s.name, s.created_at
               FROM speakers s
               JOIN sessions se ON se.speaker_id = s.id
              WHERE se.conference_id = $1
              ORDER BY s.name",
        )
        .bind(conference_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
