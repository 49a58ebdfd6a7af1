//! Session creation and the various session listings.

use std::sync::Arc;

use thiserror::Error;
use time::{Date, Time};
use tracing::info;
use uuid::Uuid;

use crate::application::jobs::enqueue_featured_speaker_job;
use crate::application::repos::{
    ConferencesRepo, CreateSessionParams, JobsRepo, RepoError, SessionsRepo, SpeakersRepo,
};
use crate::domain::entities::{SessionRecord, SpeakerRecord};
use crate::infra::http::auth::CurrentUser;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("conference not found")]
    ConferenceNotFound,
    #[error("session `name` field required")]
    NameRequired,
    #[error("only the conference organizer can add sessions")]
    NotOrganizer,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub conference_id: Uuid,
    pub name: String,
    pub highlights: Option<String>,
    /// Free-text speaker name; resolved to a speaker record by
    /// lookup-or-create.
    pub speaker: Option<String>,
    pub duration_minutes: Option<i32>,
    pub session_type: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<Time>,
}

pub struct SessionService {
    sessions: Arc<dyn SessionsRepo>,
    conferences: Arc<dyn ConferencesRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    jobs: Arc<dyn JobsRepo>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionsRepo>,
        conferences: Arc<dyn ConferencesRepo>,
        speakers: Arc<dyn SpeakersRepo>,
        jobs: Arc<dyn JobsRepo>,
    ) -> Self {
        Self {
            sessions,
            conferences,
            speakers,
            jobs,
        }
    }

    /// Create a session under a conference. Organizer-only. Naming a
    /// speaker resolves the record by name and queues featured-speaker
    /// recomputation for this conference/speaker pair.
    pub async fn create(
        &self,
        user: &CurrentUser,
        command: CreateSessionCommand,
    ) -> Result<SessionRecord, SessionError> {
        let conference = self
            .conferences
            .find_conference(command.conference_id)
            .await?
            .ok_or(SessionError::ConferenceNotFound)?;

        if conference.organizer_id != user.user_id {
            return Err(SessionError::NotOrganizer);
        }

        if command.name.trim().is_empty() {
            return Err(SessionError::NameRequired);
        }

        let speaker = match command.speaker.filter(|name| !name.trim().is_empty()) {
            Some(name) => Some(self.speakers.find_or_create_speaker(name.trim()).await?),
            None => None,
        };

        let session = self
            .sessions
            .create_session(CreateSessionParams {
                conference_id: conference.id,
                name: command.name,
                highlights: command.highlights,
                speaker_id: speaker.as_ref().map(|s| s.id),
                duration_minutes: command.duration_minutes,
                session_type: command.session_type,
                date: command.date,
                start_time: command.start_time,
            })
            .await?;

        if let Some(speaker) = &speaker {
            enqueue_featured_speaker_job(self.jobs.as_ref(), conference.id, speaker.id).await?;
        }

        info!(
            target = "application::sessions",
            session_id = %session.id,
            conference_id = %conference.id,
            "session created"
        );

        Ok(session)
    }

    pub async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.require_conference(conference_id).await?;
        Ok(self.sessions.list_for_conference(conference_id).await?)
    }

    pub async fn list_by_type(
        &self,
        conference_id: Uuid,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.require_conference(conference_id).await?;
        Ok(self
            .sessions
            .list_by_type(conference_id, session_type)
            .await?)
    }

    pub async fn list_by_date_range(
        &self,
        conference_id: Uuid,
        start: Date,
        end: Date,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.require_conference(conference_id).await?;
        Ok(self
            .sessions
            .list_by_date_range(conference_id, start, end)
            .await?)
    }

    pub async fn list_wishlisted(
        &self,
        user: &CurrentUser,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.require_conference(conference_id).await?;
        Ok(self
            .sessions
            .list_wishlisted(&user.user_id, conference_id)
            .await?)
    }

    pub async fn list_conference_speakers(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SpeakerRecord>, SessionError> {
        self.require_conference(conference_id).await?;
        Ok(self.speakers.list_for_conference(conference_id).await?)
    }

    async fn require_conference(&self, conference_id: Uuid) -> Result<(), SessionError> {
        self.conferences
            .find_conference(conference_id)
            .await?
            .ok_or(SessionError::ConferenceNotFound)?;
        Ok(())
    }
}
