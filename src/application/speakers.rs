//! Speaker directory reads.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo, SpeakersRepo};
use crate::domain::entities::{SessionRecord, SpeakerRecord};

#[derive(Debug, Error)]
pub enum SpeakerError {
    #[error("speaker not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct SpeakerService {
    speakers: Arc<dyn SpeakersRepo>,
    sessions: Arc<dyn SessionsRepo>,
}

impl SpeakerService {
    pub fn new(speakers: Arc<dyn SpeakersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self { speakers, sessions }
    }

    pub async fn list(&self) -> Result<Vec<SpeakerRecord>, SpeakerError> {
        Ok(self.speakers.list_speakers().await?)
    }

    pub async fn sessions_by_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<SessionRecord>, SpeakerError> {
        if self.speakers.find_speaker(speaker_id).await?.is_none() {
            return Err(SpeakerError::NotFound);
        }
        Ok(self.sessions.list_by_speaker(speaker_id).await?)
    }
}
