//! Cached announcement and featured-speaker summaries.
//!
//! Both summaries live in a shared key/value cache under fixed keys and
//! are recomputed out of band: the announcement by a periodic job, the
//! featured speaker whenever a session gains a speaker. Reads never
//! touch the database.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{ConferencesRepo, RepoError, SessionsRepo, SpeakersRepo};

pub const ANNOUNCEMENT_KEY: &str = "recent_announcement";
pub const FEATURED_SPEAKER_KEY: &str = "featured_speaker";

/// Seats-remaining threshold below which a conference counts as nearly
/// sold out.
pub const NEARLY_SOLD_OUT_SEATS: i32 = 5;

/// Shared string cache the summaries live in. Implementations must be
/// safe for concurrent refreshers and readers.
pub trait SummaryCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn delete(&self, key: &str);
}

#[derive(Debug, Error)]
pub enum AnnouncementError {
    #[error("speaker not found")]
    SpeakerNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct AnnouncementService {
    conferences: Arc<dyn ConferencesRepo>,
    sessions: Arc<dyn SessionsRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    cache: Arc<dyn SummaryCache>,
}

impl AnnouncementService {
    pub fn new(
        conferences: Arc<dyn ConferencesRepo>,
        sessions: Arc<dyn SessionsRepo>,
        speakers: Arc<dyn SpeakersRepo>,
        cache: Arc<dyn SummaryCache>,
    ) -> Self {
        Self {
            conferences,
            sessions,
            speakers,
            cache,
        }
    }

    /// Current announcement, or the empty string when none is cached.
    pub fn announcement(&self) -> String {
        self.cache.get(ANNOUNCEMENT_KEY).unwrap_or_default()
    }

    /// Current featured-speaker summary, or the empty string.
    pub fn featured_speaker(&self) -> String {
        self.cache.get(FEATURED_SPEAKER_KEY).unwrap_or_default()
    }

    /// Recompute the nearly-sold-out announcement. Conferences with
    /// `0 < seats_available <= 5` produce an announcement naming each of
    /// them; when none qualify the cached entry is removed so readers
    /// fall back to the empty string.
    pub async fn refresh_announcement(&self) -> Result<String, AnnouncementError> {
        let nearly_sold_out = self
            .conferences
            .list_nearly_sold_out(NEARLY_SOLD_OUT_SEATS)
            .await?;

        if nearly_sold_out.is_empty() {
            self.cache.delete(ANNOUNCEMENT_KEY);
            debug!(
                target = "application::announcements",
                "no nearly-sold-out conferences, announcement cleared"
            );
            return Ok(String::new());
        }

        let names: Vec<&str> = nearly_sold_out
            .iter()
            .map(|conference| conference.name.as_str())
            .collect();
        let announcement = format!(
            "Last chance to attend! The following conferences are nearly sold out: {}",
            names.join(", ")
        );
        self.cache.set(ANNOUNCEMENT_KEY, announcement.clone());

        info!(
            target = "application::announcements",
            conferences = nearly_sold_out.len(),
            "announcement refreshed"
        );
        Ok(announcement)
    }

    /// Recompute the featured speaker after a session was added for
    /// `speaker_id` in `conference_id`. A speaker with more than one
    /// session in that conference becomes featured; otherwise the cached
    /// summary is left untouched, so it reflects the last speaker who
    /// ever qualified.
    pub async fn refresh_featured_speaker(
        &self,
        conference_id: Uuid,
        speaker_id: Uuid,
    ) -> Result<Option<String>, AnnouncementError> {
        let speaker = self
            .speakers
            .find_speaker(speaker_id)
            .await?
            .ok_or(AnnouncementError::SpeakerNotFound)?;

        let sessions = self
            .sessions
            .list_for_speaker_in_conference(conference_id, speaker_id)
            .await?;
        if sessions.len() <= 1 {
            return Ok(None);
        }

        let titles: Vec<&str> = sessions
            .iter()
            .map(|session| session.name.as_str())
            .collect();
        let summary = format!(
            "Featured speaker: {}. Sessions: {}",
            speaker.name,
            titles.join(", ")
        );
        self.cache.set(FEATURED_SPEAKER_KEY, summary.clone());

        info!(
            target = "application::announcements",
            speaker = %speaker.name,
            sessions = sessions.len(),
            "featured speaker refreshed"
        );
        Ok(Some(summary))
    }
}
