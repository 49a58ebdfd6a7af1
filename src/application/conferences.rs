//! Conference creation, lookup, and filtered queries.

use std::sync::Arc;

use futures::TryStreamExt;
use thiserror::Error;
use time::Date;
use tracing::info;

use crate::application::jobs::enqueue_confirmation_email_job;
use crate::application::query::{FilterError, RawFilter, translate_filters};
use crate::application::repos::{
    ConferencesRepo, CreateConferenceParams, JobsRepo, ProfilesRepo, RepoError,
};
use crate::domain::entities::ConferenceRecord;
use crate::infra::http::auth::CurrentUser;

const DEFAULT_CITY: &str = "Default City";
const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error("conference not found")]
    NotFound,
    #[error("conference `name` field required")]
    NameRequired,
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateConferenceCommand {
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub max_attendees: Option<i32>,
}

/// A conference plus its organizer's display name, for read responses.
#[derive(Debug, Clone)]
pub struct ConferenceWithOrganizer {
    pub conference: ConferenceRecord,
    pub organizer_display_name: Option<String>,
}

pub struct ConferenceService {
    conferences: Arc<dyn ConferencesRepo>,
    profiles: Arc<dyn ProfilesRepo>,
    jobs: Arc<dyn JobsRepo>,
}

impl ConferenceService {
    pub fn new(
        conferences: Arc<dyn ConferencesRepo>,
        profiles: Arc<dyn ProfilesRepo>,
        jobs: Arc<dyn JobsRepo>,
    ) -> Self {
        Self {
            conferences,
            profiles,
            jobs,
        }
    }

    /// Create a conference owned by the caller. Missing optional fields
    /// take the documented defaults; seats start equal to the attendee
    /// cap. A confirmation-email job is enqueued after the row commits.
    pub async fn create(
        &self,
        user: &CurrentUser,
        command: CreateConferenceCommand,
    ) -> Result<ConferenceRecord, ConferenceError> {
        if command.name.trim().is_empty() {
            return Err(ConferenceError::NameRequired);
        }

        let city = command
            .city
            .filter(|city| !city.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CITY.to_string());
        let topics = if command.topics.is_empty() {
            DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
        } else {
            command.topics
        };
        let month = command
            .start_date
            .map(|date| date.month() as i16)
            .unwrap_or(0);
        let max_attendees = command.max_attendees.unwrap_or(0).max(0);

        let conference = self
            .conferences
            .create_conference(CreateConferenceParams {
                name: command.name,
                description: command.description,
                topics,
                city,
                start_date: command.start_date,
                end_date: command.end_date,
                month,
                max_attendees,
                seats_available: max_attendees,
                organizer_id: user.user_id.clone(),
            })
            .await?;

        enqueue_confirmation_email_job(self.jobs.as_ref(), &user.email, &conference).await?;

        metrics::counter!("confero_conference_created_total").increment(1);
        info!(
            target = "application::conferences",
            conference_id = %conference.id,
            organizer = %user.user_id,
            "conference created"
        );

        Ok(conference)
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<ConferenceWithOrganizer, ConferenceError> {
        let conference = self
            .conferences
            .find_conference(id)
            .await?
            .ok_or(ConferenceError::NotFound)?;

        let organizer_display_name = self
            .profiles
            .find_profile(&conference.organizer_id)
            .await?
            .map(|profile| profile.display_name);

        Ok(ConferenceWithOrganizer {
            conference,
            organizer_display_name,
        })
    }

    pub async fn list_created(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<ConferenceRecord>, ConferenceError> {
        Ok(self.conferences.list_by_organizer(&user.user_id).await?)
    }

    pub async fn list_attending(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<ConferenceRecord>, ConferenceError> {
        Ok(self.conferences.list_attending(&user.user_id).await?)
    }

    /// Translate raw filters and run the plan against current state.
    pub async fn query(
        &self,
        filters: &[RawFilter],
    ) -> Result<Vec<ConferenceRecord>, ConferenceError> {
        let plan = translate_filters(filters)?;
        let results = self
            .conferences
            .query_conferences(plan)
            .try_collect()
            .await?;

        metrics::counter!("confero_conference_query_total").increment(1);
        Ok(results)
    }
}
