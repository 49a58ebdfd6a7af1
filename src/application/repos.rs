//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::application::query::QueryPlan;
use crate::domain::entities::{ConferenceRecord, ProfileRecord, SessionRecord, SpeakerRecord};
use crate::domain::types::{JobType, TeeShirtSize};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("foreign key constraint `{constraint}` violated")]
    ForeignKey { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Failure modes of the transactional registration/wishlist protocol.
/// Each variant corresponds to a precondition checked inside the same
/// transaction that performs the writes, so an error always means no
/// state changed.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("conference not found")]
    ConferenceNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("already registered for this conference")]
    AlreadyRegistered,
    #[error("no seats available")]
    NoSeatsAvailable,
    #[error("session is already in the wishlist")]
    AlreadyWishlisted,
    #[error("session is not in the wishlist")]
    NotWishlisted,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewProfileParams {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub tee_shirt_size: TeeShirtSize,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub user_id: String,
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

#[async_trait]
pub trait ProfilesRepo: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, RepoError>;

    async fn insert_profile(&self, params: NewProfileParams) -> Result<ProfileRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams)
    -> Result<ProfileRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateConferenceParams {
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub month: i16,
    pub max_attendees: i32,
    pub seats_available: i32,
    pub organizer_id: String,
}

#[async_trait]
pub trait ConferencesRepo: Send + Sync {
    async fn create_conference(
        &self,
        params: CreateConferenceParams,
    ) -> Result<ConferenceRecord, RepoError>;

    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError>;

    async fn list_by_organizer(
        &self,
        organizer_id: &str,
    ) -> Result<Vec<ConferenceRecord>, RepoError>;

    /// Conferences the user is registered for, in registration order.
    async fn list_attending(&self, user_id: &str) -> Result<Vec<ConferenceRecord>, RepoError>;

    /// Execute a validated query plan. The stream reflects current state
    /// at iteration time and honors the plan's ordering contract.
    fn query_conferences(
        &self,
        plan: QueryPlan,
    ) -> BoxStream<'_, Result<ConferenceRecord, RepoError>>;

    /// Conferences with `0 < seats_available <= threshold`, by name.
    async fn list_nearly_sold_out(
        &self,
        threshold: i32,
    ) -> Result<Vec<ConferenceRecord>, RepoError>;
}

/// Atomic seat/wishlist mutations. Implementations must run each
/// operation as a single transaction spanning the profile's membership
/// rows and (for registration) the conference's seat counter.
#[async_trait]
pub trait RegistrationsRepo: Send + Sync {
    async fn register(&self, user_id: &str, conference_id: Uuid) -> Result<(), RegistrationError>;

    /// Returns `false` (not an error) when the user was not attending.
    async fn unregister(
        &self,
        user_id: &str,
        conference_id: Uuid,
    ) -> Result<bool, RegistrationError>;

    async fn wishlist_add(&self, user_id: &str, session_id: Uuid)
    -> Result<(), RegistrationError>;

    async fn wishlist_remove(
        &self,
        user_id: &str,
        session_id: Uuid,
    ) -> Result<(), RegistrationError>;
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub conference_id: Uuid,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub session_type: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<Time>,
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError>;

    async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError>;

    async fn list_by_type(
        &self,
        conference_id: Uuid,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, RepoError>;

    async fn list_by_speaker(&self, speaker_id: Uuid) -> Result<Vec<SessionRecord>, RepoError>;

    async fn list_by_date_range(
        &self,
        conference_id: Uuid,
        start: Date,
        end: Date,
    ) -> Result<Vec<SessionRecord>, RepoError>;

    /// Sessions of one speaker within one conference, by date.
    async fn list_for_speaker_in_conference(
        &self,
        conference_id: Uuid,
        speaker_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError>;

    /// The user's wishlisted sessions scoped to one conference, in
    /// wishlist order.
    async fn list_wishlisted(
        &self,
        user_id: &str,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError>;
}

#[async_trait]
pub trait SpeakersRepo: Send + Sync {
    /// Dedup-by-name lookup-or-create.
    async fn find_or_create_speaker(&self, name: &str) -> Result<SpeakerRecord, RepoError>;

    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError>;

    async fn list_speakers(&self) -> Result<Vec<SpeakerRecord>, RepoError>;

    /// Distinct speakers appearing in a conference's sessions, by name.
    async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SpeakerRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewJobRecord {
    pub job_type: JobType,
    pub payload: serde_json::Value,
    pub run_at: OffsetDateTime,
    pub max_attempts: i32,
    pub priority: i32,
}

#[async_trait]
pub trait JobsRepo: Send + Sync {
    /// Enqueue a deferred job, returning the queue-assigned id.
    async fn enqueue_job(&self, job: NewJobRecord) -> Result<String, RepoError>;
}
