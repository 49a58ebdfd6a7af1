use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures::stream::{self, BoxStream};
use time::{Date, Month, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use confero::application::announcements::{
    ANNOUNCEMENT_KEY, AnnouncementService, FEATURED_SPEAKER_KEY, SummaryCache,
};
use confero::application::conferences::{
    ConferenceError, ConferenceService, CreateConferenceCommand,
};
use confero::application::profile::{ProfileService, SaveProfileCommand};
use confero::application::query::{FilterError, QueryPlan};
use confero::application::registration::RegistrationService;
use confero::application::repos::{
    ConferencesRepo, CreateConferenceParams, CreateSessionParams, JobsRepo, NewJobRecord,
    NewProfileParams, ProfilesRepo, RegistrationError, RegistrationsRepo, RepoError, SessionsRepo,
    SpeakersRepo, UpdateProfileParams,
};
use confero::application::sessions::{CreateSessionCommand, SessionError, SessionService};
use confero::application::speakers::SpeakerService;
use confero::domain::entities::{ConferenceRecord, ProfileRecord, SessionRecord, SpeakerRecord};
use confero::domain::types::{JobType, TeeShirtSize};
use confero::infra::cache::MemoryCache;
use confero::infra::db::PostgresRepositories;
use confero::infra::http::auth::{CurrentUser, SUBJECT_HEADER};
use confero::infra::http::{ApiState, build_api_router};

fn test_user() -> CurrentUser {
    CurrentUser {
        user_id: "auth0|alice".to_string(),
        display_name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
    }
}

fn conference_record(name: &str, organizer: &str, seats: i32) -> ConferenceRecord {
    ConferenceRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        topics: vec!["Rust".to_string()],
        city: "London".to_string(),
        start_date: None,
        end_date: None,
        month: 0,
        max_attendees: seats,
        seats_available: seats,
        organizer_id: organizer.to_string(),
        created_at: OffsetDateTime::now_utc(),
    }
}

fn session_record(conference_id: Uuid, name: &str, speaker_id: Option<Uuid>) -> SessionRecord {
    SessionRecord {
        id: Uuid::new_v4(),
        conference_id,
        name: name.to_string(),
        highlights: None,
        speaker_id,
        speaker_name: None,
        duration_minutes: None,
        session_type: None,
        date: None,
        start_time: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[derive(Default)]
struct InMemoryProfiles {
    profiles: Mutex<HashMap<String, ProfileRecord>>,
}

#[async_trait]
impl ProfilesRepo for InMemoryProfiles {
    async fn find_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, RepoError> {
        Ok(self.profiles.lock().await.get(user_id).cloned())
    }

    async fn insert_profile(&self, params: NewProfileParams) -> Result<ProfileRecord, RepoError> {
        let mut profiles = self.profiles.lock().await;
        if profiles.contains_key(&params.user_id) {
            return Err(RepoError::Duplicate {
                constraint: "profiles_pkey".to_string(),
            });
        }
        let record = ProfileRecord {
            user_id: params.user_id.clone(),
            display_name: params.display_name,
            email: params.email,
            tee_shirt_size: params.tee_shirt_size,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        profiles.insert(params.user_id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        params: UpdateProfileParams,
    ) -> Result<ProfileRecord, RepoError> {
        let mut profiles = self.profiles.lock().await;
        let record = profiles
            .get_mut(&params.user_id)
            .ok_or(RepoError::NotFound)?;
        if let Some(display_name) = params.display_name {
            record.display_name = display_name;
        }
        if let Some(size) = params.tee_shirt_size {
            record.tee_shirt_size = size;
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }
}

/// Records enqueued jobs without executing anything.
#[derive(Default)]
struct RecordingJobs {
    jobs: Mutex<Vec<NewJobRecord>>,
}

impl RecordingJobs {
    async fn enqueued(&self) -> Vec<NewJobRecord> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl JobsRepo for RecordingJobs {
    async fn enqueue_job(&self, job: NewJobRecord) -> Result<String, RepoError> {
        self.jobs.lock().await.push(job);
        Ok(Uuid::new_v4().to_string())
    }
}

/// Stores conference records and captures the last executed query plan.
#[derive(Default)]
struct InMemoryConferences {
    conferences: Mutex<Vec<ConferenceRecord>>,
    nearly_sold_out: Mutex<Vec<ConferenceRecord>>,
    last_plan: Mutex<Option<QueryPlan>>,
}

impl InMemoryConferences {
    async fn push(&self, record: ConferenceRecord) {
        self.conferences.lock().await.push(record);
    }

    async fn last_plan(&self) -> Option<QueryPlan> {
        self.last_plan.lock().await.clone()
    }
}

#[async_trait]
impl ConferencesRepo for InMemoryConferences {
    async fn create_conference(
        &self,
        params: CreateConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        let record = ConferenceRecord {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            topics: params.topics,
            city: params.city,
            start_date: params.start_date,
            end_date: params.end_date,
            month: params.month,
            max_attendees: params.max_attendees,
            seats_available: params.seats_available,
            organizer_id: params.organizer_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.conferences.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError> {
        Ok(self
            .conferences
            .lock()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_by_organizer(
        &self,
        organizer_id: &str,
    ) -> Result<Vec<ConferenceRecord>, RepoError> {
        Ok(self
            .conferences
            .lock()
            .await
            .iter()
            .filter(|c| c.organizer_id == organizer_id)
            .cloned()
            .collect())
    }

    async fn list_attending(&self, _user_id: &str) -> Result<Vec<ConferenceRecord>, RepoError> {
        Ok(Vec::new())
    }

    fn query_conferences(
        &self,
        plan: QueryPlan,
    ) -> BoxStream<'_, Result<ConferenceRecord, RepoError>> {
        let conferences = self.conferences.try_lock().map(|c| c.clone()).unwrap();
        *self.last_plan.try_lock().unwrap() = Some(plan);
        Box::pin(stream::iter(conferences.into_iter().map(Ok)))
    }

    async fn list_nearly_sold_out(
        &self,
        _threshold: i32,
    ) -> Result<Vec<ConferenceRecord>, RepoError> {
        Ok(self.nearly_sold_out.lock().await.clone())
    }
}

#[derive(Default)]
struct InMemorySessions {
    sessions: Mutex<Vec<SessionRecord>>,
}

impl InMemorySessions {
    async fn push(&self, record: SessionRecord) {
        self.sessions.lock().await.push(record);
    }
}

#[async_trait]
impl SessionsRepo for InMemorySessions {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            conference_id: params.conference_id,
            name: params.name,
            highlights: params.highlights,
            speaker_id: params.speaker_id,
            speaker_name: None,
            duration_minutes: params.duration_minutes,
            session_type: params.session_type,
            date: params.date,
            start_time: params.start_time,
            created_at: OffsetDateTime::now_utc(),
        };
        self.sessions.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_for_conference(
        &self,
        conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.conference_id == conference_id)
            .cloned()
            .collect())
    }

    async fn list_by_type(
        &self,
        conference_id: Uuid,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| {
                s.conference_id == conference_id
                    && s.session_type.as_deref() == Some(session_type)
            })
            .cloned()
            .collect())
    }

    async fn list_by_speaker(&self, speaker_id: Uuid) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.speaker_id == Some(speaker_id))
            .cloned()
            .collect())
    }

    async fn list_by_date_range(
        &self,
        conference_id: Uuid,
        start: Date,
        end: Date,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| {
                s.conference_id == conference_id
                    && s.date.is_some_and(|d| d >= start && d <= end)
            })
            .cloned()
            .collect())
    }

    async fn list_for_speaker_in_conference(
        &self,
        conference_id: Uuid,
        speaker_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.conference_id == conference_id && s.speaker_id == Some(speaker_id))
            .cloned()
            .collect())
    }

    async fn list_wishlisted(
        &self,
        _user_id: &str,
        _conference_id: Uuid,
    ) -> Result<Vec<SessionRecord>, RepoError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct InMemorySpeakers {
    speakers: Mutex<Vec<SpeakerRecord>>,
}

impl InMemorySpeakers {
    async fn push(&self, record: SpeakerRecord) {
        self.speakers.lock().await.push(record);
    }
}

#[async_trait]
impl SpeakersRepo for InMemorySpeakers {
    async fn find_or_create_speaker(&self, name: &str) -> Result<SpeakerRecord, RepoError> {
        let mut speakers = self.speakers.lock().await;
        if let Some(existing) = speakers.iter().find(|s| s.name == name) {
            return Ok(existing.clone());
        }
        let record = SpeakerRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        speakers.push(record.clone());
        Ok(record)
    }

    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError> {
        Ok(self
            .speakers
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_speakers(&self) -> Result<Vec<SpeakerRecord>, RepoError> {
        Ok(self.speakers.lock().await.clone())
    }

    async fn list_for_conference(
        &self,
        _conference_id: Uuid,
    ) -> Result<Vec<SpeakerRecord>, RepoError> {
        Ok(self.speakers.lock().await.clone())
    }
}

// -------- Profiles --------

#[tokio::test]
async fn profile_is_created_lazily_and_reused() {
    let profiles = Arc::new(InMemoryProfiles::default());
    let service = ProfileService::new(profiles.clone());
    let user = test_user();

    let first = service.get_or_create(&user).await.unwrap();
    assert_eq!(first.user_id, "auth0|alice");
    assert_eq!(first.display_name, "Alice");
    assert_eq!(first.tee_shirt_size, TeeShirtSize::NotSpecified);

    let second = service.get_or_create(&user).await.unwrap();
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(profiles.profiles.lock().await.len(), 1);
}

#[tokio::test]
async fn profile_save_updates_only_provided_fields() {
    let profiles = Arc::new(InMemoryProfiles::default());
    let service = ProfileService::new(profiles);
    let user = test_user();

    let updated = service
        .save(
            &user,
            SaveProfileCommand {
                display_name: None,
                tee_shirt_size: Some(TeeShirtSize::LM),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.display_name, "Alice");
    assert_eq!(updated.tee_shirt_size, TeeShirtSize::LM);
}

// -------- Conferences --------

fn conference_service(
    conferences: Arc<InMemoryConferences>,
    jobs: Arc<RecordingJobs>,
) -> ConferenceService {
    ConferenceService::new(conferences, Arc::new(InMemoryProfiles::default()), jobs)
}

#[tokio::test]
async fn conference_create_applies_defaults_and_queues_confirmation() {
    let conferences = Arc::new(InMemoryConferences::default());
    let jobs = Arc::new(RecordingJobs::default());
    let service = conference_service(conferences.clone(), jobs.clone());
    let user = test_user();

    let created = service
        .create(
            &user,
            CreateConferenceCommand {
                name: "RustConf".to_string(),
                description: None,
                topics: Vec::new(),
                city: None,
                start_date: Some(Date::from_calendar_date(2026, Month::June, 18).unwrap()),
                end_date: None,
                max_attendees: Some(120),
            },
        )
        .await
        .unwrap();

    assert_eq!(created.city, "Default City");
    assert_eq!(created.topics, vec!["Default", "Topic"]);
    assert_eq!(created.month, 6);
    assert_eq!(created.max_attendees, 120);
    assert_eq!(created.seats_available, 120);
    assert_eq!(created.organizer_id, user.user_id);

    let enqueued = jobs.enqueued().await;
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].job_type, JobType::SendConfirmationEmail);
    assert_eq!(
        enqueued[0].payload["recipient"].as_str(),
        Some("alice@example.com")
    );
}

#[tokio::test]
async fn conference_create_without_start_date_has_month_zero() {
    let conferences = Arc::new(InMemoryConferences::default());
    let jobs = Arc::new(RecordingJobs::default());
    let service = conference_service(conferences, jobs);

    let created = service
        .create(
            &test_user(),
            CreateConferenceCommand {
                name: "Undated".to_string(),
                description: None,
                topics: vec!["Rust".to_string()],
                city: Some("Berlin".to_string()),
                start_date: None,
                end_date: None,
                max_attendees: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(created.month, 0);
    assert_eq!(created.max_attendees, 0);
    assert_eq!(created.seats_available, 0);
    assert_eq!(created.city, "Berlin");
    assert_eq!(created.topics, vec!["Rust"]);
}

#[tokio::test]
async fn conference_create_requires_a_name() {
    let service = conference_service(
        Arc::new(InMemoryConferences::default()),
        Arc::new(RecordingJobs::default()),
    );

    let err = service
        .create(
            &test_user(),
            CreateConferenceCommand {
                name: "   ".to_string(),
                description: None,
                topics: Vec::new(),
                city: None,
                start_date: None,
                end_date: None,
                max_attendees: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConferenceError::NameRequired));
}

#[tokio::test]
async fn conference_query_passes_validated_plan_to_repo() {
    let conferences = Arc::new(InMemoryConferences::default());
    conferences
        .push(conference_record("RustConf", "auth0|bob", 10))
        .await;
    let service = conference_service(conferences.clone(), Arc::new(RecordingJobs::default()));

    let filters = [
        confero::application::query::RawFilter {
            field: "CITY".to_string(),
            operator: "EQ".to_string(),
            value: "London".to_string(),
        },
        confero::application::query::RawFilter {
            field: "MONTH".to_string(),
            operator: "GT".to_string(),
            value: "5".to_string(),
        },
    ];

    let results = service.query(&filters).await.unwrap();
    assert_eq!(results.len(), 1);

    let plan = conferences.last_plan().await.expect("plan captured");
    assert_eq!(plan.filters.len(), 2);
    assert_eq!(plan.order_columns(), vec!["month", "name"]);
}

#[tokio::test]
async fn conference_query_rejects_conflicting_inequalities() {
    let service = conference_service(
        Arc::new(InMemoryConferences::default()),
        Arc::new(RecordingJobs::default()),
    );

    let filters = [
        confero::application::query::RawFilter {
            field: "MONTH".to_string(),
            operator: "GT".to_string(),
            value: "5".to_string(),
        },
        confero::application::query::RawFilter {
            field: "MAX_ATTENDEES".to_string(),
            operator: "LT".to_string(),
            value: "100".to_string(),
        },
    ];

    let err = service.query(&filters).await.unwrap_err();
    assert!(matches!(
        err,
        ConferenceError::Filter(FilterError::MultipleInequalityFields)
    ));
}

// -------- Sessions --------

struct SessionFixture {
    service: SessionService,
    conferences: Arc<InMemoryConferences>,
    speakers: Arc<InMemorySpeakers>,
    jobs: Arc<RecordingJobs>,
}

fn session_fixture() -> SessionFixture {
    let conferences = Arc::new(InMemoryConferences::default());
    let sessions = Arc::new(InMemorySessions::default());
    let speakers = Arc::new(InMemorySpeakers::default());
    let jobs = Arc::new(RecordingJobs::default());
    let service = SessionService::new(
        sessions,
        conferences.clone(),
        speakers.clone(),
        jobs.clone(),
    );
    SessionFixture {
        service,
        conferences,
        speakers,
        jobs,
    }
}

fn session_command(conference_id: Uuid, speaker: Option<&str>) -> CreateSessionCommand {
    CreateSessionCommand {
        conference_id,
        name: "Borrow checker deep dive".to_string(),
        highlights: None,
        speaker: speaker.map(|s| s.to_string()),
        duration_minutes: Some(45),
        session_type: Some("workshop".to_string()),
        date: None,
        start_time: None,
    }
}

#[tokio::test]
async fn session_create_is_organizer_only() {
    let fixture = session_fixture();
    let conference = conference_record("RustConf", "auth0|someone-else", 10);
    fixture.conferences.push(conference.clone()).await;

    let err = fixture
        .service
        .create(&test_user(), session_command(conference.id, None))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::NotOrganizer));
    assert!(fixture.jobs.enqueued().await.is_empty());
}

#[tokio::test]
async fn session_create_unknown_conference_is_not_found() {
    let fixture = session_fixture();

    let err = fixture
        .service
        .create(&test_user(), session_command(Uuid::new_v4(), None))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::ConferenceNotFound));
}

#[tokio::test]
async fn session_create_resolves_speaker_and_queues_featured_update() {
    let fixture = session_fixture();
    let user = test_user();
    let conference = conference_record("RustConf", &user.user_id, 10);
    fixture.conferences.push(conference.clone()).await;

    let session = fixture
        .service
        .create(&user, session_command(conference.id, Some("Grace Hopper")))
        .await
        .unwrap();

    let speakers = fixture.speakers.list_speakers().await.unwrap();
    assert_eq!(speakers.len(), 1);
    assert_eq!(speakers[0].name, "Grace Hopper");
    assert_eq!(session.speaker_id, Some(speakers[0].id));

    let enqueued = fixture.jobs.enqueued().await;
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].job_type, JobType::UpdateFeaturedSpeaker);

    // Same name resolves to the same speaker record.
    fixture
        .service
        .create(&user, session_command(conference.id, Some("Grace Hopper")))
        .await
        .unwrap();
    assert_eq!(fixture.speakers.list_speakers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn session_create_without_speaker_queues_nothing() {
    let fixture = session_fixture();
    let user = test_user();
    let conference = conference_record("RustConf", &user.user_id, 10);
    fixture.conferences.push(conference.clone()).await;

    let session = fixture
        .service
        .create(&user, session_command(conference.id, None))
        .await
        .unwrap();

    assert_eq!(session.speaker_id, None);
    assert!(fixture.jobs.enqueued().await.is_empty());
}

// -------- Announcements --------

struct AnnouncementFixture {
    service: AnnouncementService,
    conferences: Arc<InMemoryConferences>,
    sessions: Arc<InMemorySessions>,
    speakers: Arc<InMemorySpeakers>,
    cache: Arc<MemoryCache>,
}

fn announcement_fixture() -> AnnouncementFixture {
    let conferences = Arc::new(InMemoryConferences::default());
    let sessions = Arc::new(InMemorySessions::default());
    let speakers = Arc::new(InMemorySpeakers::default());
    let cache = Arc::new(MemoryCache::new());
    let service = AnnouncementService::new(
        conferences.clone(),
        sessions.clone(),
        speakers.clone(),
        cache.clone(),
    );
    AnnouncementFixture {
        service,
        conferences,
        sessions,
        speakers,
        cache,
    }
}

#[tokio::test]
async fn announcement_names_nearly_sold_out_conferences() {
    let fixture = announcement_fixture();
    fixture
        .conferences
        .nearly_sold_out
        .lock()
        .await
        .extend([
            conference_record("EuroRust", "auth0|bob", 2),
            conference_record("RustConf", "auth0|bob", 5),
        ]);

    let message = fixture.service.refresh_announcement().await.unwrap();
    assert_eq!(
        message,
        "Last chance to attend! The following conferences are nearly sold out: EuroRust, RustConf"
    );
    assert_eq!(fixture.service.announcement(), message);
}

#[tokio::test]
async fn announcement_clears_when_nothing_is_nearly_sold_out() {
    let fixture = announcement_fixture();
    fixture
        .cache
        .set(ANNOUNCEMENT_KEY, "stale announcement".to_string());

    let message = fixture.service.refresh_announcement().await.unwrap();
    assert_eq!(message, "");
    assert_eq!(fixture.service.announcement(), "");
}

#[tokio::test]
async fn featured_speaker_requires_more_than_one_session() {
    let fixture = announcement_fixture();
    let conference = conference_record("RustConf", "auth0|bob", 10);
    let speaker = fixture
        .speakers
        .find_or_create_speaker("Grace Hopper")
        .await
        .unwrap();
    fixture
        .sessions
        .push(session_record(conference.id, "Keynote", Some(speaker.id)))
        .await;

    let updated = fixture
        .service
        .refresh_featured_speaker(conference.id, speaker.id)
        .await
        .unwrap();
    assert_eq!(updated, None);
    assert_eq!(fixture.service.featured_speaker(), "");

    fixture
        .sessions
        .push(session_record(conference.id, "Workshop", Some(speaker.id)))
        .await;

    let updated = fixture
        .service
        .refresh_featured_speaker(conference.id, speaker.id)
        .await
        .unwrap()
        .expect("speaker now featured");
    assert!(updated.contains("Grace Hopper"));
    assert!(updated.contains("Keynote"));
    assert!(updated.contains("Workshop"));
    assert_eq!(fixture.service.featured_speaker(), updated);
}

#[tokio::test]
async fn featured_speaker_summary_is_not_cleared_by_non_qualifying_speaker() {
    let fixture = announcement_fixture();
    let conference = conference_record("RustConf", "auth0|bob", 10);
    fixture
        .cache
        .set(FEATURED_SPEAKER_KEY, "previous star".to_string());
    let speaker = fixture
        .speakers
        .find_or_create_speaker("Newcomer")
        .await
        .unwrap();
    fixture
        .sessions
        .push(session_record(conference.id, "Lightning talk", Some(speaker.id)))
        .await;

    let updated = fixture
        .service
        .refresh_featured_speaker(conference.id, speaker.id)
        .await
        .unwrap();

    assert_eq!(updated, None);
    assert_eq!(fixture.service.featured_speaker(), "previous star");
}

// -------- Registration protocol --------

fn other_user() -> CurrentUser {
    CurrentUser {
        user_id: "auth0|bob".to_string(),
        display_name: "Bob".to_string(),
        email: "bob@example.com".to_string(),
    }
}

/// Registrations double that keeps real seat accounting: preconditions
/// are checked against shared state and the counter moves with the
/// membership rows, mirroring the transactional contract.
#[derive(Default)]
struct InMemoryRegistrations {
    seats: Mutex<HashMap<Uuid, i32>>,
    attending: Mutex<Vec<(String, Uuid)>>,
    sessions: Mutex<Vec<Uuid>>,
    wishlist: Mutex<Vec<(String, Uuid)>>,
}

impl InMemoryRegistrations {
    async fn add_conference(&self, conference_id: Uuid, seats: i32) {
        self.seats.lock().await.insert(conference_id, seats);
    }

    async fn add_session(&self, session_id: Uuid) {
        self.sessions.lock().await.push(session_id);
    }

    async fn seats_left(&self, conference_id: Uuid) -> i32 {
        self.seats.lock().await[&conference_id]
    }

    async fn attendee_count(&self, conference_id: Uuid) -> usize {
        self.attending
            .lock()
            .await
            .iter()
            .filter(|(_, c)| *c == conference_id)
            .count()
    }
}

#[async_trait]
impl RegistrationsRepo for InMemoryRegistrations {
    async fn register(&self, user_id: &str, conference_id: Uuid) -> Result<(), RegistrationError> {
        let mut seats = self.seats.lock().await;
        let remaining = seats
            .get_mut(&conference_id)
            .ok_or(RegistrationError::ConferenceNotFound)?;

        let mut attending = self.attending.lock().await;
        if attending
            .iter()
            .any(|(u, c)| u == user_id && *c == conference_id)
        {
            return Err(RegistrationError::AlreadyRegistered);
        }
        if *remaining <= 0 {
            return Err(RegistrationError::NoSeatsAvailable);
        }

        attending.push((user_id.to_string(), conference_id));
        *remaining -= 1;
        Ok(())
    }

    async fn unregister(
        &self,
        user_id: &str,
        conference_id: Uuid,
    ) -> Result<bool, RegistrationError> {
        let mut seats = self.seats.lock().await;
        let remaining = seats
            .get_mut(&conference_id)
            .ok_or(RegistrationError::ConferenceNotFound)?;

        let mut attending = self.attending.lock().await;
        let before = attending.len();
        attending.retain(|(u, c)| !(u == user_id && *c == conference_id));
        if attending.len() == before {
            return Ok(false);
        }

        *remaining += 1;
        Ok(true)
    }

    async fn wishlist_add(
        &self,
        user_id: &str,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        if !self.sessions.lock().await.contains(&session_id) {
            return Err(RegistrationError::SessionNotFound);
        }

        let mut wishlist = self.wishlist.lock().await;
        if wishlist.contains(&(user_id.to_string(), session_id)) {
            return Err(RegistrationError::AlreadyWishlisted);
        }
        wishlist.push((user_id.to_string(), session_id));
        Ok(())
    }

    async fn wishlist_remove(
        &self,
        user_id: &str,
        session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        let mut wishlist = self.wishlist.lock().await;
        let before = wishlist.len();
        wishlist.retain(|(u, s)| !(u == user_id && *s == session_id));
        if wishlist.len() == before {
            if !self.sessions.lock().await.contains(&session_id) {
                return Err(RegistrationError::SessionNotFound);
            }
            return Err(RegistrationError::NotWishlisted);
        }
        Ok(())
    }
}

#[tokio::test]
async fn duplicate_registration_consumes_exactly_one_seat() {
    let repo = Arc::new(InMemoryRegistrations::default());
    let service = RegistrationService::new(repo.clone());
    let conference_id = Uuid::new_v4();
    repo.add_conference(conference_id, 2).await;

    service.register(&test_user(), conference_id).await.unwrap();
    let second = service.register(&test_user(), conference_id).await;

    assert!(matches!(second, Err(RegistrationError::AlreadyRegistered)));
    assert_eq!(repo.seats_left(conference_id).await, 1);
    assert_eq!(repo.attendee_count(conference_id).await, 1);
}

#[tokio::test]
async fn registration_without_seats_leaves_state_unchanged() {
    let repo = Arc::new(InMemoryRegistrations::default());
    let service = RegistrationService::new(repo.clone());
    let conference_id = Uuid::new_v4();
    repo.add_conference(conference_id, 0).await;

    let result = service.register(&test_user(), conference_id).await;

    assert!(matches!(result, Err(RegistrationError::NoSeatsAvailable)));
    assert_eq!(repo.seats_left(conference_id).await, 0);
    assert_eq!(repo.attendee_count(conference_id).await, 0);
}

#[tokio::test]
async fn unregistering_a_non_attendee_keeps_the_counter() {
    let repo = Arc::new(InMemoryRegistrations::default());
    let service = RegistrationService::new(repo.clone());
    let conference_id = Uuid::new_v4();
    repo.add_conference(conference_id, 3).await;

    service.register(&test_user(), conference_id).await.unwrap();
    let removed = service.unregister(&other_user(), conference_id).await.unwrap();

    assert!(!removed);
    assert_eq!(repo.seats_left(conference_id).await, 2);
    assert_eq!(repo.attendee_count(conference_id).await, 1);
}

#[tokio::test]
async fn cancelling_a_registration_returns_the_seat() {
    let repo = Arc::new(InMemoryRegistrations::default());
    let service = RegistrationService::new(repo.clone());
    let conference_id = Uuid::new_v4();
    repo.add_conference(conference_id, 1).await;

    service.register(&test_user(), conference_id).await.unwrap();
    assert_eq!(repo.seats_left(conference_id).await, 0);

    let removed = service.unregister(&test_user(), conference_id).await.unwrap();
    assert!(removed);
    assert_eq!(repo.seats_left(conference_id).await, 1);

    // The freed seat is available again.
    service.register(&other_user(), conference_id).await.unwrap();
    assert_eq!(repo.seats_left(conference_id).await, 0);
}

#[tokio::test]
async fn wishlist_protocol_flags_duplicates_and_absences() {
    let repo = Arc::new(InMemoryRegistrations::default());
    let service = RegistrationService::new(repo.clone());
    let session_id = Uuid::new_v4();
    repo.add_session(session_id).await;

    service.wishlist_add(&test_user(), session_id).await.unwrap();
    let again = service.wishlist_add(&test_user(), session_id).await;
    assert!(matches!(again, Err(RegistrationError::AlreadyWishlisted)));

    service
        .wishlist_remove(&test_user(), session_id)
        .await
        .unwrap();
    let absent = service.wishlist_remove(&test_user(), session_id).await;
    assert!(matches!(absent, Err(RegistrationError::NotWishlisted)));

    let unknown = service.wishlist_add(&test_user(), Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(RegistrationError::SessionNotFound)));
}

// -------- Router --------

/// Lenient registrations stub for routing tests. Every command succeeds
/// and `unregister` reports nothing was removed.
struct NoopRegistrations;

#[async_trait]
impl RegistrationsRepo for NoopRegistrations {
    async fn register(
        &self,
        _user_id: &str,
        _conference_id: Uuid,
    ) -> Result<(), RegistrationError> {
        Ok(())
    }

    async fn unregister(
        &self,
        _user_id: &str,
        _conference_id: Uuid,
    ) -> Result<bool, RegistrationError> {
        Ok(false)
    }

    async fn wishlist_add(
        &self,
        _user_id: &str,
        _session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        Ok(())
    }

    async fn wishlist_remove(
        &self,
        _user_id: &str,
        _session_id: Uuid,
    ) -> Result<(), RegistrationError> {
        Err(RegistrationError::NotWishlisted)
    }
}

fn test_router(cache: Arc<MemoryCache>) -> axum::Router {
    test_router_with(cache, Arc::new(NoopRegistrations))
}

fn test_router_with(
    cache: Arc<MemoryCache>,
    registrations: Arc<dyn RegistrationsRepo>,
) -> axum::Router {
    let profiles: Arc<dyn ProfilesRepo> = Arc::new(InMemoryProfiles::default());
    let conferences: Arc<dyn ConferencesRepo> = Arc::new(InMemoryConferences::default());
    let sessions: Arc<dyn SessionsRepo> = Arc::new(InMemorySessions::default());
    let speakers: Arc<dyn SpeakersRepo> = Arc::new(InMemorySpeakers::default());
    let jobs: Arc<dyn JobsRepo> = Arc::new(RecordingJobs::default());

    let announcements = Arc::new(AnnouncementService::new(
        conferences.clone(),
        sessions.clone(),
        speakers.clone(),
        cache,
    ));

    // Lazy pool; routing tests never touch the database.
    let pool = sqlx::postgres::PgPool::connect_lazy("postgres://confero@localhost/confero_test")
        .expect("lazy pool");

    let state = ApiState {
        profiles: Arc::new(ProfileService::new(profiles.clone())),
        conferences: Arc::new(ConferenceService::new(
            conferences.clone(),
            profiles,
            jobs.clone(),
        )),
        sessions: Arc::new(SessionService::new(
            sessions.clone(),
            conferences,
            speakers.clone(),
            jobs,
        )),
        speakers: Arc::new(SpeakerService::new(speakers, sessions)),
        registrations: Arc::new(RegistrationService::new(registrations)),
        announcements,
        db: Arc::new(PostgresRepositories::new(pool)),
    };

    build_api_router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let router = test_router(Arc::new(MemoryCache::new()));

    let response = router
        .oneshot(
            Request::get("/api/v1/announcement")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn announcement_endpoint_serves_cached_value() {
    let cache = Arc::new(MemoryCache::new());
    cache.set(ANNOUNCEMENT_KEY, "seats are going fast".to_string());
    let router = test_router(cache);

    let response = router
        .oneshot(
            Request::get("/api/v1/announcement")
                .header(SUBJECT_HEADER, "auth0|alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "seats are going fast");
}

#[tokio::test]
async fn conference_create_endpoint_returns_camel_case_resource() {
    let router = test_router(Arc::new(MemoryCache::new()));

    let response = router
        .oneshot(
            Request::post("/api/v1/conferences")
                .header(SUBJECT_HEADER, "auth0|alice")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"name":"RustConf","maxAttendees":50,"startDate":"2026-06-18"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "RustConf");
    assert_eq!(body["city"], "Default City");
    assert_eq!(body["seatsAvailable"], 50);
    assert_eq!(body["maxAttendees"], 50);
    assert_eq!(body["month"], 6);
    assert_eq!(body["startDate"], "2026-06-18");
}

#[tokio::test]
async fn unregister_endpoint_reports_lenient_removal() {
    let router = test_router(Arc::new(MemoryCache::new()));

    let response = router
        .oneshot(
            Request::delete(format!(
                "/api/v1/conferences/{}/registration",
                Uuid::new_v4()
            ))
            .header(SUBJECT_HEADER, "auth0|alice")
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["removed"], false);
}

#[tokio::test]
async fn register_endpoint_conflicts_on_duplicate_registration() {
    struct DuplicateRegistrations;

    #[async_trait]
    impl RegistrationsRepo for DuplicateRegistrations {
        async fn register(
            &self,
            _user_id: &str,
            _conference_id: Uuid,
        ) -> Result<(), RegistrationError> {
            Err(RegistrationError::AlreadyRegistered)
        }

        async fn unregister(
            &self,
            _user_id: &str,
            _conference_id: Uuid,
        ) -> Result<bool, RegistrationError> {
            Ok(false)
        }

        async fn wishlist_add(
            &self,
            _user_id: &str,
            _session_id: Uuid,
        ) -> Result<(), RegistrationError> {
            Ok(())
        }

        async fn wishlist_remove(
            &self,
            _user_id: &str,
            _session_id: Uuid,
        ) -> Result<(), RegistrationError> {
            Ok(())
        }
    }

    let router = test_router_with(Arc::new(MemoryCache::new()), Arc::new(DuplicateRegistrations));

    let response = router
        .oneshot(
            Request::post(format!(
                "/api/v1/conferences/{}/registration",
                Uuid::new_v4()
            ))
            .header(SUBJECT_HEADER, "auth0|alice")
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(
        body["error"]["message"],
        "Already registered for this conference"
    );
}

#[tokio::test]
async fn wishlist_remove_endpoint_conflicts_when_not_wishlisted() {
    let router = test_router(Arc::new(MemoryCache::new()));

    let response = router
        .oneshot(
            Request::delete(format!("/api/v1/sessions/{}/wishlist", Uuid::new_v4()))
                .header(SUBJECT_HEADER, "auth0|alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "conflict");
}
