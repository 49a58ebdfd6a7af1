use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::conferences::{ConferenceError, CreateConferenceCommand};
use crate::application::profile::{ProfileError, SaveProfileCommand};
use crate::application::query::RawFilter;
use crate::application::repos::{RegistrationError, RepoError};
use crate::application::sessions::{CreateSessionCommand, SessionError};
use crate::application::speakers::SpeakerError;

use super::auth::CurrentUser;
use super::error::{ApiError, codes};
use super::models::*;
use super::state::ApiState;

fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::ForeignKey { constraint } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Referenced resource not found",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => {
            ApiError::bad_request("Invalid input", Some(message))
        }
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(message),
        ),
    }
}

fn profile_to_api(err: ProfileError) -> ApiError {
    match err {
        ProfileError::Repo(err) => repo_to_api(err),
    }
}

fn conference_to_api(err: ConferenceError) -> ApiError {
    match err {
        ConferenceError::NotFound => ApiError::not_found("Conference not found"),
        ConferenceError::NameRequired => {
            ApiError::bad_request("Conference `name` field required", None)
        }
        ConferenceError::Filter(err) => {
            ApiError::bad_request("Invalid query filter", Some(err.to_string()))
        }
        ConferenceError::Repo(err) => repo_to_api(err),
    }
}

fn session_to_api(err: SessionError) -> ApiError {
    match err {
        SessionError::ConferenceNotFound => ApiError::not_found("Conference not found"),
        SessionError::NameRequired => ApiError::bad_request("Session `name` field required", None),
        SessionError::NotOrganizer => {
            ApiError::forbidden("Only the conference organizer can add sessions")
        }
        SessionError::Repo(err) => repo_to_api(err),
    }
}

fn speaker_to_api(err: SpeakerError) -> ApiError {
    match err {
        SpeakerError::NotFound => ApiError::not_found("Speaker not found"),
        SpeakerError::Repo(err) => repo_to_api(err),
    }
}

fn registration_to_api(err: RegistrationError) -> ApiError {
    match err {
        RegistrationError::ConferenceNotFound => ApiError::not_found("Conference not found"),
        RegistrationError::SessionNotFound => ApiError::not_found("Session not found"),
        RegistrationError::AlreadyRegistered => {
            ApiError::conflict("Already registered for this conference", None)
        }
        RegistrationError::NoSeatsAvailable => ApiError::conflict("No seats available", None),
        RegistrationError::AlreadyWishlisted => {
            ApiError::conflict("Session is already in the wishlist", None)
        }
        RegistrationError::NotWishlisted => {
            ApiError::conflict("Session is not in the wishlist", None)
        }
        RegistrationError::Repo(err) => repo_to_api(err),
    }
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<time::Date>, ApiError> {
    raw.map(parse_date)
        .transpose()
        .map_err(|hint| ApiError::bad_request("Invalid date", Some(hint)))
}

fn parse_optional_time(raw: Option<&str>) -> Result<Option<time::Time>, ApiError> {
    raw.map(parse_time)
        .transpose()
        .map_err(|hint| ApiError::bad_request("Invalid time", Some(hint)))
}

// -------- Profile --------

pub async fn get_profile(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profiles
        .get_or_create(&user)
        .await
        .map_err(profile_to_api)?;
    Ok(Json(profile.into()))
}

pub async fn save_profile(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<ProfileSaveRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profiles
        .save(
            &user,
            SaveProfileCommand {
                display_name: request.display_name,
                tee_shirt_size: request.tee_shirt_size,
            },
        )
        .await
        .map_err(profile_to_api)?;
    Ok(Json(profile.into()))
}

// -------- Conferences --------

pub async fn create_conference(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<ConferenceCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let start_date = parse_optional_date(request.start_date.as_deref())?;
    let end_date = parse_optional_date(request.end_date.as_deref())?;

    let conference = state
        .conferences
        .create(
            &user,
            CreateConferenceCommand {
                name: request.name,
                description: request.description,
                topics: request.topics,
                city: request.city,
                start_date,
                end_date,
                max_attendees: request.max_attendees,
            },
        )
        .await
        .map_err(conference_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(ConferenceResponse::from(conference)),
    ))
}

pub async fn get_conference(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConferenceResponse>, ApiError> {
    let conference = state.conferences.get(id).await.map_err(conference_to_api)?;
    Ok(Json(conference.into()))
}

pub async fn list_created_conferences(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ConferenceResponse>>, ApiError> {
    let conferences = state
        .conferences
        .list_created(&user)
        .await
        .map_err(conference_to_api)?;
    Ok(Json(conferences.into_iter().map(Into::into).collect()))
}

pub async fn list_attending_conferences(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ConferenceResponse>>, ApiError> {
    let conferences = state
        .conferences
        .list_attending(&user)
        .await
        .map_err(conference_to_api)?;
    Ok(Json(conferences.into_iter().map(Into::into).collect()))
}

pub async fn query_conferences(
    State(state): State<ApiState>,
    Json(request): Json<ConferenceQueryRequest>,
) -> Result<Json<Vec<ConferenceResponse>>, ApiError> {
    let filters: Vec<RawFilter> = request.filters.into_iter().map(Into::into).collect();
    let conferences = state
        .conferences
        .query(&filters)
        .await
        .map_err(conference_to_api)?;
    Ok(Json(conferences.into_iter().map(Into::into).collect()))
}

// -------- Registration --------

pub async fn register(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(conference_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .registrations
        .register(&user, conference_id)
        .await
        .map_err(registration_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unregister(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<UnregisterResponse>, ApiError> {
    let removed = state
        .registrations
        .unregister(&user, conference_id)
        .await
        .map_err(registration_to_api)?;
    Ok(Json(UnregisterResponse { removed }))
}

// -------- Sessions --------

pub async fn create_session(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(conference_id): Path<Uuid>,
    Json(request): Json<SessionCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_optional_date(request.date.as_deref())?;
    let start_time = parse_optional_time(request.start_time.as_deref())?;

    let session = state
        .sessions
        .create(
            &user,
            CreateSessionCommand {
                conference_id,
                name: request.name,
                highlights: request.highlights,
                speaker: request.speaker,
                duration_minutes: request.duration_minutes,
                session_type: request.session_type,
                date,
                start_time,
            },
        )
        .await
        .map_err(session_to_api)?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

pub async fn list_sessions(
    State(state): State<ApiState>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state
        .sessions
        .list_for_conference(conference_id)
        .await
        .map_err(session_to_api)?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn list_sessions_by_type(
    State(state): State<ApiState>,
    Path((conference_id, session_type)): Path<(Uuid, String)>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state
        .sessions
        .list_by_type(conference_id, &session_type)
        .await
        .map_err(session_to_api)?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn list_sessions_by_date(
    State(state): State<ApiState>,
    Path(conference_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let start = parse_date(&range.start)
        .map_err(|hint| ApiError::bad_request("Invalid date", Some(hint)))?;
    let end =
        parse_date(&range.end).map_err(|hint| ApiError::bad_request("Invalid date", Some(hint)))?;

    let sessions = state
        .sessions
        .list_by_date_range(conference_id, start, end)
        .await
        .map_err(session_to_api)?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn list_sessions_by_speaker(
    State(state): State<ApiState>,
    Path(speaker_id): Path<Uuid>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state
        .speakers
        .sessions_by_speaker(speaker_id)
        .await
        .map_err(speaker_to_api)?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

pub async fn list_conference_speakers(
    State(state): State<ApiState>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<Vec<SpeakerResponse>>, ApiError> {
    let speakers = state
        .sessions
        .list_conference_speakers(conference_id)
        .await
        .map_err(session_to_api)?;
    Ok(Json(speakers.into_iter().map(Into::into).collect()))
}

// -------- Wishlist --------

pub async fn wishlist_add(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .registrations
        .wishlist_add(&user, session_id)
        .await
        .map_err(registration_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn wishlist_remove(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .registrations
        .wishlist_remove(&user, session_id)
        .await
        .map_err(registration_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_wishlist(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(conference_id): Path<Uuid>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state
        .sessions
        .list_wishlisted(&user, conference_id)
        .await
        .map_err(session_to_api)?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

// -------- Speakers and summaries --------

pub async fn list_speakers(
    State(state): State<ApiState>,
) -> Result<Json<Vec<SpeakerResponse>>, ApiError> {
    let speakers = state.speakers.list().await.map_err(speaker_to_api)?;
    Ok(Json(speakers.into_iter().map(Into::into).collect()))
}

pub async fn get_announcement(State(state): State<ApiState>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.announcements.announcement(),
    })
}

pub async fn get_featured_speaker(State(state): State<ApiState>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.announcements.featured_speaker(),
    })
}
