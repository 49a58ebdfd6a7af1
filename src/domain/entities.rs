//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::types::TeeShirtSize;

/// One per authenticated user, keyed by the identity provider's stable
/// subject string. Created lazily on first access, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRecord {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConferenceRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    /// Calendar month of `start_date`; 0 when no start date is set.
    pub month: i16,
    pub max_attendees: i32,
    pub seats_available: i32,
    pub organizer_id: String,
    pub created_at: OffsetDateTime,
}

/// Immutable once created; only the conference organizer may create one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_id: Option<Uuid>,
    pub speaker_name: Option<String>,
    pub duration_minutes: Option<i32>,
    pub session_type: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<Time>,
    pub created_at: OffsetDateTime,
}

/// Deduplicated by name; referenced by sessions, owned by no conference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}
