//! Wire models for the conference API. Dates travel as `YYYY-MM-DD`
//! strings and times as `HH:MM`, matching the clients this service
//! replaces.

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time};
use uuid::Uuid;

use crate::application::conferences::ConferenceWithOrganizer;
use crate::application::query::RawFilter;
use crate::domain::entities::{ConferenceRecord, ProfileRecord, SessionRecord, SpeakerRecord};
use crate::domain::types::TeeShirtSize;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");

pub fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("expected date in YYYY-MM-DD form, got `{raw}`"))
}

pub fn parse_time(raw: &str) -> Result<Time, String> {
    Time::parse(raw.trim(), TIME_FORMAT)
        .map_err(|_| format!("expected time in HH:MM form, got `{raw}`"))
}

fn format_date(date: Date) -> Option<String> {
    date.format(DATE_FORMAT).ok()
}

fn format_time(time: Time) -> Option<String> {
    time.format(TIME_FORMAT).ok()
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSaveRequest {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub tee_shirt_size: TeeShirtSize,
}

impl From<ProfileRecord> for ProfileResponse {
    fn from(record: ProfileRecord) -> Self {
        Self {
            user_id: record.user_id,
            display_name: record.display_name,
            email: record.email,
            tee_shirt_size: record.tee_shirt_size,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceCreateRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_attendees: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: i16,
    pub max_attendees: i32,
    pub seats_available: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_display_name: Option<String>,
}

impl ConferenceResponse {
    fn build(record: ConferenceRecord, organizer_display_name: Option<String>) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            topics: record.topics,
            city: record.city,
            start_date: record.start_date.and_then(format_date),
            end_date: record.end_date.and_then(format_date),
            month: record.month,
            max_attendees: record.max_attendees,
            seats_available: record.seats_available,
            organizer_display_name,
        }
    }
}

impl From<ConferenceRecord> for ConferenceResponse {
    fn from(record: ConferenceRecord) -> Self {
        Self::build(record, None)
    }
}

impl From<ConferenceWithOrganizer> for ConferenceResponse {
    fn from(value: ConferenceWithOrganizer) -> Self {
        Self::build(value.conference, value.organizer_display_name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FilterRequest {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl From<FilterRequest> for RawFilter {
    fn from(request: FilterRequest) -> Self {
        Self {
            field: request.field,
            operator: request.operator,
            value: request.value,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConferenceQueryRequest {
    #[serde(default)]
    pub filters: Vec<FilterRequest>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreateRequest {
    #[serde(default)]
    pub name: String,
    pub highlights: Option<String>,
    pub speaker: Option<String>,
    pub duration_minutes: Option<i32>,
    pub session_type: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker_id: Option<Uuid>,
    pub speaker: Option<String>,
    pub duration_minutes: Option<i32>,
    pub session_type: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
}

impl From<SessionRecord> for SessionResponse {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            conference_id: record.conference_id,
            name: record.name,
            highlights: record.highlights,
            speaker_id: record.speaker_id,
            speaker: record.speaker_name,
            duration_minutes: record.duration_minutes,
            session_type: record.session_type,
            date: record.date.and_then(format_date),
            start_time: record.start_time.and_then(format_time),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpeakerResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<SpeakerRecord> for SpeakerResponse {
    fn from(record: SpeakerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UnregisterResponse {
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_and_render_round_trip() {
        let date = parse_date("2026-06-18").unwrap();
        assert_eq!(format_date(date).as_deref(), Some("2026-06-18"));
        assert!(parse_date("18/06/2026").is_err());
    }

    #[test]
    fn times_drop_seconds() {
        let time = parse_time("09:30").unwrap();
        assert_eq!(format_time(time).as_deref(), Some("09:30"));
        assert!(parse_time("9.30").is_err());
    }
}
