use std::sync::Arc;

use crate::application::announcements::AnnouncementService;
use crate::application::conferences::ConferenceService;
use crate::application::profile::ProfileService;
use crate::application::registration::RegistrationService;
use crate::application::sessions::SessionService;
use crate::application::speakers::SpeakerService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub profiles: Arc<ProfileService>,
    pub conferences: Arc<ConferenceService>,
    pub sessions: Arc<SessionService>,
    pub speakers: Arc<SpeakerService>,
    pub registrations: Arc<RegistrationService>,
    pub announcements: Arc<AnnouncementService>,
    pub db: Arc<PostgresRepositories>,
}
