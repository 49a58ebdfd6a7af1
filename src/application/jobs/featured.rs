use apalis::prelude::{Data, Error as ApalisError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    application::repos::{JobsRepo, RepoError},
    domain::types::JobType,
};

use super::{
    context::{JobWorkerContext, job_failed},
    queue::enqueue_job,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedSpeakerJobPayload {
    pub conference_id: Uuid,
    pub speaker_id: Uuid,
}

pub async fn enqueue_featured_speaker_job<J: JobsRepo + ?Sized>(
    repo: &J,
    conference_id: Uuid,
    speaker_id: Uuid,
) -> Result<String, RepoError> {
    let payload = FeaturedSpeakerJobPayload {
        conference_id,
        speaker_id,
    };
    enqueue_job(repo, JobType::UpdateFeaturedSpeaker, &payload, None, 10, 10).await
}

pub async fn process_featured_speaker_job(
    payload: FeaturedSpeakerJobPayload,
    context: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    let ctx = &*context;

    let updated = ctx
        .announcements
        .refresh_featured_speaker(payload.conference_id, payload.speaker_id)
        .await
        .map_err(job_failed)?;

    if updated.is_some() {
        info!(
            target = "application::jobs::process_featured_speaker_job",
            conference_id = %payload.conference_id,
            speaker_id = %payload.speaker_id,
            "featured speaker updated"
        );
    }

    Ok(())
}
