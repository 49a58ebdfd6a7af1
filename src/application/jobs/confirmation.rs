use apalis::prelude::{Data, Error as ApalisError};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::repos::{JobsRepo, RepoError},
    domain::entities::ConferenceRecord,
    domain::types::JobType,
};

use super::{context::JobWorkerContext, queue::enqueue_job};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationEmailJobPayload {
    pub recipient: String,
    pub conference_id: Uuid,
    pub conference_name: String,
    pub city: String,
    pub start_date: Option<Date>,
}

pub async fn enqueue_confirmation_email_job<J: JobsRepo + ?Sized>(
    repo: &J,
    recipient: &str,
    conference: &ConferenceRecord,
) -> Result<String, RepoError> {
    let payload = ConfirmationEmailJobPayload {
        recipient: recipient.to_string(),
        conference_id: conference.id,
        conference_name: conference.name.clone(),
        city: conference.city.clone(),
        start_date: conference.start_date,
    };
    enqueue_job(repo, JobType::SendConfirmationEmail, &payload, None, 10, 10).await
}

/// Deliver the creation-confirmation email. Delivery goes through the
/// structured log for now; the payload carries everything an SMTP
/// sender would need.
pub async fn process_confirmation_email_job(
    payload: ConfirmationEmailJobPayload,
    _context: Data<JobWorkerContext>,
) -> Result<(), ApalisError> {
    let body = format!(
        "Hi, you have created the following conference!\n{} in {}",
        payload.conference_name, payload.city
    );

    info!(
        target = "application::jobs::process_confirmation_email_job",
        recipient = payload.recipient,
        conference_id = %payload.conference_id,
        body,
        "confirmation email sent"
    );

    Ok(())
}
