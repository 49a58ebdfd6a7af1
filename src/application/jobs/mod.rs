mod announcement;
mod confirmation;
mod context;
mod featured;
mod queue;

pub use announcement::{
    RefreshAnnouncementContext, RefreshAnnouncementJob, process_refresh_announcement_job,
    refresh_announcement_schedule,
};
pub use confirmation::{
    ConfirmationEmailJobPayload, enqueue_confirmation_email_job, process_confirmation_email_job,
};
pub use context::{JobWorkerContext, job_failed};
pub use featured::{
    FeaturedSpeakerJobPayload, enqueue_featured_speaker_job, process_featured_speaker_job,
};
pub use queue::enqueue_job;
