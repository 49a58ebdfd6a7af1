//! Cron job that keeps the nearly-sold-out announcement current.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;

use crate::application::announcements::AnnouncementService;

/// Marker struct for the cron-triggered announcement refresh.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct RefreshAnnouncementJob;

impl From<chrono::DateTime<chrono::Utc>> for RefreshAnnouncementJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

/// Context for the announcement refresh worker.
#[derive(Clone)]
pub struct RefreshAnnouncementContext {
    pub announcements: Arc<AnnouncementService>,
}

pub async fn process_refresh_announcement_job(
    _job: RefreshAnnouncementJob,
    ctx: Data<RefreshAnnouncementContext>,
) -> Result<(), apalis::prelude::Error> {
    if let Err(err) = ctx.announcements.refresh_announcement().await {
        tracing::warn!(error = %err, "failed to refresh announcement");
    }
    Ok(())
}

/// Refresh every five minutes, on the minute.
pub fn refresh_announcement_schedule() -> Schedule {
    Schedule::from_str("0 */5 * * * *").expect("invalid cron expression for announcement refresh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_parses_correctly() {
        let schedule = refresh_announcement_schedule();
        let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(3).collect();
        assert_eq!(upcoming.len(), 3);
    }
}
