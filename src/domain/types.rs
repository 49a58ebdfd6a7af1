//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Shirt-size preference stored on a profile (mirrors Postgres enum
/// `tee_shirt_size`). `_m`/`_w` suffixes distinguish the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tee_shirt_size", rename_all = "snake_case")]
pub enum TeeShirtSize {
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

impl Default for TeeShirtSize {
    fn default() -> Self {
        Self::NotSpecified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    SendConfirmationEmail,
    UpdateFeaturedSpeaker,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::SendConfirmationEmail => "send_confirmation_email",
            JobType::UpdateFeaturedSpeaker => "update_featured_speaker",
        }
    }
}
