use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SettingDefaults;
use crate::error::{AppError, Result};
use crate::models::CurrentUser;

/// Room metadata stored in Redis. Loaded read-only per request; the join
/// flow never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Friendly identifier used in URLs, e.g. "abc-def-ghi".
    pub uid: String,
    pub name: String,
    /// Identifier the meeting API knows the room by.
    pub meeting_id: String,
    pub owner_uid: String,
    /// Tenant the owner signed up under; only meaningful on
    /// load-balanced deployments.
    pub owner_provider: String,
    pub access_code: Option<String>,
    /// JSON-encoded feature flags, kept as the raw blob the frontend wrote.
    pub room_settings: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn owned_by(&self, user: Option<&CurrentUser>) -> bool {
        user.is_some_and(|u| u.uid == self.owner_uid)
    }

    /// Parse the settings blob. Malformed JSON is a request-fatal error;
    /// proceeding with partial configuration would silently drop flags
    /// like `requireModeratorApproval`.
    pub fn settings(&self) -> Result<RoomSettings> {
        serde_json::from_str(&self.room_settings)
            .map_err(|e| AppError::InvalidRoomSettings(e.to_string()))
    }
}

/// Feature flags from the room's settings blob. Each flag is tri-state:
/// unset falls back to the config-level default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettings {
    pub mute_on_start: Option<bool>,
    pub require_moderator_approval: Option<bool>,
    pub anyone_can_start: Option<bool>,
    pub join_moderator: Option<bool>,
    pub recording: Option<bool>,
}

impl RoomSettings {
    pub fn mute_on_start(&self, defaults: &SettingDefaults) -> bool {
        self.mute_on_start.unwrap_or(defaults.mute_on_start)
    }

    pub fn require_moderator_approval(&self, defaults: &SettingDefaults) -> bool {
        self.require_moderator_approval
            .unwrap_or(defaults.require_moderator_approval)
    }

    pub fn anyone_can_start(&self, defaults: &SettingDefaults) -> bool {
        self.anyone_can_start.unwrap_or(defaults.anyone_can_start)
    }

    pub fn join_moderator(&self, defaults: &SettingDefaults) -> bool {
        self.join_moderator.unwrap_or(defaults.join_moderator)
    }

    pub fn recording(&self, defaults: &SettingDefaults) -> bool {
        self.recording.unwrap_or(defaults.recording)
    }
}
