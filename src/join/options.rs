use serde::Serialize;

use crate::config::Config;
use crate::join::RequestOrigin;
use crate::models::Room;

/// Invitation line shown to the meeting's moderator.
pub const INVITE_MESSAGE: &str = "To invite someone to the meeting, send them this link:";
pub const ACCESS_CODE_LABEL: &str = "Access Code";

/// Options handed to the meeting API's join call. Built fresh per
/// request from the defaults below, then overridden by the access
/// evaluator's outputs.
#[derive(Debug, Clone, Serialize)]
pub struct JoinOptions {
    pub user_is_moderator: bool,
    pub meeting_logout_url: String,
    pub moderator_message: String,
    pub host: String,
    pub recording_default_visibility: bool,
    pub record: bool,
    pub require_moderator_approval: bool,
    pub mute_on_start: bool,
    #[serde(rename = "avatarURL", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Default, unconfigured meeting options.
pub fn default_meeting_options(room: &Room, origin: &RequestOrigin, config: &Config) -> JoinOptions {
    let base = origin.url_base();

    let mut moderator_message = format!("{}<br> {}/{}", INVITE_MESSAGE, base, room.uid);
    if let Some(code) = room.access_code.as_deref().filter(|c| !c.is_empty()) {
        moderator_message.push_str(&format!("<br> {}: {}", ACCESS_CODE_LABEL, code));
    }

    JoinOptions {
        user_is_moderator: false,
        meeting_logout_url: format!("{}/{}/logout", base, room.uid),
        moderator_message,
        host: origin.host.clone(),
        recording_default_visibility: config.default_recording_visibility == "public",
        record: false,
        require_moderator_approval: false,
        mute_on_start: false,
        avatar_url: None,
    }
}
