use crate::config::{Config, SettingDefaults};
use crate::models::{CurrentUser, Room, RoomSettings};
use crate::security;

/// Outcome of evaluating a join request against a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The requester may enter now, possibly with meeting controls.
    Granted { moderator: bool },
    /// The meeting has not started and the requester cannot start it;
    /// the caller renders the waiting state instead.
    Deferred,
}

/// Inputs for one access evaluation. All pure reads; the evaluator has
/// no side effects.
pub struct AccessRequest<'a> {
    pub room: &'a Room,
    pub settings: &'a RoomSettings,
    pub current_user: Option<&'a CurrentUser>,
    /// Access code carried in the requester's session, if any.
    pub supplied_access_code: Option<&'a str>,
    pub room_running: bool,
    /// Whether the requester arrived through the room's shared invite path.
    pub shared_room: bool,
}

/// Room ownership or a matching access code confers moderator rights.
/// An empty or absent stored code never matches.
pub fn moderator_privileges(
    room: &Room,
    current_user: Option<&CurrentUser>,
    supplied_access_code: Option<&str>,
) -> bool {
    if room.owned_by(current_user) {
        return true;
    }

    match (room.access_code.as_deref(), supplied_access_code) {
        (Some(stored), Some(supplied)) if !stored.is_empty() => security::ct_eq(stored, supplied),
        _ => false,
    }
}

/// Decide whether the requester may enter now, and with which role.
///
/// Entry is allowed when the meeting is already running, when the room
/// lets anyone start it, or when the requester holds moderator rights.
pub fn evaluate(request: &AccessRequest, defaults: &SettingDefaults) -> AccessDecision {
    let privileged = moderator_privileges(
        request.room,
        request.current_user,
        request.supplied_access_code,
    );

    let allowed = request.room_running
        || request.settings.anyone_can_start(defaults)
        || privileged;

    if !allowed {
        return AccessDecision::Deferred;
    }

    let moderator =
        request.settings.join_moderator(defaults) || request.shared_room || privileged;

    AccessDecision::Granted { moderator }
}

/// On load-balanced deployments every tenant gets its own domain; a room
/// owned under another provider is invisible to this requester.
pub fn incorrect_user_domain(config: &Config, room: &Room, user_domain: &str) -> bool {
    config.loadbalanced && room.owner_provider != user_domain
}
