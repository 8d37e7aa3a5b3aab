//! The room-join decision core: access evaluation, avatar resolution,
//! guest identity, and the meeting options handed to the join call.

pub mod access;
pub mod avatar;
pub mod guest;
pub mod options;
pub mod recent;

use serde::Deserialize;

pub use access::{evaluate, AccessDecision, AccessRequest};
pub use avatar::{AvatarValidator, HttpAvatarValidator};
pub use guest::GuestId;
pub use options::JoinOptions;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::meeting::MeetingApi;
use crate::models::{CurrentUser, Room};

/// Scheme and host the request arrived on, used to build absolute URLs
/// that point back at this deployment.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn url_base(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Client-supplied join form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinParams {
    /// Display name for guests; ignored for authenticated users.
    #[serde(default)]
    pub join_name: Option<String>,
    /// Avatar selection tag, e.g. "template_avatar_3".
    #[serde(default)]
    pub join_avatar: Option<String>,
    /// Room access code typed into the join form. Takes precedence over
    /// a code already held in the session cookie.
    #[serde(default)]
    pub access_code: Option<String>,
    /// Set when the requester arrived through the shared invite path.
    #[serde(default)]
    pub shared: bool,
    /// Relative URL previously returned by the upload endpoint.
    #[serde(default)]
    pub uploaded_avatar_url: Option<String>,
}

/// Everything the decision core needs for one join request.
pub struct JoinContext<'a> {
    pub room: &'a Room,
    pub current_user: Option<&'a CurrentUser>,
    pub params: &'a JoinParams,
    /// Access code held in the requester's session cookie, if any.
    pub moderator_access_code: Option<&'a str>,
    /// Existing guest-id cookie value, if any.
    pub guest_cookie: Option<&'a str>,
    pub origin: RequestOrigin,
}

/// What the caller should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Send the requester to the meeting. `guest` carries a freshly
    /// minted id the caller must persist in the guest cookie.
    Redirect {
        join_url: String,
        guest: Option<GuestId>,
    },
    /// Meeting not started and the requester cannot start it; render
    /// the waiting state with the room's public recordings.
    Wait,
}

/// Run the join decision process for one request.
pub async fn perform_join(
    ctx: JoinContext<'_>,
    config: &Config,
    meeting: &dyn MeetingApi,
    validator: &dyn AvatarValidator,
) -> Result<JoinOutcome> {
    let settings = ctx.room.settings()?;
    let running = meeting.is_meeting_running(&ctx.room.meeting_id).await?;

    let decision = access::evaluate(
        &AccessRequest {
            room: ctx.room,
            settings: &settings,
            current_user: ctx.current_user,
            supplied_access_code: ctx.moderator_access_code,
            room_running: running,
            shared_room: ctx.params.shared,
        },
        &config.setting_defaults,
    );

    let AccessDecision::Granted { moderator } = decision else {
        tracing::debug!(room = %ctx.room.uid, "Join deferred, meeting not started");
        return Ok(JoinOutcome::Wait);
    };

    let mut opts = options::default_meeting_options(ctx.room, &ctx.origin, config);
    opts.user_is_moderator = moderator;
    opts.record = settings.recording(&config.setting_defaults);
    opts.require_moderator_approval = settings.require_moderator_approval(&config.setting_defaults);
    opts.mute_on_start = settings.mute_on_start(&config.setting_defaults);

    let uploaded = ctx.params.uploaded_avatar_url.as_deref();

    if let Some(user) = ctx.current_user {
        opts.avatar_url = avatar::resolve(
            Some("none_or_loggedin_user_avatar"),
            Some(user),
            uploaded,
            &ctx.origin,
            config.production,
            validator,
        )
        .await;

        let join_url = meeting.join_url(ctx.room, &user.name, &opts, &user.uid)?;
        tracing::info!(room = %ctx.room.uid, user = %user.uid, moderator, "User joining meeting");

        Ok(JoinOutcome::Redirect {
            join_url,
            guest: None,
        })
    } else {
        let name = ctx
            .params
            .join_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("Join name is required".to_string()))?;

        opts.avatar_url = avatar::resolve(
            ctx.params.join_avatar.as_deref(),
            None,
            uploaded,
            &ctx.origin,
            config.production,
            validator,
        )
        .await;

        let guest = guest::issue_or_reuse(ctx.guest_cookie);
        let join_url = meeting.join_url(ctx.room, name, &opts, &guest.value)?;
        tracing::info!(room = %ctx.room.uid, guest = %guest.value, moderator, "Guest joining meeting");

        Ok(JoinOutcome::Redirect {
            join_url,
            guest: Some(guest),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    struct FakeMeeting {
        running: bool,
    }

    #[async_trait]
    impl MeetingApi for FakeMeeting {
        async fn is_meeting_running(&self, _meeting_id: &str) -> Result<bool> {
            Ok(self.running)
        }

        fn join_url(
            &self,
            room: &Room,
            name: &str,
            options: &JoinOptions,
            uid: &str,
        ) -> Result<String> {
            Ok(format!(
                "join://{}?name={}&uid={}&moderator={}&avatar={}",
                room.meeting_id,
                name,
                uid,
                options.user_is_moderator,
                options.avatar_url.as_deref().unwrap_or("-"),
            ))
        }
    }

    struct StaticValidator(bool);

    #[async_trait]
    impl AvatarValidator for StaticValidator {
        async fn valid_avatar(&self, _url: &str) -> bool {
            self.0
        }
    }

    fn room(settings: &str, access_code: Option<&str>) -> Room {
        Room {
            uid: "abc-def-ghi".to_string(),
            name: "Home Room".to_string(),
            meeting_id: "meeting-1".to_string(),
            owner_uid: "owner-1".to_string(),
            owner_provider: "greenlight".to_string(),
            access_code: access_code.map(str::to_string),
            room_settings: settings.to_string(),
            created_at: Utc::now(),
        }
    }

    fn origin() -> RequestOrigin {
        RequestOrigin {
            scheme: "https".to_string(),
            host: "meet.example.com".to_string(),
        }
    }

    fn guest_params(name: &str) -> JoinParams {
        JoinParams {
            join_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_not_running_without_rights_waits_and_issues_no_guest_id() {
        let room = room("{}", None);
        let params = guest_params("Carol");
        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };

        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: false },
            &StaticValidator(true),
        )
        .await
        .expect("Should evaluate");

        assert_eq!(outcome, JoinOutcome::Wait);
    }

    #[tokio::test]
    async fn test_owner_joins_as_moderator_with_validated_image() {
        let room = room("{}", None);
        let user = CurrentUser {
            uid: "owner-1".to_string(),
            name: "Alice".to_string(),
            provider: "greenlight".to_string(),
            image: Some("https://cdn.example.com/alice.png".to_string()),
        };
        let params = JoinParams::default();
        let ctx = JoinContext {
            room: &room,
            current_user: Some(&user),
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };

        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: false },
            &StaticValidator(true),
        )
        .await
        .expect("Should evaluate");

        let JoinOutcome::Redirect { join_url, guest } = outcome else {
            panic!("Owner should be redirected");
        };
        assert_eq!(guest, None);
        assert!(join_url.contains("name=Alice"));
        assert!(join_url.contains("uid=owner-1"));
        assert!(join_url.contains("moderator=true"));
        assert!(join_url.contains("avatar=https://cdn.example.com/alice.png"));
    }

    #[tokio::test]
    async fn test_owner_avatar_dropped_when_validation_fails() {
        let room = room("{}", None);
        let user = CurrentUser {
            uid: "owner-1".to_string(),
            name: "Alice".to_string(),
            provider: "greenlight".to_string(),
            image: Some("https://cdn.example.com/alice.png".to_string()),
        };
        let params = JoinParams::default();
        let ctx = JoinContext {
            room: &room,
            current_user: Some(&user),
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };

        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: false },
            &StaticValidator(false),
        )
        .await
        .expect("Should evaluate");

        let JoinOutcome::Redirect { join_url, .. } = outcome else {
            panic!("Owner should be redirected");
        };
        assert!(join_url.contains("avatar=-"));
    }

    #[tokio::test]
    async fn test_guest_join_mints_identity_and_reuses_cookie() {
        let room = room("{}", None);
        let params = guest_params("Carol");

        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };
        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: true },
            &StaticValidator(true),
        )
        .await
        .expect("Should evaluate");

        let JoinOutcome::Redirect { guest, .. } = outcome else {
            panic!("Guest should be redirected into a running meeting");
        };
        let minted = guest.expect("A guest id should be issued");
        assert!(minted.fresh);

        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: None,
            guest_cookie: Some(&minted.value),
            origin: origin(),
        };
        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: true },
            &StaticValidator(true),
        )
        .await
        .expect("Should evaluate");

        let JoinOutcome::Redirect { guest, .. } = outcome else {
            panic!("Guest should be redirected into a running meeting");
        };
        let reused = guest.expect("The cookie value should be echoed back");
        assert_eq!(reused.value, minted.value);
        assert!(!reused.fresh);
    }

    #[tokio::test]
    async fn test_guest_without_name_is_rejected() {
        let room = room("{}", None);
        let params = guest_params("   ");
        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };

        let err = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: true },
            &StaticValidator(true),
        )
        .await
        .expect_err("A guest needs a display name");

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_malformed_room_settings_fail_the_request() {
        let room = room("{broken", None);
        let params = guest_params("Carol");
        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: None,
            guest_cookie: None,
            origin: origin(),
        };

        let err = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: true },
            &StaticValidator(true),
        )
        .await
        .expect_err("Malformed settings must not be silently ignored");

        assert!(matches!(err, AppError::InvalidRoomSettings(_)));
    }

    #[tokio::test]
    async fn test_access_code_join_carries_moderator_flag() {
        let room = room("{}", Some("314159"));
        let params = guest_params("Carol");
        let ctx = JoinContext {
            room: &room,
            current_user: None,
            params: &params,
            moderator_access_code: Some("314159"),
            guest_cookie: None,
            origin: origin(),
        };

        let outcome = perform_join(
            ctx,
            &Config::test_defaults(),
            &FakeMeeting { running: false },
            &StaticValidator(true),
        )
        .await
        .expect("Should evaluate");

        let JoinOutcome::Redirect { join_url, .. } = outcome else {
            panic!("A valid access code should admit the guest");
        };
        assert!(join_url.contains("moderator=true"));
    }
}
