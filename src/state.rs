use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::auth::AuthService;
use crate::config::Config;
use crate::join::AvatarValidator;
use crate::meeting::MeetingApi;
use crate::redis::{RecordingRepository, RoomRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub room_repo: Arc<RoomRepository>,
    pub recording_repo: Arc<RecordingRepository>,
    pub meeting: Arc<dyn MeetingApi>,
    pub avatar_validator: Arc<dyn AvatarValidator>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: Config,
        auth: AuthService,
        room_repo: RoomRepository,
        recording_repo: RecordingRepository,
        meeting: Arc<dyn MeetingApi>,
        avatar_validator: Arc<dyn AvatarValidator>,
    ) -> Self {
        let cookie_key = Key::derive_from(config.secret_key_base.as_bytes());

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            room_repo: Arc::new(room_repo),
            recording_repo: Arc::new(recording_repo),
            meeting,
            avatar_validator,
            cookie_key,
        }
    }
}

/// Lets `SignedCookieJar` pull its signing key straight from the state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
