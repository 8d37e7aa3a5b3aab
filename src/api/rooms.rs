use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::auth::MaybeUser;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::join::{
    self, access, guest::GUEST_ID_TTL_DAYS, recent, recent::RECENT_ROOMS_TTL_DAYS, JoinContext,
    JoinOutcome, JoinParams, RequestOrigin,
};
use crate::models::{paginate, search_recordings, Paginated, Recording, RecordingFilter, Room};
use crate::state::AppState;

const GUEST_ID_COOKIE: &str = "guest_id";
const NAME_COOKIE: &str = "greenroom_name";
const MODERATOR_CODE_COOKIE: &str = "moderator_access_code";
const NAME_COOKIE_TTL_DAYS: i64 = 30;

/// Tenant assumed for single-tenant deployments.
const DEFAULT_PROVIDER: &str = "greenroom";

/// Room routes
pub fn room_routes() -> Router<AppState> {
    Router::new().route("/{room_uid}/join", get(show_join).post(join_room))
}

fn recent_rooms_cookie(user_uid: &str) -> String {
    format!("{}_recently_joined_rooms", user_uid)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_per_page")]
    per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    25
}

impl PageQuery {
    fn per_page(&self) -> usize {
        self.per_page.clamp(1, 100)
    }
}

#[derive(Debug, Serialize)]
struct RoomSummary {
    uid: String,
    name: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            uid: room.uid.clone(),
            name: room.name.clone(),
        }
    }
}

/// Public-recordings listing with the filter echoed back.
#[derive(Debug, Serialize)]
struct RecordingsListing {
    #[serde(flatten)]
    filter: RecordingFilter,
    recordings: Paginated<Recording>,
}

/// Payload for the join page.
#[derive(Debug, Serialize)]
struct JoinPage {
    name: String,
    room: RoomSummary,
    #[serde(flatten)]
    listing: RecordingsListing,
}

/// What the frontend should do after a join attempt.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum JoinAction {
    Redirect {
        join_url: String,
    },
    Wait {
        #[serde(flatten)]
        listing: RecordingsListing,
    },
}

/// GET /api/v1/rooms/{room_uid}/join - Join page payload
async fn show_join(
    State(state): State<AppState>,
    Path(room_uid): Path<String>,
    Query(filter): Query<RecordingFilter>,
    Query(page): Query<PageQuery>,
    origin: RequestOrigin,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
) -> Result<Json<JoinPage>> {
    let (room, _) = load_room(&state, &room_uid).await?;
    ensure_known_domain(&state.config, &room, &origin)?;

    // Pre-fill the name from the session, then the name cookie.
    let name = user
        .as_ref()
        .map(|u| u.name.clone())
        .or_else(|| jar.get(NAME_COOKIE).map(|c| c.value().to_string()))
        .unwrap_or_default();

    let listing = public_recordings(&state, &room, filter, &page).await?;

    Ok(Json(JoinPage {
        name,
        room: RoomSummary::from(&room),
        listing,
    }))
}

/// POST /api/v1/rooms/{room_uid}/join - Run the join decision process
async fn join_room(
    State(state): State<AppState>,
    Path(room_uid): Path<String>,
    Query(filter): Query<RecordingFilter>,
    Query(page): Query<PageQuery>,
    origin: RequestOrigin,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
    Json(mut params): Json<JoinParams>,
) -> Result<(SignedCookieJar, Json<JoinAction>)> {
    let (room, via_shared) = load_room(&state, &room_uid).await?;
    ensure_known_domain(&state.config, &room, &origin)?;

    params.shared = params.shared || via_shared;

    let moderator_code = moderator_code_from(&params, &jar);
    let guest_cookie = jar.get(GUEST_ID_COOKIE).map(|c| c.value().to_string());

    // A code typed into the form is kept for the rest of the session,
    // like server-side session state would be.
    let mut jar = jar;
    if let Some(code) = params
        .access_code
        .as_deref()
        .filter(|c| !c.is_empty())
    {
        jar = jar.add(
            Cookie::build((MODERATOR_CODE_COOKIE, code.to_string()))
                .path("/")
                .same_site(SameSite::Lax)
                .build(),
        );
    }

    let outcome = join::perform_join(
        JoinContext {
            room: &room,
            current_user: user.as_ref(),
            params: &params,
            moderator_access_code: moderator_code.as_deref(),
            guest_cookie: guest_cookie.as_deref(),
            origin,
        },
        &state.config,
        state.meeting.as_ref(),
        state.avatar_validator.as_ref(),
    )
    .await?;

    match outcome {
        JoinOutcome::Redirect { join_url, guest } => {
            if let Some(minted) = guest.filter(|g| g.fresh) {
                jar = jar.add(
                    Cookie::build((GUEST_ID_COOKIE, minted.value))
                        .path("/")
                        .same_site(SameSite::Lax)
                        .max_age(Duration::days(GUEST_ID_TTL_DAYS))
                        .build(),
                );
            }

            if let Some(user) = &user {
                let key = recent_rooms_cookie(&user.uid);
                let existing: Vec<String> = jar
                    .get(&key)
                    .and_then(|c| serde_json::from_str(c.value()).ok())
                    .unwrap_or_default();
                let updated = recent::push_recent_room(existing, &room.uid);

                jar = jar.add(
                    Cookie::build((key, serde_json::to_string(&updated)?))
                        .path("/")
                        .same_site(SameSite::Lax)
                        .max_age(Duration::days(RECENT_ROOMS_TTL_DAYS))
                        .build(),
                );
            } else if let Some(name) = params
                .join_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            {
                jar = jar.add(
                    Cookie::build((NAME_COOKIE, name.to_string()))
                        .path("/")
                        .same_site(SameSite::Lax)
                        .max_age(Duration::days(NAME_COOKIE_TTL_DAYS))
                        .build(),
                );
            }

            Ok((jar, Json(JoinAction::Redirect { join_url })))
        }
        JoinOutcome::Wait => {
            let listing = public_recordings(&state, &room, filter, &page).await?;
            Ok((jar, Json(JoinAction::Wait { listing })))
        }
    }
}

/// Access code for this join: the form field wins, then whatever code
/// the session cookie already holds.
fn moderator_code_from(params: &JoinParams, jar: &SignedCookieJar) -> Option<String> {
    params
        .access_code
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| {
            jar.get(MODERATOR_CODE_COOKIE)
                .map(|c| c.value().to_string())
        })
}

/// Resolve a room by uid, falling back to the shared invite path.
async fn load_room(state: &AppState, uid: &str) -> Result<(Room, bool)> {
    if let Some(room) = state.room_repo.get_room(uid).await? {
        return Ok((room, false));
    }
    if let Some(room) = state.room_repo.get_room_by_shared_path(uid).await? {
        return Ok((room, true));
    }
    Err(AppError::NotFound(format!("Room {} not found", uid)))
}

/// On load-balanced deployments the tenant is the first host label.
fn user_domain(origin: &RequestOrigin, config: &Config) -> String {
    if config.loadbalanced {
        origin
            .host
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string()
    } else {
        DEFAULT_PROVIDER.to_string()
    }
}

/// Rooms owned under another tenant are reported as missing, not
/// forbidden, so the probe leaks nothing.
fn ensure_known_domain(config: &Config, room: &Room, origin: &RequestOrigin) -> Result<()> {
    if access::incorrect_user_domain(config, room, &user_domain(origin, config)) {
        return Err(AppError::NotFound(format!("Room {} not found", room.uid)));
    }
    Ok(())
}

async fn public_recordings(
    state: &AppState,
    room: &Room,
    filter: RecordingFilter,
    page: &PageQuery,
) -> Result<RecordingsListing> {
    let all = state.recording_repo.get_recordings(&room.meeting_id).await?;
    let matched = search_recordings(all, &filter, true);
    let recordings = paginate(matched, page.page, page.per_page());

    Ok(RecordingsListing { filter, recordings })
}
