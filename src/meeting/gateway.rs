use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::join::JoinOptions;
use crate::models::Room;
use crate::security;

/// The meeting server as the join flow sees it: a running-state probe
/// and a producer of signed join redirect URLs.
#[async_trait]
pub trait MeetingApi: Send + Sync {
    async fn is_meeting_running(&self, meeting_id: &str) -> Result<bool>;

    fn join_url(&self, room: &Room, name: &str, options: &JoinOptions, uid: &str) -> Result<String>;
}

/// Client for a BigBlueButton-style meeting API. Every call is signed
/// with a checksum over the call name, query string, and shared secret.
pub struct MeetingGateway {
    client: reqwest::Client,
    /// Endpoint base, ending in a slash, e.g.
    /// "https://bbb.example.com/bigbluebutton/".
    endpoint: String,
    secret: String,
}

impl MeetingGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        let mut endpoint = config.meeting_endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        Ok(Self {
            client,
            endpoint,
            secret: config.meeting_secret.clone(),
        })
    }

    fn signed_url(&self, call: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .and_then(|u| u.join(&format!("api/{}", call)))
            .map_err(|e| AppError::MeetingApiError(format!("Invalid meeting endpoint: {}", e)))?;

        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }

        let query = url.query().unwrap_or("").to_string();
        let checksum = security::api_checksum(call, &query, &self.secret);
        url.query_pairs_mut().append_pair("checksum", &checksum);

        Ok(url.to_string())
    }
}

#[async_trait]
impl MeetingApi for MeetingGateway {
    async fn is_meeting_running(&self, meeting_id: &str) -> Result<bool> {
        let url = self.signed_url("isMeetingRunning", &[("meetingID", meeting_id)])?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::MeetingApiError(format!("isMeetingRunning failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::MeetingApiError(format!(
                "isMeetingRunning returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::MeetingApiError(format!("Unreadable response body: {}", e)))?;

        Ok(body.contains("<running>true</running>"))
    }

    fn join_url(&self, room: &Room, name: &str, options: &JoinOptions, uid: &str) -> Result<String> {
        let role = if options.user_is_moderator {
            "MODERATOR"
        } else {
            "VIEWER"
        };
        let record = options.record.to_string();
        let mute = options.mute_on_start.to_string();
        let approval = options.require_moderator_approval.to_string();

        let mut params = vec![
            ("meetingID", room.meeting_id.as_str()),
            ("fullName", name),
            ("userID", uid),
            ("role", role),
            ("record", record.as_str()),
            ("muteOnStart", mute.as_str()),
            ("guestPolicyApproval", approval.as_str()),
            ("logoutURL", options.meeting_logout_url.as_str()),
            ("moderatorOnlyMessage", options.moderator_message.as_str()),
        ];
        if let Some(avatar) = options.avatar_url.as_deref() {
            params.push(("avatarURL", avatar));
        }

        self.signed_url("join", &params)
    }
}
