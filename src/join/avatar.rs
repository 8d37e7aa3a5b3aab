use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::join::RequestOrigin;
use crate::models::CurrentUser;

/// Template avatar catalog, keyed by id. Keys and paths are referenced
/// by stored session state and must stay stable across deploys.
pub const TEMPLATE_AVATARS: [(&str, &str); 24] = [
    ("1", "/images/template_avatar_1.jpg"),
    ("2", "/images/template_avatar_2.jpg"),
    ("3", "/images/template_avatar_3.jpg"),
    ("4", "/images/template_avatar_4.jpg"),
    ("5", "/images/template_avatar_5.jpg"),
    ("6", "/images/template_avatar_6.jpg"),
    ("7", "/images/template_avatar_7.jpg"),
    ("8", "/images/template_avatar_8.jpg"),
    ("9", "/images/template_avatar_9.jpg"),
    ("10", "/images/template_avatar_10.jpg"),
    ("11", "/images/template_avatar_11.jpg"),
    ("12", "/images/template_avatar_12.jpg"),
    ("13", "/images/template_avatar_13.jpg"),
    ("14", "/images/template_avatar_14.jpg"),
    ("15", "/images/template_avatar_15.jpg"),
    ("16", "/images/template_avatar_16.jpg"),
    ("17", "/images/template_avatar_17.jpg"),
    ("18", "/images/template_avatar_18.jpg"),
    ("19", "/images/template_avatar_19.jpg"),
    ("20", "/images/template_avatar_20.jpg"),
    ("21", "/images/template_avatar_21.jpg"),
    ("22", "/images/template_avatar_22.jpg"),
    ("23", "/images/template_avatar_23.jpg"),
    ("24", "/images/template_avatar_24.jpg"),
];

fn template_avatar_path(id: &str) -> Option<&'static str> {
    TEMPLATE_AVATARS
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, path)| *path)
}

/// Client-supplied avatar choice, parsed from the join form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSelection {
    /// Use the logged-in user's profile image, if it validates.
    LoggedInUser,
    Template(String),
    Custom(String),
    /// Absent or unrecognized selections resolve to no avatar.
    NoSelection,
}

impl AvatarSelection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("none_or_loggedin_user_avatar") => AvatarSelection::LoggedInUser,
            Some(tag) => {
                if let Some(id) = tag.strip_prefix("template_avatar_") {
                    if !id.is_empty() {
                        return AvatarSelection::Template(id.to_string());
                    }
                }
                if let Some(token) = tag.strip_prefix("custom_avatar_") {
                    if !token.is_empty() {
                        return AvatarSelection::Custom(token.to_string());
                    }
                }
                AvatarSelection::NoSelection
            }
            None => AvatarSelection::NoSelection,
        }
    }
}

/// Remote avatar validation, behind a trait so the join flow stays
/// testable and the transport can be swapped.
#[async_trait]
pub trait AvatarValidator: Send + Sync {
    async fn valid_avatar(&self, url: &str) -> bool;
}

/// HEAD-probes candidate avatar URLs. Fails closed on any transport
/// error or timeout so a slow image host cannot stall the join flow.
pub struct HttpAvatarValidator {
    client: reqwest::Client,
    max_avatar_size: u64,
}

impl HttpAvatarValidator {
    pub fn new(config: &Config) -> Result<Self> {
        // Redirects are not followed: the probed URL itself must answer
        // 200, not whatever a redirect chain ends up at.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.avatar_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_avatar_size: config.max_avatar_size,
        })
    }
}

#[async_trait]
impl AvatarValidator for HttpAvatarValidator {
    async fn valid_avatar(&self, url: &str) -> bool {
        let parsed = match reqwest::Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        let response = match self.client.head(parsed).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Avatar validation request failed");
                return false;
            }
        };

        let declared_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        head_response_valid(
            response.status().as_u16(),
            declared_length,
            self.max_avatar_size,
        )
    }
}

/// Accept rule for a HEAD probe: status must be exactly 200 and the
/// declared length must stay under the cap. An absent Content-Length
/// counts as zero.
fn head_response_valid(status: u16, content_length: Option<u64>, max_size: u64) -> bool {
    status == 200 && content_length.unwrap_or(0) < max_size
}

/// Compute the avatar URL for a join, or `None` for no avatar.
///
/// Precedence: an uploaded-file URL wins outright; otherwise the
/// client's selection decides. Later rules are not evaluated once one
/// yields a URL.
pub async fn resolve(
    selection: Option<&str>,
    current_user: Option<&CurrentUser>,
    uploaded_file_url: Option<&str>,
    origin: &RequestOrigin,
    production: bool,
    validator: &dyn AvatarValidator,
) -> Option<String> {
    if let Some(url) = uploaded_file_url.filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }

    match AvatarSelection::parse(selection) {
        AvatarSelection::LoggedInUser => {
            let image = current_user?.image.as_deref().filter(|i| !i.is_empty())?;
            if validator.valid_avatar(image).await {
                Some(image.to_string())
            } else {
                None
            }
        }
        AvatarSelection::Template(id) => {
            let path = template_avatar_path(&id)?;
            let prefix = if production { "/b" } else { "" };
            Some(format!("{}{}{}", origin.url_base(), prefix, path))
        }
        AvatarSelection::Custom(token) => {
            let dir = if production { "/b/uploads/" } else { "/uploads/" };
            Some(format!("{}{}{}", origin.url_base(), dir, token))
        }
        AvatarSelection::NoSelection => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct StaticValidator(bool);

    #[async_trait]
    impl AvatarValidator for StaticValidator {
        async fn valid_avatar(&self, _url: &str) -> bool {
            self.0
        }
    }

    fn origin() -> RequestOrigin {
        RequestOrigin {
            scheme: "https".to_string(),
            host: "meet.example.com".to_string(),
        }
    }

    fn user_with_image(image: Option<&str>) -> CurrentUser {
        CurrentUser {
            uid: "user-1".to_string(),
            name: "Alice".to_string(),
            provider: "greenlight".to_string(),
            image: image.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_uploaded_file_url_wins_over_selection() {
        let resolved = resolve(
            Some("template_avatar_3"),
            None,
            Some("/uploads/1712000000-me.png"),
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(resolved.as_deref(), Some("/uploads/1712000000-me.png"));
    }

    #[tokio::test]
    async fn test_template_selection_builds_absolute_url() {
        let resolved = resolve(
            Some("template_avatar_3"),
            None,
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(
            resolved.as_deref(),
            Some("https://meet.example.com/images/template_avatar_3.jpg")
        );
    }

    #[tokio::test]
    async fn test_template_selection_gains_prefix_in_production() {
        let resolved = resolve(
            Some("template_avatar_3"),
            None,
            None,
            &origin(),
            true,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(
            resolved.as_deref(),
            Some("https://meet.example.com/b/images/template_avatar_3.jpg")
        );
    }

    #[tokio::test]
    async fn test_unknown_template_id_resolves_to_none() {
        let resolved = resolve(
            Some("template_avatar_99"),
            None,
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_custom_avatar_uses_uploads_path() {
        let resolved = resolve(
            Some("custom_avatar_1712000000-me.png"),
            None,
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(
            resolved.as_deref(),
            Some("https://meet.example.com/uploads/1712000000-me.png")
        );
    }

    #[tokio::test]
    async fn test_custom_avatar_uses_production_uploads_path() {
        let resolved = resolve(
            Some("custom_avatar_1712000000-me.png"),
            None,
            None,
            &origin(),
            true,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(
            resolved.as_deref(),
            Some("https://meet.example.com/b/uploads/1712000000-me.png")
        );
    }

    #[tokio::test]
    async fn test_logged_in_avatar_requires_validation() {
        let user = user_with_image(Some("https://cdn.example.com/alice.png"));

        let accepted = resolve(
            Some("none_or_loggedin_user_avatar"),
            Some(&user),
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;
        assert_eq!(accepted.as_deref(), Some("https://cdn.example.com/alice.png"));

        let rejected = resolve(
            Some("none_or_loggedin_user_avatar"),
            Some(&user),
            None,
            &origin(),
            false,
            &StaticValidator(false),
        )
        .await;
        assert_eq!(rejected, None);
    }

    #[tokio::test]
    async fn test_logged_in_selection_without_image_is_none() {
        let user = user_with_image(None);

        let resolved = resolve(
            Some("none_or_loggedin_user_avatar"),
            Some(&user),
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_missing_or_unrecognized_selection_is_none() {
        let none = resolve(None, None, None, &origin(), false, &StaticValidator(true)).await;
        assert_eq!(none, None);

        let junk = resolve(
            Some("wat"),
            None,
            None,
            &origin(),
            false,
            &StaticValidator(true),
        )
        .await;
        assert_eq!(junk, None);
    }

    #[test]
    fn test_catalog_has_stable_well_formed_entries() {
        assert_eq!(TEMPLATE_AVATARS.len(), 24);
        for (id, path) in TEMPLATE_AVATARS {
            assert_eq!(path, format!("/images/template_avatar_{}.jpg", id));
        }
    }

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer exactly one connection with a canned HTTP response.
    async fn serve_once(listener: TcpListener, response: &'static [u8]) {
        if let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let _ = sock.write_all(response).await;
            let _ = sock.flush().await;
        }
    }

    fn http_validator(timeout_seconds: u64) -> HttpAvatarValidator {
        let mut config = Config::test_defaults();
        config.avatar_timeout_seconds = timeout_seconds;
        HttpAvatarValidator::new(&config).expect("Should build validator")
    }

    #[tokio::test]
    async fn test_head_probe_accepts_small_ok_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_once(
            listener,
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n",
        ));

        let validator = http_validator(3);
        assert!(
            validator
                .valid_avatar(&format!("http://{}/avatar.png", addr))
                .await
        );
    }

    #[tokio::test]
    async fn test_head_probe_rejects_redirect_without_following() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_once(
            listener,
            b"HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:9/elsewhere\r\nContent-Length: 0\r\n\r\n",
        ));

        let validator = http_validator(3);
        assert!(
            !validator
                .valid_avatar(&format!("http://{}/avatar.png", addr))
                .await
        );
    }

    #[tokio::test]
    async fn test_unresponsive_host_fails_closed_on_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection but never answer.
        tokio::spawn(async move {
            let _sock = listener.accept().await;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });

        let validator = http_validator(1);
        assert!(
            !validator
                .valid_avatar(&format!("http://{}/avatar.png", addr))
                .await
        );
    }

    #[tokio::test]
    async fn test_refused_connection_fails_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let validator = http_validator(1);
        assert!(
            !validator
                .valid_avatar(&format!("http://{}/avatar.png", addr))
                .await
        );
    }

    #[tokio::test]
    async fn test_non_http_urls_are_rejected_without_a_request() {
        let validator = http_validator(1);

        assert!(!validator.valid_avatar("ftp://example.com/a.png").await);
        assert!(!validator.valid_avatar("not a url").await);
        assert!(!validator.valid_avatar("/uploads/relative.png").await);
    }

    #[test]
    fn test_head_response_rules() {
        assert!(head_response_valid(200, Some(50_000), 100_000));
        assert!(head_response_valid(200, None, 100_000));
        assert!(!head_response_valid(404, Some(50_000), 100_000));
        assert!(!head_response_valid(200, Some(100_000), 100_000));
        assert!(!head_response_valid(200, Some(250_000), 100_000));
        assert!(!head_response_valid(301, Some(50_000), 100_000));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!(
            AvatarSelection::parse(Some("none_or_loggedin_user_avatar")),
            AvatarSelection::LoggedInUser
        );
        assert_eq!(
            AvatarSelection::parse(Some("template_avatar_12")),
            AvatarSelection::Template("12".to_string())
        );
        assert_eq!(
            AvatarSelection::parse(Some("custom_avatar_abc.png")),
            AvatarSelection::Custom("abc.png".to_string())
        );
        assert_eq!(
            AvatarSelection::parse(Some("custom_avatar_")),
            AvatarSelection::NoSelection
        );
        assert_eq!(AvatarSelection::parse(None), AvatarSelection::NoSelection);
    }
}
