use std::env;
use std::path::PathBuf;

/// Config-level fallbacks applied when a room's settings blob leaves a
/// flag unset.
#[derive(Debug, Clone)]
pub struct SettingDefaults {
    pub mute_on_start: bool,
    pub require_moderator_approval: bool,
    pub anyone_can_start: bool,
    pub join_moderator: bool,
    pub recording: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub redis_url: String,
    /// Signs session cookies and JWTs. Must be at least 32 bytes.
    pub secret_key_base: String,
    pub jwt_expiry_seconds: u64,
    /// Meeting API endpoint, e.g. "https://bbb.example.com/bigbluebutton/".
    pub meeting_endpoint: String,
    pub meeting_secret: String,
    /// Fallback origin for links when the request carries no Host header.
    pub base_url: String,
    /// Relative asset paths gain a "/b" prefix in production deployments.
    pub production: bool,
    pub loadbalanced: bool,
    pub max_avatar_size: u64,
    pub avatar_timeout_seconds: u64,
    pub default_recording_visibility: String,
    pub uploads_dir: PathBuf,
    pub setting_defaults: SettingDefaults,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let secret_key_base =
            env::var("SECRET_KEY_BASE").map_err(|_| ConfigError::MissingSecretKeyBase)?;
        if secret_key_base.len() < 32 {
            return Err(ConfigError::SecretKeyBaseTooShort);
        }

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            secret_key_base,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            meeting_endpoint: env::var("MEETING_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost/bigbluebutton/".to_string()),
            meeting_secret: env::var("MEETING_SECRET")
                .map_err(|_| ConfigError::MissingMeetingSecret)?,
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            production: env_flag("PRODUCTION", false),
            loadbalanced: env_flag("LOADBALANCED_CONFIGURATION", false),
            max_avatar_size: env::var("MAX_AVATAR_SIZE")
                .unwrap_or_else(|_| "100000".to_string())
                .parse()
                .unwrap_or(100_000),
            avatar_timeout_seconds: env::var("AVATAR_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            default_recording_visibility: env::var("DEFAULT_RECORDING_VISIBILITY")
                .unwrap_or_else(|_| "unlisted".to_string()),
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "public/uploads".to_string())
                .into(),
            setting_defaults: SettingDefaults {
                mute_on_start: env_flag("DEFAULT_MUTE_ON_START", false),
                require_moderator_approval: env_flag("DEFAULT_REQUIRE_MODERATOR_APPROVAL", false),
                anyone_can_start: env_flag("DEFAULT_ANYONE_CAN_START", false),
                join_moderator: env_flag("DEFAULT_JOIN_MODERATOR", false),
                recording: env_flag("DEFAULT_RECORDING", true),
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
impl Config {
    /// Baseline config for unit tests; individual tests override fields.
    pub fn test_defaults() -> Self {
        Config {
            server_host: "localhost".to_string(),
            server_port: 8080,
            redis_url: "redis://localhost".to_string(),
            secret_key_base: "0123456789abcdef0123456789abcdef".to_string(),
            jwt_expiry_seconds: 86400,
            meeting_endpoint: "http://localhost/bigbluebutton/".to_string(),
            meeting_secret: "meeting-secret".to_string(),
            base_url: "http://localhost:8080".to_string(),
            production: false,
            loadbalanced: false,
            max_avatar_size: 100_000,
            avatar_timeout_seconds: 3,
            default_recording_visibility: "unlisted".to_string(),
            uploads_dir: "public/uploads".into(),
            setting_defaults: SettingDefaults {
                mute_on_start: false,
                require_moderator_approval: false,
                anyone_can_start: false,
                join_moderator: false,
                recording: true,
            },
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("SECRET_KEY_BASE environment variable is required")]
    MissingSecretKeyBase,
    #[error("SECRET_KEY_BASE must be at least 32 bytes")]
    SecretKeyBaseTooShort,
    #[error("MEETING_SECRET environment variable is required")]
    MissingMeetingSecret,
}
