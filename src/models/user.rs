use serde::{Deserialize, Serialize};

/// Authenticated requester, decoded from a bearer token. Requests without
/// one proceed as guests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: String,
    pub name: String,
    pub provider: String,
    /// Profile image URL, if the user set one.
    pub image: Option<String>,
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user uid
    pub name: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.sub,
            name: claims.name,
            provider: claims.provider,
            image: claims.image,
        }
    }
}
