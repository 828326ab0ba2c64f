use serde::{Deserialize, Serialize};

/// OAuth application registration and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Lightweight identity endpoint used as the second validation check.
    pub info_url: String,
    /// Lifetime assumed when the token response omits `expires_in`.
    pub default_expires_in: i64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: "https://oauth.yandex.ru/authorize".to_string(),
            token_url: "https://oauth.yandex.ru/token".to_string(),
            info_url: "https://login.yandex.ru/info".to_string(),
            default_expires_in: 3600,
        }
    }
}

impl OAuthConfig {
    /// Page the user opens in a browser to obtain a confirmation code.
    pub fn authorization_page(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .finish();
        format!("{}?{}", self.authorize_url, query)
    }
}
