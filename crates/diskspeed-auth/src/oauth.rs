use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use diskspeed_fetch::{ApiRequest, Credential, HttpClient, ProviderConfig};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::OAuthConfig;
use crate::error::{AuthError, Result};
use crate::store::TokenStore;

/// Source of access credentials for the measurement engine.
pub trait CredentialProvider: Send + Sync {
    /// Current credential, if one is stored and not expired.
    fn access_token(&self) -> impl Future<Output = Result<Option<Credential>>> + Send;

    /// Whether the provider still accepts `credential`.
    fn is_valid(&self, credential: &Credential) -> impl Future<Output = bool> + Send;
}

/// Outcome of the write-permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAccess {
    Granted,
    Denied { status: u16 },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// OAuth confirmation-code flow against the provider, backed by a
/// [`TokenStore`].
pub struct Authenticator<C> {
    client: C,
    config: OAuthConfig,
    provider: ProviderConfig,
    store: TokenStore,
}

impl<C: HttpClient> Authenticator<C> {
    pub fn new(client: C, config: OAuthConfig, provider: ProviderConfig, store: TokenStore) -> Self {
        Self {
            client,
            config,
            provider,
            store,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn authorization_page(&self) -> String {
        self.config.authorization_page()
    }

    /// Trade a confirmation code for a token and persist it.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::EmptyCode);
        }

        let form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
        ];
        let response = self
            .client
            .send(ApiRequest::post_form(&self.config.token_url, form))
            .await
            .map_err(AuthError::network)?;
        if !response.is_success() {
            return Err(AuthError::Exchange {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)?;
        let token = parsed
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::MissingToken)?;
        let now = Utc::now();
        let expires_at = parsed
            .expires_in
            .and_then(|secs| expiry_after(now, secs))
            .or_else(|| expiry_after(now, self.config.default_expires_in))
            .unwrap_or(now);
        let credential = Credential::new(token).with_expiry(expires_at);

        self.store.save(&credential).await?;
        info!(expires_at = ?credential.expires_at(), "signed in");
        Ok(credential)
    }

    /// Ask the disk API, then the identity endpoint. Either accepting the
    /// token is enough.
    pub async fn validate(&self, credential: &Credential) -> bool {
        let disk = self.provider.api_base.clone();
        for url in [disk, self.config.info_url.clone()] {
            let request =
                ApiRequest::get(&url).header(self.provider.authorization(credential.token()));
            match self.client.send(request).await {
                Ok(response) if response.is_success() => return true,
                Ok(response) => debug!(url = %url, status = response.status, "token rejected"),
                Err(e) => debug!(url = %url, error = %e, "token validation request failed"),
            }
        }
        false
    }

    /// Stored credential after re-checking it with the provider.
    ///
    /// A stored token that the provider no longer accepts is discarded.
    pub async fn restore(&self) -> Result<Option<Credential>> {
        let Some(credential) = self.store.load().await? else {
            return Ok(None);
        };
        if credential.is_usable() && self.validate(&credential).await {
            return Ok(Some(credential));
        }
        warn!("stored credential is no longer valid, discarding it");
        self.store.reset().await?;
        Ok(None)
    }

    pub async fn logout(&self) -> Result<()> {
        self.store.reset().await
    }

    /// Create and remove a throwaway folder to check the token may write.
    pub async fn probe_write(&self, credential: &Credential) -> Result<WriteAccess> {
        let folder = format!("test_write_permission_{}", Utc::now().timestamp_micros());
        let auth = self.provider.authorization(credential.token());

        let create = ApiRequest::put(self.provider.resource_endpoint(&folder)).header(auth.clone());
        let response = self
            .client
            .send(create)
            .await
            .map_err(AuthError::network)?;
        if !(response.is_success() || response.status == 409) {
            return Ok(WriteAccess::Denied {
                status: response.status,
            });
        }

        let delete = ApiRequest::delete(format!(
            "{}&permanently=true",
            self.provider.resource_endpoint(&folder)
        ))
        .header(auth);
        if let Err(e) = self.client.send(delete).await {
            warn!(folder = %folder, error = %e, "failed to remove write-permission probe folder");
        }
        Ok(WriteAccess::Granted)
    }
}

/// `now + secs`, or `None` when that is not a representable instant.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

impl<C: HttpClient> CredentialProvider for Authenticator<C> {
    async fn access_token(&self) -> Result<Option<Credential>> {
        Ok(self.store.load().await?.filter(Credential::is_usable))
    }

    async fn is_valid(&self, credential: &Credential) -> bool {
        self.validate(credential).await
    }
}
