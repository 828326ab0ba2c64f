use chrono::{DateTime, TimeZone};
use tracing::{debug, info};

use crate::data::{Credential, ProviderConfig};
use crate::effects::http::{ApiRequest, ApiResponse, HttpClient};
use crate::effects::resolve::parse_href;
use crate::error::{Error, Result};

/// Where an upload goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// One-time URL to `PUT` the bytes to.
    pub href: String,
    pub remote_path: String,
}

/// Remote file name for an upload started at `now`.
pub fn upload_file_name<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("speedtest_{}.dat", now.format("%Y%m%d_%H%M%S"))
}

/// Obtains upload URLs, creating the upload container when it is missing.
pub struct UploadProvisioner<'a, C> {
    client: &'a C,
    provider: &'a ProviderConfig,
}

impl<'a, C: HttpClient> UploadProvisioner<'a, C> {
    pub fn new(client: &'a C, provider: &'a ProviderConfig) -> Self {
        Self { client, provider }
    }

    /// Ask for an upload URL for `file_name`.
    ///
    /// A 404 means the container does not exist yet: it is created and the
    /// request is retried exactly once.
    pub async fn provision(&self, file_name: &str, credential: &Credential) -> Result<UploadTarget> {
        let remote_path = self.provider.upload_path(file_name);
        let mut response = self.request_upload_url(&remote_path, credential).await?;

        if response.status == 404 && !self.provider.upload_container.is_empty() {
            info!(container = %self.provider.upload_container, "upload container missing, creating it");
            self.create_container(credential).await?;
            response = self.request_upload_url(&remote_path, credential).await?;
        }

        if !response.is_success() {
            return Err(Error::Provisioning {
                status: response.status,
                body: response.body,
            });
        }

        let href = parse_href(&response.body).ok_or_else(|| Error::Provisioning {
            status: response.status,
            body: "response did not include an upload href".to_string(),
        })?;
        debug!(remote_path = %remote_path, "obtained upload URL");
        Ok(UploadTarget { href, remote_path })
    }

    /// Create the upload container. An existing container counts as success.
    pub async fn create_container(&self, credential: &Credential) -> Result<()> {
        let container = self.provider.upload_container.trim_end_matches('/');
        let request = ApiRequest::put(self.provider.resource_endpoint(container))
            .header(self.provider.authorization(credential.token()))
            .header(("Accept".to_string(), "application/json".to_string()));
        let response = self
            .client
            .send(request)
            .await
            .map_err(Error::network)?;

        match response.status {
            409 => {
                debug!("upload container already exists");
                Ok(())
            }
            _ if response.is_success() => Ok(()),
            status => Err(Error::Provisioning {
                status,
                body: response.body,
            }),
        }
    }

    async fn request_upload_url(
        &self,
        remote_path: &str,
        credential: &Credential,
    ) -> Result<ApiResponse> {
        let request = ApiRequest::get(self.provider.upload_endpoint(remote_path))
            .header(self.provider.authorization(credential.token()));
        self.client.send(request).await.map_err(Error::network)
    }
}
