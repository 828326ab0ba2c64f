//! Turns user-supplied links into URLs that stream raw bytes.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::link;
use crate::data::credential::usable;
use crate::data::{
    Credential, DEFAULT_STRATEGIES, ProviderConfig, ResolutionKind, ResolvedSource, Strategy,
};
use crate::effects::http::{ApiRequest, HttpClient};

/// Runs the resolution tiers in order and returns the first hit.
///
/// No tier produces an error: a failing tier is logged and the next one is
/// tried. When all fail the input comes back unchanged as
/// [`ResolutionKind::Unresolved`].
pub struct SourceResolver<'a, C> {
    client: &'a C,
    provider: &'a ProviderConfig,
    strategies: &'a [Strategy],
    mirror_probe_timeout: Duration,
}

impl<'a, C: HttpClient> SourceResolver<'a, C> {
    pub fn new(client: &'a C, provider: &'a ProviderConfig) -> Self {
        Self {
            client,
            provider,
            strategies: &DEFAULT_STRATEGIES,
            mirror_probe_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn strategies(mut self, strategies: &'a [Strategy]) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn mirror_probe_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_probe_timeout = timeout;
        self
    }

    pub async fn resolve(&self, input: &str, credential: Option<&Credential>) -> ResolvedSource {
        for strategy in self.strategies {
            if let Some(source) = self.attempt(*strategy, input, credential).await {
                debug!(kind = %source.kind, url = %source.effective_url, "resolved download source");
                return source;
            }
        }
        debug!(input, "no resolution tier matched, using input as-is");
        ResolvedSource::new(input, ResolutionKind::Unresolved)
    }

    /// Run a single tier.
    pub async fn attempt(
        &self,
        strategy: Strategy,
        input: &str,
        credential: Option<&Credential>,
    ) -> Option<ResolvedSource> {
        match strategy {
            Strategy::LocalFile => link::is_local_url(input)
                .then(|| ResolvedSource::new(input, ResolutionKind::Local)),
            Strategy::AlreadyDirect => link::is_direct_link(input, self.provider)
                .then(|| ResolvedSource::new(input, ResolutionKind::AlreadyDirect)),
            Strategy::ProviderApi => self.via_provider(input, credential).await,
            Strategy::Mirror => self.via_mirror(input).await,
        }
    }

    async fn via_provider(
        &self,
        input: &str,
        credential: Option<&Credential>,
    ) -> Option<ResolvedSource> {
        link::sharing_resource_id(input, self.provider)?;
        let Some(credential) = usable(credential) else {
            debug!("no usable credential, skipping provider API");
            return None;
        };

        let request = ApiRequest::get(self.provider.public_download_endpoint(input))
            .header(self.provider.authorization(credential.token()));
        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "provider API request failed");
                return None;
            }
        };
        if !response.is_success() {
            debug!(status = response.status, "provider API refused to resolve link");
            return None;
        }

        match parse_href(&response.body) {
            Some(href) => Some(ResolvedSource::new(href, ResolutionKind::ProviderResolved)),
            None => {
                debug!("provider API response carried no href");
                None
            }
        }
    }

    async fn via_mirror(&self, input: &str) -> Option<ResolvedSource> {
        let id = link::sharing_resource_id(input, self.provider)?;
        let candidate = link::mirror_url(self.provider, id);

        let probe =
            tokio::time::timeout(self.mirror_probe_timeout, self.client.stream(&candidate, &[]))
                .await;
        match probe {
            Ok(Ok(response)) if response.is_success() => Some(
                ResolvedSource::new(candidate, ResolutionKind::MirrorResolved)
                    .known_size(response.content_length),
            ),
            Ok(Ok(response)) => {
                debug!(status = response.status, url = %candidate, "mirror probe refused");
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, url = %candidate, "mirror probe failed");
                None
            }
            Err(_) => {
                debug!(url = %candidate, "mirror probe timed out");
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct Link {
    href: Option<String>,
}

/// The `href` field of a provider link object.
pub(crate) fn parse_href(body: &str) -> Option<String> {
    serde_json::from_str::<Link>(body)
        .ok()?
        .href
        .filter(|href| !href.trim().is_empty())
}
