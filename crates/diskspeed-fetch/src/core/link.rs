//! Classification of download URLs. No network access happens here.

use std::path::PathBuf;

use url::Url;

use crate::data::ProviderConfig;
use crate::error::{Error, Result};

/// Whether `url` uses the `file:` scheme.
pub fn is_local_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.scheme() == "file")
}

/// Filesystem path behind a `file:` URL.
pub fn local_path(url: &str) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

/// `file:` URL for a local path.
pub fn file_url(path: &std::path::Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| Error::InvalidUrl(path.display().to_string()))
}

/// Whether `url` already streams raw bytes: an explicit `/download?` query,
/// a known direct host, or a known file extension.
pub fn is_direct_link(url: &str, provider: &ProviderConfig) -> bool {
    if url.contains("/download?") {
        return true;
    }
    match Url::parse(url) {
        Ok(parsed) => {
            let direct_host = parsed.host_str().is_some_and(|host| {
                provider
                    .direct_hosts
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(host))
            });
            direct_host || has_direct_extension(parsed.path(), provider)
        }
        Err(_) => has_direct_extension(url, provider),
    }
}

fn has_direct_extension(path: &str, provider: &ProviderConfig) -> bool {
    let path = path.to_ascii_lowercase();
    provider
        .direct_extensions
        .iter()
        .any(|ext| !ext.is_empty() && path.ends_with(&ext.to_ascii_lowercase()))
}

/// Stable identifier of a shared resource, or `None` if `url` is not a
/// sharing link.
///
/// The id is the text after the sharing prefix, cut at the first `?`, `&`
/// or `/`.
pub fn sharing_resource_id<'a>(url: &'a str, provider: &ProviderConfig) -> Option<&'a str> {
    if provider.sharing_prefix.is_empty() {
        return None;
    }
    let (_, rest) = url.split_once(provider.sharing_prefix.as_str())?;
    let id = rest
        .split(['?', '&', '/'])
        .next()
        .unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

pub fn mirror_url(provider: &ProviderConfig, resource_id: &str) -> String {
    format!("{}{}", provider.mirror_base, resource_id)
}

/// Append `cache=<value>` so intermediaries cannot serve a cached copy.
pub fn with_cache_buster(url: &str, value: u32) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    parsed
        .query_pairs_mut()
        .append_pair("cache", &value.to_string());
    Ok(parsed.into())
}
