use serde::{Deserialize, Serialize};
use url::Url;

/// Shape of the storage provider the tests run against.
///
/// Defaults describe Yandex.Disk and the dokpub public mirror. Every field
/// can be overridden from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// REST API root, without trailing slash.
    pub api_base: String,

    /// Marker that identifies a public sharing link; the resource id follows it.
    pub sharing_prefix: String,

    /// Mirror URL prefix; the resource id is appended verbatim.
    pub mirror_base: String,

    /// Hosts that already serve raw bytes.
    pub direct_hosts: Vec<String>,

    /// File extensions that mark a URL as already downloadable.
    pub direct_extensions: Vec<String>,

    /// Scheme word of the `Authorization` header.
    pub auth_scheme: String,

    /// Host suffixes that receive the access token on probes.
    pub credential_hosts: Vec<String>,

    /// Remote directory that receives uploads. Empty means the disk root.
    pub upload_container: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://cloud-api.yandex.net/v1/disk".to_string(),
            sharing_prefix: "disk.yandex.ru/d/".to_string(),
            mirror_base: "https://getfile.dokpub.com/yandex/get/".to_string(),
            direct_hosts: vec!["getfile.dokpub.com".to_string()],
            direct_extensions: [".dat", ".txt", ".zip", ".rar"]
                .into_iter()
                .map(String::from)
                .collect(),
            auth_scheme: "OAuth".to_string(),
            credential_hosts: vec!["yandex.ru".to_string(), "yandex.net".to_string()],
            upload_container: "app:".to_string(),
        }
    }
}

impl ProviderConfig {
    /// `Authorization` header carrying `token`.
    pub fn authorization(&self, token: &str) -> (String, String) {
        (
            "Authorization".to_string(),
            format!("{} {}", self.auth_scheme, token),
        )
    }

    /// Endpoint that turns a public link into a direct `href`.
    pub fn public_download_endpoint(&self, public_url: &str) -> String {
        self.endpoint("public/resources/download", &[("public_key", public_url)])
    }

    /// Endpoint that hands out a one-time upload `href` for `remote_path`.
    pub fn upload_endpoint(&self, remote_path: &str) -> String {
        self.endpoint(
            "resources/upload",
            &[("path", remote_path), ("overwrite", "true")],
        )
    }

    /// Endpoint addressing a folder or file resource.
    pub fn resource_endpoint(&self, remote_path: &str) -> String {
        self.endpoint("resources", &[("path", remote_path)])
    }

    /// Remote path an upload of `file_name` is written to.
    pub fn upload_path(&self, file_name: &str) -> String {
        let container = self.upload_container.trim_end_matches('/');
        if container.is_empty() {
            file_name.to_string()
        } else {
            format!("{container}/{file_name}")
        }
    }

    /// Whether `url` points at a host that should see the access token.
    pub fn attaches_credential(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned)) else {
            return false;
        };
        self.credential_hosts
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
    }

    fn endpoint(&self, resource: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{}", self.api_base.trim_end_matches('/'), resource);
        let encoded: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        if !encoded.is_empty() {
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }
}
