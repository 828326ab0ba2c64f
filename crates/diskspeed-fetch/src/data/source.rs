use std::fmt;

/// How a download URL was obtained from the user's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// A `file:` URL read straight from disk.
    Local,
    /// The input already streams raw bytes.
    AlreadyDirect,
    /// The provider API returned a direct `href`.
    ProviderResolved,
    /// The public mirror answered for the shared resource.
    MirrorResolved,
    /// Every tier failed; the input is used as-is.
    Unresolved,
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionKind::Local => "local file",
            ResolutionKind::AlreadyDirect => "direct link",
            ResolutionKind::ProviderResolved => "provider API",
            ResolutionKind::MirrorResolved => "public mirror",
            ResolutionKind::Unresolved => "unresolved",
        };
        f.write_str(name)
    }
}

/// A download source ready to hand to the chunk reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub effective_url: String,
    pub known_size: Option<u64>,
    pub is_local: bool,
    pub kind: ResolutionKind,
}

impl ResolvedSource {
    pub fn new(effective_url: impl Into<String>, kind: ResolutionKind) -> Self {
        Self {
            effective_url: effective_url.into(),
            known_size: None,
            is_local: kind == ResolutionKind::Local,
            kind,
        }
    }

    #[must_use]
    pub fn known_size(mut self, size: Option<u64>) -> Self {
        self.known_size = size;
        self
    }
}

/// One tier of the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LocalFile,
    AlreadyDirect,
    ProviderApi,
    Mirror,
}

/// Tiers in the order they are tried.
pub const DEFAULT_STRATEGIES: [Strategy; 4] = [
    Strategy::LocalFile,
    Strategy::AlreadyDirect,
    Strategy::ProviderApi,
    Strategy::Mirror,
];

/// Outcome of the availability probe run before a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Missing,
    Inconclusive,
}

/// Result of a `HEAD` request against a download URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteProbe {
    pub availability: Availability,
    /// `Content-Length` of a successful probe.
    pub size: Option<u64>,
}
