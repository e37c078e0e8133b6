//! Backend identities.

use std::fmt;
use url::Url;

/// One of the two services that can answer a movies request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The legacy application.
    Monolith,
    /// The replacement movies service.
    Movies,
}

impl BackendKind {
    /// Label surfaced in `X-Target-Service`, logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            BackendKind::Monolith => "monolith",
            BackendKind::Movies => "movies",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The backend picked for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendChoice {
    pub kind: BackendKind,
    pub base_url: Url,
}

impl BackendChoice {
    pub fn new(kind: BackendKind, base_url: Url) -> Self {
        Self { kind, base_url }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}
