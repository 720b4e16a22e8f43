use async_trait::async_trait;

use crate::error::Result;

/// A record found on the open-access repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHit {
    pub id: String,
    pub url: String,
}

/// Searches an open-access repository for a publication's record.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Exact-phrase title search. Fails with `AmbiguousMatch` on more than one hit and
    /// `NotFound` on none.
    async fn search_by_title(&self, title: &str) -> Result<RecordHit>;

    /// First record carrying `doi`, if any.
    async fn search_by_doi(&self, doi: &str) -> Option<RecordHit>;
}

/// Recovers an institutional author email from a publisher landing page.
#[async_trait]
pub trait EmailResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve_email(&self, link: &str) -> Result<String>;
}

pub mod ieee;
pub mod zenodo;

pub use ieee::IeeeEmailResolver;
pub use zenodo::ZenodoSource;
