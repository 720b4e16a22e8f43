//! Corresponding-author email lookup from IEEE Xplore document pages.
//!
//! Xplore embeds the document record as a JavaScript object literal
//! (`xplGlobal.document.metadata = {...};`). Authors are matched against the
//! institution in three tiers: email domain in the affiliation, institution
//! name in the affiliation, then a fixed table of known authors.

use std::time::Duration;

use async_trait::async_trait;
use oaenrich_core::EnrichConfig;
use oaenrich_core::config::InstitutionConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::http::PoliteClient;
use crate::sources::EmailResolver;

static EMBEDDED_METADATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"xplGlobal\.document\.metadata\s*=\s*(\{.*?\})\s*;").expect("valid regex")
});

/// Authors whose pages never carry the institution in their affiliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailException {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
}

pub static EMAIL_EXCEPTIONS: &[EmailException] = &[
    EmailException {
        first_name: "Thomas",
        last_name: "Parisini",
        email: "parisini.thomas@ucy.ac.cy",
    },
    EmailException {
        first_name: "Alessandro",
        last_name: "Astolfi",
        email: "astolfi.alessandro@ucy.ac.cy",
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XploreAuthor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub affiliations: Vec<String>,
}

impl XploreAuthor {
    pub fn from_json(v: &Value) -> Self {
        let name = |key: &str| {
            v[key]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        // Usually a list of strings; a few older records use a bare string.
        let affiliations = match &v["affiliation"] {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect(),
            Value::String(s) => vec![s.clone()],
            _ => Vec::new(),
        };
        Self {
            first_name: name("firstName"),
            last_name: name("lastName"),
            affiliations,
        }
    }

    fn names(&self) -> Option<(&str, &str)> {
        Some((self.first_name.as_deref()?, self.last_name.as_deref()?))
    }
}

pub fn authors_from_metadata(metadata: &Value) -> Vec<XploreAuthor> {
    metadata["authors"]
        .as_array()
        .map(|arr| arr.iter().map(XploreAuthor::from_json).collect())
        .unwrap_or_default()
}

/// Parses the embedded document record out of an Xplore page.
pub fn extract_embedded_metadata(html: &str) -> Option<Value> {
    let object = EMBEDDED_METADATA_RE.captures(html)?.get(1)?.as_str();
    serde_json::from_str(object).ok()
}

/// Runs the three matching tiers over the author list, in author order.
pub fn email_from_authors(
    authors: &[XploreAuthor],
    institution: &InstitutionConfig,
    exceptions: &[EmailException],
) -> Option<String> {
    let domain = institution.domain.as_str();

    for author in authors {
        let Some((first, last)) = author.names() else {
            continue;
        };
        if author.affiliations.iter().any(|a| a.contains(domain)) {
            let email = format!("{}.{}@{domain}", last.to_lowercase(), first.to_lowercase());
            debug!(depth = 3, email = %email, "email domain found in affiliation");
            return Some(email);
        }
    }

    if !institution.name.is_empty() {
        for author in authors {
            let Some((first, last)) = author.names() else {
                continue;
            };
            if author
                .affiliations
                .iter()
                .any(|a| a.contains(institution.name.as_str()))
            {
                let first = first.split_whitespace().next().unwrap_or(first);
                let last = last.split_whitespace().next().unwrap_or(last);
                let email = format!("{}.{}@{domain}", last.to_lowercase(), first.to_lowercase());
                debug!(depth = 3, email = %email, "email constructed from institution affiliation");
                return Some(email);
            }
        }
    }

    authors.iter().find_map(|author| {
        let (first, last) = author.names()?;
        exceptions
            .iter()
            .find(|e| e.first_name == first && e.last_name == last)
            .map(|e| {
                debug!(depth = 3, email = e.email, "email taken from exception table");
                e.email.to_string()
            })
    })
}

pub struct IeeeEmailResolver {
    client: PoliteClient,
    institution: InstitutionConfig,
    exceptions: &'static [EmailException],
}

impl IeeeEmailResolver {
    pub fn from_config(config: &EnrichConfig) -> Result<Self> {
        Self::with_params(
            config.institution.clone(),
            &config.http.user_agent,
            Duration::from_millis(config.http.request_interval_ms),
        )
    }

    pub fn with_params(
        institution: InstitutionConfig,
        user_agent: &str,
        min_interval: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: PoliteClient::new(min_interval, user_agent)?,
            institution,
            exceptions: EMAIL_EXCEPTIONS,
        })
    }

    pub async fn fetch_metadata(&self, link: &str) -> Result<Value> {
        let html = self
            .client
            .get(link)
            .await
            .map_err(|e| ScienceError::FetchError(link.to_string(), e.to_string()))?;
        extract_embedded_metadata(&html)
            .ok_or_else(|| ScienceError::MetadataNotFound(link.to_string()))
    }
}

#[async_trait]
impl EmailResolver for IeeeEmailResolver {
    fn name(&self) -> &str {
        "ieee"
    }

    async fn resolve_email(&self, link: &str) -> Result<String> {
        if !link.contains(self.institution.publisher_marker.as_str()) {
            return Err(ScienceError::UnsupportedSource(link.to_string()));
        }
        debug!(depth = 2, link, "fetching publisher metadata");
        let metadata = self.fetch_metadata(link).await?;
        let authors = authors_from_metadata(&metadata);
        debug!(depth = 2, authors = authors.len(), "publisher metadata parsed");
        email_from_authors(&authors, &self.institution, self.exceptions)
            .ok_or(ScienceError::NoEmailFound)
    }
}
